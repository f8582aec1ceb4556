//! Per-field expression builders shared by the leaf struct and abstract
//! enum emitters (§4.5): the `for_each_field()`/`find_reachable`/
//! `check_complete` bodies every `AnyNode` impl needs, and the
//! `copy()`/`clone_deep()`/`equals()`/default-constructor expressions for
//! one field at a time.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::names::ident;
use crate::codegen::types::{support_path, target_type};
use crate::model::{Config, EdgeKind, Field, FieldTarget, Specification};

fn is_node_target(field: &Field) -> bool {
    matches!(field.target, FieldTarget::Node(_))
}

/// The `Field { name, shape }` literal for one field, passed to a
/// `for_each_field()` callback entry (§4.4's `AnyNode::for_each_field`,
/// driving the visitor framework).
fn field_shape_entry(config: &Config, field: &Field) -> TokenStream {
    let support = support_path(config);
    let name = ident(&field.name);
    let name_lit = &field.name;
    match field.edge {
        None => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Scalar(format!("{:?}", self.#name)),
            }
        },
        Some(EdgeKind::Exactly) => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Single { present: true, node: Some(self.#name.peek() as &dyn #support::AnyNode) },
            }
        },
        Some(EdgeKind::Maybe) => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Single {
                    present: self.#name.is_some(),
                    node: self.#name.peek().map(|v| v as &dyn #support::AnyNode),
                },
            }
        },
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Many(
                    self.#name.peek_iter().map(|v| v as &dyn #support::AnyNode).collect()
                ),
            }
        },
        Some(EdgeKind::Link) => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Link {
                    present: true,
                    target_type: self.#name.get().map(|rc| rc.borrow().node_type_name()),
                },
            }
        },
        Some(EdgeKind::OptLink) => quote! {
            #support::Field {
                name: #name_lit,
                shape: #support::FieldShape::Link {
                    present: self.#name.get().is_some(),
                    target_type: self.#name.get().map(|rc| rc.borrow().node_type_name()),
                },
            }
        },
    }
}

/// Body of `fn for_each_field(&self, f: &mut dyn FnMut(Field<'_>))`. The
/// leading `let _ = &f;` keeps a fieldless leaf's otherwise-unused callback
/// parameter quiet.
pub fn fields_body(config: &Config, fields: &[&Field]) -> TokenStream {
    let entries = fields.iter().map(|f| field_shape_entry(config, f));
    quote! {
        let _ = &f;
        #(f(#entries);)*
    }
}

/// One field's `Edge::find_reachable` call for the `find_reachable` body, in
/// declaration order. Bare primitive fields carry no edge and are skipped.
pub fn find_reachable_field_call(field: &Field) -> Option<TokenStream> {
    if field.is_bare() {
        return None;
    }
    let name = ident(&field.name);
    Some(quote! { self.#name.find_reachable(map)?; })
}

pub fn check_complete_field_call(field: &Field, snake_name: &str) -> Option<TokenStream> {
    if field.is_bare() {
        return None;
    }
    let name = ident(&field.name);
    let field_lit = &field.name;
    Some(quote! { self.#name.check_complete(map, #snake_name, #field_lit)?; })
}

/// `copy()`: shallow — owning fields share the same `Rc`/value with
/// `self`, link fields share the same weak target.
pub fn copy_field_expr(config: &Config, field: &Field) -> TokenStream {
    let support = support_path(config);
    let name = ident(&field.name);
    match field.edge {
        None => quote! { self.#name.clone() },
        Some(EdgeKind::Exactly) => quote! { #support::edge::Exactly::from_rc(self.#name.rc().clone()) },
        Some(EdgeKind::Maybe) => quote! { #support::edge::Maybe::from_rc(self.#name.rc().cloned()) },
        Some(EdgeKind::List) => quote! {
            {
                let mut out = #support::edge::List::new();
                for rc in self.#name.iter() {
                    out.push_rc(rc.clone());
                }
                out
            }
        },
        Some(EdgeKind::NonEmptyList) => quote! {
            {
                let mut out = #support::edge::NonEmptyList::empty();
                for rc in self.#name.iter() {
                    out.push_rc(rc.clone());
                }
                out
            }
        },
        Some(EdgeKind::Link) | Some(EdgeKind::OptLink) => quote! { self.#name.clone() },
    }
}

/// `clone_deep()`: owning fields are recursively deep-cloned (via the
/// target's own `clone_deep`/`.clone()`); link fields keep pointing at the
/// *original* tree (§9 Design Notes).
pub fn clone_deep_field_expr(config: &Config, field: &Field) -> TokenStream {
    let support = support_path(config);
    let name = ident(&field.name);
    let node_target = is_node_target(field);
    match field.edge {
        None => quote! { self.#name.clone() },
        Some(EdgeKind::Exactly) => {
            if node_target {
                quote! { #support::edge::Exactly::new(self.#name.peek().clone_deep()) }
            } else {
                quote! { #support::edge::Exactly::new(self.#name.peek().clone()) }
            }
        }
        Some(EdgeKind::Maybe) => {
            if node_target {
                quote! {
                    match self.#name.peek() {
                        Some(v) => #support::edge::Maybe::some(v.clone_deep()),
                        None => #support::edge::Maybe::none(),
                    }
                }
            } else {
                quote! {
                    match self.#name.peek() {
                        Some(v) => #support::edge::Maybe::some(v.clone()),
                        None => #support::edge::Maybe::none(),
                    }
                }
            }
        }
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) => {
            let ctor = if matches!(field.edge, Some(EdgeKind::List)) {
                quote! { #support::edge::List::new() }
            } else {
                quote! { #support::edge::NonEmptyList::empty() }
            };
            let push = if node_target {
                quote! { out.push(v.clone_deep()); }
            } else {
                quote! { out.push(v.clone()); }
            };
            quote! {
                {
                    let mut out = #ctor;
                    for v in self.#name.peek_iter() {
                        #push
                    }
                    out
                }
            }
        }
        Some(EdgeKind::Link) | Some(EdgeKind::OptLink) => quote! { self.#name.clone() },
    }
}

/// `equals()`: structural comparison through owning fields, pointer
/// comparison through link fields, never consults annotations (§4.5).
pub fn equals_field_expr(field: &Field) -> TokenStream {
    let name = ident(&field.name);
    let node_target = is_node_target(field);
    match field.edge {
        None => quote! { self.#name == other.#name },
        Some(EdgeKind::Exactly) => {
            if node_target {
                quote! { self.#name.peek().equals(other.#name.peek()) }
            } else {
                quote! { *self.#name.peek() == *other.#name.peek() }
            }
        }
        Some(EdgeKind::Maybe) => {
            if node_target {
                quote! {
                    match (self.#name.peek(), other.#name.peek()) {
                        (Some(a), Some(b)) => a.equals(b),
                        (None, None) => true,
                        _ => false,
                    }
                }
            } else {
                quote! { self.#name.peek() == other.#name.peek() }
            }
        }
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) => {
            if node_target {
                quote! {
                    self.#name.len() == other.#name.len()
                        && self.#name.peek_iter().zip(other.#name.peek_iter()).all(|(a, b)| a.equals(b))
                }
            } else {
                quote! {
                    self.#name.len() == other.#name.len()
                        && self.#name.peek_iter().zip(other.#name.peek_iter()).all(|(a, b)| a == b)
                }
            }
        }
        Some(EdgeKind::Link) | Some(EdgeKind::OptLink) => quote! { self.#name.ptr_eq(&other.#name) },
    }
}

/// The default-construction expression for one field (§4.5: "a sensible
/// default — empty edge, or the primitive-specific `initialize<T>()`").
pub fn default_field_expr(spec: &Specification, config: &Config, field: &Field) -> TokenStream {
    let support = support_path(config);
    let target = target_type(spec, &field.target);
    let node_target = is_node_target(field);
    let initialize_fn = ident(&config.initialize_fn);
    match field.edge {
        None => quote! { #initialize_fn::<#target>() },
        Some(EdgeKind::Exactly) => {
            if node_target {
                quote! { #support::edge::Exactly::new(#target::new()) }
            } else {
                quote! { #support::edge::Exactly::new(#initialize_fn::<#target>()) }
            }
        }
        Some(EdgeKind::Maybe) => quote! { #support::edge::Maybe::none() },
        Some(EdgeKind::List) => quote! { #support::edge::List::new() },
        Some(EdgeKind::NonEmptyList) => quote! { #support::edge::NonEmptyList::empty() },
        Some(EdgeKind::Link) => quote! { #support::edge::Link::new() },
        Some(EdgeKind::OptLink) => quote! { #support::edge::OptLink::none() },
    }
}
