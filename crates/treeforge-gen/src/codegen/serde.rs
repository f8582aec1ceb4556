//! `serialize`/`deserialize` body generation (§4.4, §6), emitted only when
//! [`crate::model::Config::wants_serde`] — a schema that named neither
//! directive gets no wire format at all.
//!
//! Every owned node writes (and is read back from) a CBOR map carrying
//! `@t` (its own leaf schema name) and `@i` (its reachability-pass
//! sequence number) alongside its fields; a `Link`/`OptLink` field writes
//! `{"@l": <seq>}` instead of recursing. Deserializing replays the same
//! shape depth-first and defers every link's fixup
//! ([`treeforge_runtime::DeserializeContext`]) until the whole payload has
//! been read, since a link may name a node that hasn't been built yet.
//!
//! Only leaf-owned nodes are ever a valid `Link`/`OptLink` target in the
//! trees this emitter produces — see `DESIGN.md`.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::names::ident;
use crate::codegen::types::{support_path, target_type};
use crate::model::{Config, EdgeKind, Field, FieldTarget, Specification};

fn is_node_target(field: &Field) -> bool {
    matches!(field.target, FieldTarget::Node(_))
}

/// One field's contribution to a `serialize` body.
pub fn serialize_field_stmt(config: &Config, spec: &Specification, field: &Field) -> TokenStream {
    let support = support_path(config);
    let name = ident(&field.name);
    let name_lit = &field.name;
    let node_target = is_node_target(field);
    match field.edge {
        None => quote! {
            map.entry(#name_lit, #support::CborPrimitive::to_cbor(&self.#name))?;
        },
        Some(EdgeKind::Exactly) if node_target => quote! {
            {
                let __seq = ids.sequence(#support::ids::identity_of(self.#name.rc()))
                    .expect("well-formed tree: every owned child has a sequence number");
                let mut __child = map.start_map(#name_lit)?;
                self.#name.peek().serialize(__seq, &mut __child, ids)?;
                __child.finish()?;
            }
        },
        Some(EdgeKind::Exactly) => quote! {
            map.entry(#name_lit, #support::CborPrimitive::to_cbor(self.#name.peek()))?;
        },
        Some(EdgeKind::Maybe) if node_target => quote! {
            if let Some(__rc) = self.#name.rc() {
                let __seq = ids.sequence(#support::ids::identity_of(__rc))
                    .expect("well-formed tree: every owned child has a sequence number");
                let mut __child = map.start_map(#name_lit)?;
                self.#name.peek().unwrap().serialize(__seq, &mut __child, ids)?;
                __child.finish()?;
            }
        },
        Some(EdgeKind::Maybe) => quote! {
            if let Some(__v) = self.#name.peek() {
                map.entry(#name_lit, #support::CborPrimitive::to_cbor(__v))?;
            }
        },
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) if node_target => quote! {
            {
                let mut __arr = map.start_array(#name_lit)?;
                for __rc in self.#name.iter() {
                    let __seq = ids.sequence(#support::ids::identity_of(__rc))
                        .expect("well-formed tree: every owned child has a sequence number");
                    let mut __cm = __arr.start_map()?;
                    __rc.borrow().serialize(__seq, &mut __cm, ids)?;
                    __cm.finish()?;
                }
                __arr.finish()?;
            }
        },
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) => quote! {
            {
                let mut __arr = map.start_array(#name_lit)?;
                for __v in self.#name.peek_iter() {
                    __arr.push(#support::CborPrimitive::to_cbor(__v))?;
                }
                __arr.finish()?;
            }
        },
        Some(EdgeKind::Link) => quote! {
            {
                let __target = self.#name.get().expect("well-formed tree: link must resolve");
                let __seq = ids.sequence(#support::ids::identity_of(&__target))
                    .expect("well-formed tree: link target must be reachable");
                let mut __lm = map.start_map(#name_lit)?;
                __lm.entry("@l", #support::cbor::Scalar::Int(__seq as i64))?;
                __lm.finish()?;
            }
        },
        Some(EdgeKind::OptLink) => quote! {
            if let Some(__target) = self.#name.get() {
                let __seq = ids.sequence(#support::ids::identity_of(&__target))
                    .expect("well-formed tree: link target must be reachable");
                let mut __lm = map.start_map(#name_lit)?;
                __lm.entry("@l", #support::cbor::Scalar::Int(__seq as i64))?;
                __lm.finish()?;
            }
        },
    }
}

/// One field's contribution to a leaf's `deserialize_fields`: a `let`
/// binding for the field (named identically to the field itself, so the
/// final struct literal can use field-init shorthand) plus, for `Link`/
/// `OptLink` fields, a statement pushing a pending fixup.
pub fn deserialize_field_stmts(
    config: &Config,
    spec: &Specification,
    snake_name: &str,
    field: &Field,
) -> TokenStream {
    let support = support_path(config);
    let name = ident(&field.name);
    let name_lit = &field.name;
    let target = target_type(spec, &field.target);
    let node_target = is_node_target(field);
    match field.edge {
        None => quote! {
            let #name = {
                let __r = view.get(#name_lit).ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: #name_lit,
                })?;
                <#target as #support::CborPrimitive>::from_cbor(__r).ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: #name_lit,
                })?
            };
        },
        Some(EdgeKind::Exactly) if node_target => quote! {
            let #name = {
                let __r = view.get(#name_lit).ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: #name_lit,
                })?;
                let __mv = __r.as_map()?;
                #support::edge::Exactly::from_rc(#target::deserialize(&__mv, ctx)?)
            };
        },
        Some(EdgeKind::Exactly) => quote! {
            let #name = {
                let __r = view.get(#name_lit).ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: #name_lit,
                })?;
                #support::edge::Exactly::new(<#target as #support::CborPrimitive>::from_cbor(__r).ok_or(
                    #support::DeserializeError::MissingField { node_kind: #snake_name, field: #name_lit },
                )?)
            };
        },
        Some(EdgeKind::Maybe) if node_target => quote! {
            let #name = match view.get(#name_lit) {
                Some(__r) => {
                    let __mv = __r.as_map()?;
                    #support::edge::Maybe::from_rc(Some(#target::deserialize(&__mv, ctx)?))
                }
                None => #support::edge::Maybe::none(),
            };
        },
        Some(EdgeKind::Maybe) => quote! {
            let #name = match view.get(#name_lit) {
                Some(__r) => #support::edge::Maybe::some(<#target as #support::CborPrimitive>::from_cbor(__r).ok_or(
                    #support::DeserializeError::MissingField { node_kind: #snake_name, field: #name_lit },
                )?),
                None => #support::edge::Maybe::none(),
            };
        },
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) if node_target => {
            let ctor = list_ctor(field, &support);
            quote! {
                let #name = {
                    let mut __out = #ctor;
                    if let Some(__r) = view.get(#name_lit) {
                        let __arr = __r.as_array()?;
                        for __item in __arr.iter() {
                            let __mv = __item.as_map()?;
                            __out.push_rc(#target::deserialize(&__mv, ctx)?);
                        }
                    }
                    __out
                };
            }
        }
        Some(EdgeKind::List) | Some(EdgeKind::NonEmptyList) => {
            let ctor = list_ctor(field, &support);
            quote! {
                let #name = {
                    let mut __out = #ctor;
                    if let Some(__r) = view.get(#name_lit) {
                        let __arr = __r.as_array()?;
                        for __item in __arr.iter() {
                            let __v = <#target as #support::CborPrimitive>::from_cbor(__item).ok_or(
                                #support::DeserializeError::MissingField { node_kind: #snake_name, field: #name_lit },
                            )?;
                            __out.push(__v);
                        }
                    }
                    __out
                };
            }
        }
        Some(EdgeKind::Link) => quote! {
            let #name = #support::edge::Link::new();
            {
                let __r = view.get(#name_lit).ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: #name_lit,
                })?;
                let __mv = __r.as_map()?;
                let __target_seq = __mv.get("@l").ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: "@l",
                })?.as_int()? as u64;
                __links.push(#support::PendingLink {
                    target_seq: __target_seq,
                    node_kind: #snake_name,
                    field: #name_lit,
                    apply: Box::new(move |node: &mut Self, __any: std::rc::Rc<dyn std::any::Any>| {
                        let __typed = __any.downcast::<std::cell::RefCell<#target>>().map_err(|_| {
                            #support::DeserializeError::UnresolvedLink {
                                node_kind: #snake_name,
                                field: #name_lit,
                                seq: __target_seq,
                            }
                        })?;
                        node.#name.set(&__typed);
                        Ok(())
                    }),
                });
            }
        },
        Some(EdgeKind::OptLink) => quote! {
            let #name = #support::edge::OptLink::none();
            if let Some(__r) = view.get(#name_lit) {
                let __mv = __r.as_map()?;
                let __target_seq = __mv.get("@l").ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: "@l",
                })?.as_int()? as u64;
                __links.push(#support::PendingLink {
                    target_seq: __target_seq,
                    node_kind: #snake_name,
                    field: #name_lit,
                    apply: Box::new(move |node: &mut Self, __any: std::rc::Rc<dyn std::any::Any>| {
                        let __typed = __any.downcast::<std::cell::RefCell<#target>>().map_err(|_| {
                            #support::DeserializeError::UnresolvedLink {
                                node_kind: #snake_name,
                                field: #name_lit,
                                seq: __target_seq,
                            }
                        })?;
                        node.#name.set(&__typed);
                        Ok(())
                    }),
                });
            }
        },
    }
}

fn list_ctor(field: &Field, support: &syn::Path) -> TokenStream {
    if matches!(field.edge, Some(EdgeKind::NonEmptyList)) {
        quote! { #support::edge::NonEmptyList::empty() }
    } else {
        quote! { #support::edge::List::new() }
    }
}
