//! Top-level code emission (C9, §4.8): turns a resolved [`Specification`]
//! into Rust source text. Emission itself (`emit_main`/`emit_impl`/
//! `emit_minimal`) is pure `Specification -> TokenStream`; [`render`]
//! formats a `TokenStream` into source text via `prettyplease`. Writing
//! the formatted text to a path is still the binary's job, not this
//! module's.
//!
//! Rust resolves item names module-wide rather than top-to-bottom, so
//! unlike a single-pass emitter for a language with textual forward
//! declarations, nothing here needs to order items by dependency — a
//! leaf's `impl` can reference `NodeKind` or the `Visitor` trait no matter
//! which literal position in the output they land at.

pub mod abstract_node;
pub mod fields;
pub mod leaf;
pub mod names;
pub mod serde;
pub mod types;

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::names::{ident, visit_method};
use crate::codegen::types::support_path;
use crate::error::SchemaError;
use crate::model::Specification;

/// Format a generated `TokenStream` into source text, `@generated`
/// header included. `tokens` must parse as a `syn::File` (a bug in an
/// emitter, not in the schema, if it doesn't) — reported as
/// [`SchemaError::FormatError`] rather than panicking, since this runs
/// after a schema has already compiled successfully.
pub fn render(tokens: TokenStream) -> Result<String, SchemaError> {
    let file: syn::File = syn::parse2(tokens).map_err(|source| SchemaError::FormatError { source })?;
    let body = prettyplease::unparse(&file);
    Ok(format!(
        "// @generated by treeforge-gen. DO NOT EDIT.\n\
         //\n\
         // This file was compiled from a schema; manual changes will be\n\
         // overwritten on the next regeneration.\n\n{body}"
    ))
}

/// The `NodeKind` discriminant every leaf's `kind()` returns (§4.5) — one
/// variant per leaf NodeType, in declared order. Non-leaf NodeTypes never
/// get their own variant: a value typed at an abstract NodeType always
/// reports the concrete leaf kind it currently holds.
fn emit_node_kind(spec: &Specification) -> TokenStream {
    let variants = spec.leaves().into_iter().map(|id| {
        let name = ident(&spec.node(id).title_name);
        let doc = &spec.node(id).doc;
        if doc.is_empty() {
            quote! { #name }
        } else {
            quote! {
                #[doc = #doc]
                #name
            }
        }
    });
    quote! {
        /// The discriminant every `NodeType::kind()` returns (§4.5).
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum NodeKind {
            #(#variants,)*
        }
    }
}

/// The generated per-schema `Visitor` trait (§4.6): one `visit_<name>`
/// method per NodeType (leaf and non-leaf alike), each defaulting to
/// delegating to its parent's method, bottoming out at the runtime trait's
/// `visit_node`. Overriding `visit_<kind>` for an abstract NodeType
/// therefore catches every concrete leaf derived from it, since each of
/// those leaves' own default bodies delegate up through every ancestor in
/// turn before reaching `visit_node`.
fn emit_visitor_trait(spec: &Specification) -> TokenStream {
    let support = support_path(&spec.config);
    let methods = spec.nodes.iter().map(|node| {
        let method = visit_method(&node.name);
        let delegate = match node.parent {
            Some(pid) => visit_method(&spec.node(pid).name),
            None => ident("visit_node"),
        };
        let doc = format!("Default: delegate to [`Self::{delegate}`].");
        quote! {
            #[doc = #doc]
            fn #method(&mut self, node: &dyn #support::AnyNode) -> Self::Output {
                self.#delegate(node)
            }
        }
    });
    quote! {
        /// Double dispatch realized as a tag-switch, not runtime
        /// polymorphism (§9): a concrete NodeType's `dispatch` calls the one
        /// method here matching its own kind; every other method's default
        /// body forwards the call up its derivation chain.
        pub trait Visitor: #support::Visitor {
            #(#methods)*
        }
    }
}

/// Every NodeType's struct/enum definition and inherent `impl` —
/// constructor, downcasts, `copy`/`clone_deep`/`equals`, visitor dispatch,
/// and the `AnyNode` impl. Never includes `serialize`/`deserialize`; those
/// are emitted separately by [`emit_serde_impls`] so a consumer that wants
/// declarations without a wire format (`--out-secondary`, or a schema that
/// named no (ser, des) pair at all) never sees them.
fn emit_node_decls(spec: &Specification) -> TokenStream {
    let bodies = spec.nodes.iter().map(|node| {
        if node.is_leaf() {
            leaf::emit_leaf(spec, node.id)
        } else {
            abstract_node::emit_abstract(spec, node.id)
        }
    });
    quote! { #(#bodies)* }
}

/// Every NodeType's `serialize`/`deserialize` trio, appended to the
/// corresponding inherent `impl` from [`emit_node_decls`]. Empty when the
/// schema named neither a serialize nor a deserialize function
/// ([`crate::model::Config::wants_serde`]).
fn emit_serde_impls(spec: &Specification) -> TokenStream {
    if !spec.config.wants_serde() {
        return TokenStream::new();
    }
    let bodies = spec.nodes.iter().map(|node| {
        if node.is_leaf() {
            leaf::emit_leaf_serde(spec, node.id)
        } else {
            abstract_node::emit_abstract_serde(spec, node.id)
        }
    });
    quote! { #(#bodies)* }
}

/// `--out-main`: the `NodeKind` discriminant, the generated `Visitor`
/// trait, and every NodeType's declaration (§2/§6). Pairs with
/// [`emit_impl`]'s `--out-impl` output to form one complete consumer
/// module — split across two files because the system this was designed
/// for keeps declarations and (de)serialization logic in separate
/// translation units; Rust needs both files present to compile (an
/// inherent `impl` block split across files is ordinary Rust), so
/// `--out-impl` is required even for a schema that named no (ser, des)
/// pair, in which case it is emitted as a near-empty file.
pub fn emit_main(spec: &Specification) -> TokenStream {
    let node_kind = emit_node_kind(spec);
    let visitor = emit_visitor_trait(spec);
    let nodes = emit_node_decls(spec);
    quote! {
        #node_kind
        #visitor
        #nodes
    }
}

/// `--out-impl`: every NodeType's `serialize`/`deserialize` bodies, or
/// nothing at all when the schema requested no wire format. See
/// [`emit_main`].
pub fn emit_impl(spec: &Specification) -> TokenStream {
    emit_serde_impls(spec)
}

/// `--out-secondary`: a second, self-contained emission — `NodeKind`,
/// `Visitor`, and every NodeType's declaration, identical in content to
/// [`emit_main`] but never paired with a [`emit_impl`] output — for a
/// second, non-serializing consumer language/target pairing (§2).
pub fn emit_minimal(spec: &Specification) -> TokenStream {
    emit_main(spec)
}
