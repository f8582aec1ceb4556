//! Resolves a schema [`Field`] or [`crate::model::NodeType`] reference to
//! the Rust type tokens the struct/enum definitions and constructors use.
//!
//! Inheritance maps to tagged variants (§9 "Design Notes"): a leaf
//! `NodeType` becomes a plain struct; a non-leaf one becomes an enum whose
//! variants are its transitive leaves, each wrapping `Rc<RefCell<Leaf>>`.
//! A field referencing either kind just names that struct/enum by its
//! `title_name` — the emitted item, not the wrapper, carries the
//! leaf-vs-abstract distinction.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Path;

use crate::codegen::names::ident;
use crate::model::{Config, EdgeKind, Field, FieldTarget, Specification};

/// Parses `Config::support` (a crate name or crate path, e.g.
/// `"treeforge_runtime"`) into a `syn::Path` usable as a prefix for
/// `support::edge::Exactly<T>` style references.
pub fn support_path(config: &Config) -> Path {
    syn::parse_str(&config.support).unwrap_or_else(|_| syn::parse_str("treeforge_runtime").unwrap())
}

/// The bare target type for a field: the node struct/enum name, or the
/// primitive's Rust type.
pub fn target_type(spec: &Specification, target: &FieldTarget) -> TokenStream {
    match target {
        FieldTarget::Node(id) => {
            let name = ident(&spec.node(*id).title_name);
            quote! { #name }
        }
        FieldTarget::Primitive(p) => {
            let ty: TokenStream = syn::parse_str(p.rust_type())
                .unwrap_or_else(|_| panic!("primitive `{}` is not a valid Rust type path", p.rust_type()));
            ty
        }
    }
}

/// The full field type as it appears in the generated struct: the target
/// type, wrapped in its edge kind's runtime type when the field isn't
/// bare.
pub fn field_type(spec: &Specification, config: &Config, field: &Field) -> TokenStream {
    let support = support_path(config);
    let target = target_type(spec, &field.target);
    match field.edge {
        None => target,
        Some(kind) => {
            let wrapper = ident(kind.wrapper_ident());
            quote! { #support::edge::#wrapper<#target> }
        }
    }
}

/// Whether this edge kind's runtime wrapper owns its target (vs. a
/// `Link`/`OptLink` weak reference) — used to decide `clone()` depth.
pub fn is_owning(kind: Option<EdgeKind>) -> bool {
    match kind {
        None => true,
        Some(k) => k.is_owning(),
    }
}
