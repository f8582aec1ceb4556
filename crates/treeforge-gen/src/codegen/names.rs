//! Identifier helpers shared by every emitter submodule.

use proc_macro2::{Ident, Span};

pub fn ident(s: &str) -> Ident {
    Ident::new(s, Span::call_site())
}

/// `visit_<snake_name>` method name on the `Visitor` trait.
pub fn visit_method(snake_name: &str) -> Ident {
    ident(&format!("visit_{snake_name}"))
}

/// `as_<snake_name>` down/up-cast method name.
pub fn as_method(snake_name: &str) -> Ident {
    ident(&format!("as_{snake_name}"))
}

/// `as_<snake_name>_mut` down/up-cast method name.
pub fn as_method_mut(snake_name: &str) -> Ident {
    ident(&format!("as_{snake_name}_mut"))
}
