//! The raw, unresolved parse tree the parser (C7) produces.
//!
//! Node references here are still bare strings — resolving a field's type
//! name to a [`crate::model::NodeType`] or an opaque primitive, and wiring
//! up parent/child derivation, is the analyzer's job (C8, `crate::analyzer`).
//! A nested node block is recorded as a child of its enclosing block so the
//! analyzer can see the derivation relationship the grammar expresses
//! through nesting (§4.7).

use crate::lexer::EdgeKeyword;

/// The fully parsed, not-yet-resolved schema: global directives plus the
/// forest of node blocks.
#[derive(Debug, Default)]
pub struct RawSpecification {
    pub namespace: Option<String>,
    pub support: Option<String>,
    pub initialize_fn: Option<String>,
    pub serialize_fn: Option<String>,
    pub deserialize_fn: Option<String>,
    pub location_type: Option<String>,
    pub includes: Vec<String>,
    /// `ext Name;` or `ext Name = "rust::path::Type";` declarations.
    pub externs: Vec<RawExtern>,
    /// Top-level node blocks. Nested (derived) blocks live inside
    /// [`RawNode::children`], not here.
    pub roots: Vec<RawNode>,
}

#[derive(Debug, Clone)]
pub struct RawExtern {
    pub name: String,
    pub rust_path: Option<String>,
}

/// One `node name { ... }` block, possibly containing nested blocks that
/// represent its derived (child) node types.
#[derive(Debug, Clone)]
pub struct RawNode {
    pub name: String,
    pub doc: String,
    pub is_error_marker: bool,
    pub fields: Vec<RawField>,
    pub reorder: Option<Vec<String>>,
    pub children: Vec<RawNode>,
}

#[derive(Debug, Clone)]
pub struct RawField {
    pub name: String,
    pub doc: String,
    pub edge: Option<EdgeKeyword>,
    /// The type name inside the edge wrapper (or the bare type, when
    /// `edge` is `None` — a plain, un-wrapped primitive field).
    pub type_name: String,
}
