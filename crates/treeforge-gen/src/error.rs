//! Errors produced while parsing, analyzing, and emitting a schema.
//!
//! Mirrors the taxonomy `treeforge_runtime::error` uses for the runtime
//! side: one enum, an error kind per failure mode, a `#[source]` where a
//! lower-level error (I/O, code formatting) is being wrapped, and
//! constructor methods for the variants with more than one field rather
//! than bare tuple variants everywhere.

use miette::{Diagnostic, SourceSpan};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while compiling a schema into target source.
///
/// Covers all three of §7's `SchemaError` causes: parse failure,
/// unresolved reference, and the analyzer's structural checks (duplicate
/// node names, duplicate fields, a missing `initialize()` directive).
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    /// I/O error reading the schema file or writing generated output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The lexer or parser rejected the schema text.
    #[error("{message}")]
    #[diagnostic(code(treeforge::schema::parse_error))]
    ParseError {
        /// Human-readable description of what was expected.
        message: String,
        /// Schema source, for span rendering.
        #[source_code]
        src: String,
        /// Byte span of the offending token.
        #[label("here")]
        span: SourceSpan,
    },

    /// A field or `reorder(...)` entry named a node or field that was
    /// never declared.
    #[error("reference to unknown {kind}: {name}")]
    #[diagnostic(code(treeforge::schema::unknown_ref))]
    UnknownRef {
        /// What sort of thing was being referenced (`"node type"`, `"field"`).
        kind: &'static str,
        /// The unresolved name.
        name: String,
        /// The node block the reference appeared in.
        in_node: String,
    },

    /// Two node blocks declared the same snake_case name.
    #[error("duplicate node type `{name}`")]
    #[diagnostic(code(treeforge::schema::duplicate_node))]
    DuplicateNode {
        /// The repeated name.
        name: String,
    },

    /// A node declares (or inherits, then redeclares) two fields with the
    /// same name.
    #[error("node `{node}` has two fields named `{field}`")]
    #[diagnostic(
        code(treeforge::schema::duplicate_field),
        help("inherited field names must not collide with a derived node's own fields")
    )]
    DuplicateField {
        /// The node the collision was found on.
        node: String,
        /// The repeated field name.
        field: String,
    },

    /// A node has more than one parent, or inheritance otherwise forms a
    /// cycle instead of a tree.
    #[error("node `{name}` cannot derive from `{parent}`: inheritance must form a tree")]
    #[diagnostic(code(treeforge::schema::bad_inheritance))]
    BadInheritance {
        /// The node whose derivation is invalid.
        name: String,
        /// The parent it tried to derive from.
        parent: String,
    },

    /// No `initialize()` function name was declared for a primitive type
    /// that needs a default value.
    #[error("no `initialize` function declared; required to default-construct `{primitive}` fields")]
    #[diagnostic(
        code(treeforge::schema::missing_initialize_fn),
        help("add an `initialize \"fn_name\";` directive to the schema")
    )]
    MissingInitializeFn {
        /// The primitive type that needed a default.
        primitive: String,
    },

    /// Two top-level directives of the same kind were both declared.
    #[error("duplicate `{directive}` directive")]
    #[diagnostic(code(treeforge::schema::duplicate_directive))]
    DuplicateDirective {
        /// The directive keyword that was repeated.
        directive: &'static str,
    },

    /// A `Link`/`OptLink` field named a non-leaf NodeType. The generated
    /// deserializer only ever registers leaf-owned nodes in its link
    /// registry (§4.4: link targets are nodes "owned elsewhere in the same
    /// tree", and every owned node a tree actually builds is a leaf), so a
    /// link resolving against an abstract NodeType's own wrapper handle
    /// could never be satisfied.
    #[error("field `{field}` on `{node}` links to `{target}`, which is not a leaf node type")]
    #[diagnostic(
        code(treeforge::schema::link_to_non_leaf),
        help("Link/OptLink may only name a leaf NodeType; link to the concrete kind instead")
    )]
    LinkToNonLeaf {
        /// The node the link field is declared on.
        node: String,
        /// The link field's name.
        field: String,
        /// The non-leaf NodeType it named.
        target: String,
    },

    /// `prettyplease`/`syn` failed to parse the emitted token stream back
    /// into a formattable file. Indicates a bug in an emitter, not in the
    /// schema.
    #[error("failed to format generated code")]
    #[diagnostic(code(treeforge::schema::format_error))]
    FormatError {
        #[source]
        source: syn::Error,
    },
}

impl SchemaError {
    /// A field, `reorder(...)` entry, or annotation type named something
    /// that was never declared.
    pub fn unknown_ref(kind: &'static str, name: impl Into<String>, in_node: impl Into<String>) -> Self {
        Self::UnknownRef {
            kind,
            name: name.into(),
            in_node: in_node.into(),
        }
    }

    /// A byte-offset parse failure, rendered against the full schema text.
    pub fn parse_error(message: impl Into<String>, src: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            src: src.into(),
            span: (offset, len.max(1)).into(),
        }
    }
}

/// Path context carried alongside an I/O failure reading a schema or
/// writing an emitted file; kept out of [`SchemaError::Io`] itself so the
/// `#[from]` conversion stays a plain wrap.
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct PathIoError {
    /// The file that could not be read or written.
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Result type for schema compilation operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
