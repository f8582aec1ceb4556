//! Error types shared by every treeforge-generated tree.
//!
//! Follows the taxonomy a generated module's caller sees: a malformed CBOR
//! payload is a [`CodecError`], a structurally invalid tree is a
//! [`NotWellFormed`], and a missing annotation is a [`Missing`]. None of
//! these are caught internally; callers decide whether to propagate or, for
//! well-formedness, downgrade to a boolean with `is_well_formed()`.

use std::error::Error;

/// Boxed error type for error sources, matching the rest of the workspace.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors produced by the CBOR reader and writer (`treeforge_runtime::cbor`).
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CodecError {
    /// The byte slice ended before the value it announced was complete.
    #[error("unexpected end of input at offset {offset}")]
    #[diagnostic(code(treeforge::codec::eof))]
    UnexpectedEof {
        /// Byte offset where the read was attempted.
        offset: usize,
    },

    /// A major/additional-info byte combination this codec does not accept.
    #[error("unsupported CBOR feature: {feature}")]
    #[diagnostic(
        code(treeforge::codec::unsupported),
        help("this codec implements a deterministic subset of RFC 7049")
    )]
    Unsupported {
        /// Human-readable description of the rejected feature.
        feature: String,
    },

    /// A value was accessed as the wrong kind (e.g. `as_array()` on a map).
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(treeforge::codec::type_mismatch))]
    TypeMismatch {
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind the value actually is.
        found: &'static str,
    },

    /// An indefinite-length string mixed incompatible inner major types.
    #[error("malformed indefinite-length string at offset {offset}")]
    #[diagnostic(code(treeforge::codec::malformed_string))]
    MalformedString {
        /// Byte offset of the offending chunk.
        offset: usize,
    },

    /// An integer, array/map length, or string length fell outside what
    /// this codec can represent (e.g. outside the signed 64-bit range).
    #[error("value out of range: {what}")]
    #[diagnostic(code(treeforge::codec::out_of_range))]
    OutOfRange {
        /// Description of the offending value.
        what: String,
    },

    /// A write was attempted through a container handle that is no longer
    /// the innermost open handle.
    #[error("write to shadowed writer handle")]
    #[diagnostic(
        code(treeforge::codec::shadowed_handle),
        help("close inner maps/arrays before writing to an outer one")
    )]
    ShadowedHandle,

    /// An I/O error while writing to the underlying sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Reasons a tree failed well-formedness validation (§4.4 of the schema).
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum NotWellFormed {
    /// The same owned node was reached twice during the reachability pass.
    #[error("duplicate node: the same node is owned by more than one edge")]
    #[diagnostic(
        code(treeforge::wellformed::duplicate_node),
        help("two owning edges must never point at the same node")
    )]
    DuplicateNode,

    /// A required (`Exactly`/`NonEmptyList`/`Link`) edge was empty.
    #[error("required field `{field}` on `{node_kind}` is empty")]
    #[diagnostic(code(treeforge::wellformed::missing_required))]
    MissingRequired {
        /// The NodeType the field belongs to.
        node_kind: &'static str,
        /// The field name.
        field: &'static str,
    },

    /// A `Link`/`OptLink` pointed at a node not reachable from the root.
    #[error("field `{field}` on `{node_kind}` links to an unreachable node")]
    #[diagnostic(
        code(treeforge::wellformed::dangling_link),
        help("link targets must be owned somewhere in the same tree")
    )]
    DanglingLink {
        /// The NodeType the field belongs to.
        node_kind: &'static str,
        /// The field name.
        field: &'static str,
    },

    /// An error-marker NodeType was present anywhere in the tree.
    #[error("error-marker node `{node_kind}` present in tree")]
    #[diagnostic(code(treeforge::wellformed::error_marker))]
    ErrorMarker {
        /// The error-marker NodeType encountered.
        node_kind: &'static str,
    },
}

/// Result type alias for well-formedness checks.
pub type WellFormedResult<T> = std::result::Result<T, NotWellFormed>;

/// Errors a generated `deserialize` body can report — the runtime-side half
/// of §7's `SchemaError` ("mismatched edge/type in a serialized payload"):
/// the compile-time `SchemaError` in `treeforge-gen` covers schema text, this
/// one covers a payload that doesn't match the schema it's read against.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DeserializeError {
    /// The underlying CBOR payload was malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    /// A node map's `@t` named a leaf type this NodeType's dispatch doesn't
    /// know about.
    #[error("unknown node type tag `{tag}` (expected one of: {expected})")]
    #[diagnostic(code(treeforge::deserialize::unknown_tag))]
    UnknownTag {
        /// The `@t` value found in the payload.
        tag: String,
        /// Comma-joined list of tags this dispatch accepts.
        expected: String,
    },

    /// A required field's key was absent from the node map.
    #[error("missing required field `{field}` on `{node_kind}`")]
    #[diagnostic(code(treeforge::deserialize::missing_field))]
    MissingField {
        /// The NodeType the field belongs to.
        node_kind: &'static str,
        /// The field name.
        field: &'static str,
    },

    /// A `{"@l": <int>}` link value referred to a sequence number no node in
    /// the deserialized payload was assigned.
    #[error("link field `{field}` on `{node_kind}` refers to unknown sequence number {seq}")]
    #[diagnostic(code(treeforge::deserialize::unresolved_link))]
    UnresolvedLink {
        /// The NodeType the field belongs to.
        node_kind: &'static str,
        /// The field name.
        field: &'static str,
        /// The `@l` sequence number that didn't resolve.
        seq: u64,
    },
}

/// Result type alias for deserialize operations.
pub type DeserializeResult<T> = std::result::Result<T, DeserializeError>;

/// An annotation lookup by type found nothing attached to the node.
#[derive(Debug, Clone, Copy, thiserror::Error, miette::Diagnostic)]
#[error("no annotation of the requested type is attached to this node")]
#[diagnostic(code(treeforge::annotation::missing))]
pub struct Missing;

/// Result type alias for annotation lookups.
pub type AnnotationResult<T> = std::result::Result<T, Missing>;
