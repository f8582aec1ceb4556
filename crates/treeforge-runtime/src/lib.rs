//! Support library for trees emitted by `treeforge-gen`.
//!
//! This crate carries everything generated code needs that doesn't vary
//! per schema: the six [`edge`] wrapper types a field can be declared with,
//! the [`node::AnyNode`] dynamic-dispatch seam, the two-pass
//! [`wellformed`] algorithm, the generic [`visitor`] framework (recursive
//! walk and debug dump), the process-wide [`annotation`] registry, and a
//! small [`cbor`] reader/writer pair the generated `serialize`/`deserialize`
//! bodies drive.
//!
//! None of these types know about any particular schema. A generated
//! module implements [`node::AnyNode`] by hand for each of its node types
//! and otherwise leans entirely on what's here.
//!
//! # Example
//!
//! ```rust,ignore
//! use treeforge_runtime::edge::{Exactly, List};
//! use treeforge_runtime::node::{AnyNode, WellFormed};
//!
//! let tree = MyRoot::new(/* ... */);
//! tree.check_well_formed()?;
//! println!("{}", treeforge_runtime::visitor::Dumper::new().dump(&tree));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Process-wide annotation value registry and per-node annotation maps.
pub mod annotation;
/// A hand-rolled reader/writer for the subset of CBOR the generated
/// `serialize`/`deserialize` bodies use.
pub mod cbor;
/// The six edge kinds (`Exactly`, `Maybe`, `List`, `NonEmptyList`, `Link`,
/// `OptLink`) a schema field may be declared with.
pub mod edge;
/// Error types shared by the codec and the well-formedness algorithm.
pub mod error;
/// The [`node::AnyNode`] dynamic-dispatch seam generated `NodeType`s
/// implement.
pub mod node;
/// The [`primitive::CborPrimitive`] capability a schema's opaque primitive
/// types implement to be (de)serializable.
pub mod primitive;
/// The generic recursive visitor and debug dumper built on [`node::AnyNode`].
pub mod visitor;
/// The two-pass well-formedness algorithm (reachability, then completeness).
pub mod wellformed;

pub use error::{
    AnnotationResult, CodecError, CodecResult, DeserializeError, DeserializeResult, Missing, NotWellFormed,
    WellFormedResult,
};
pub use node::{AnyNode, Field, FieldShape, WellFormed};
pub use primitive::CborPrimitive;
pub use visitor::{Dumper, RecursiveVisitor, Visitor};
pub use wellformed::{check_well_formed, is_well_formed, NodeIdentity, PointerMap};

/// Bookkeeping shared by every generated `serialize`/`deserialize` pair: the
/// reachability-pass sequence numbers double as the wire format's `@i`/`@l`
/// link identifiers (§4.4, §6).
pub mod ids;
/// Two-phase link-fixup bookkeeping a generated `deserialize_root` drives.
pub mod deserialize;

pub use deserialize::{DeserializeContext, PendingLink};
