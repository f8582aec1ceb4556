//! The abstract operations every emitted `NodeType` implements.
//!
//! [`AnyNode`] is the dynamic-dispatch seam the rest of the runtime (the
//! well-formedness algorithm, the visitor framework) is built against: it
//! never needs to know a schema's concrete node types, only that each one
//! can report its name, its annotations, and walk its own owning edges.
//! Generated code implements [`AnyNode`] by hand for each `NodeType`,
//! delegating each method to the [`crate::edge::Edge`] impls of its own
//! fields in schema-declared order.

use crate::annotation::{AnnotationsMut, AnnotationsRef};
use crate::error::NotWellFormed;
use crate::wellformed::{self, PointerMap};

/// The edge kind a [`Field`] was declared with, carrying just enough to
/// drive traversal and dumping without the visitor needing to know the
/// concrete edge type.
pub enum FieldShape<'a> {
    /// `Exactly` (always present) or `Maybe` (optionally present).
    Single {
        present: bool,
        node: Option<&'a dyn AnyNode>,
    },
    /// `List` or `NonEmptyList`: zero or more owned nodes, in order.
    Many(Vec<&'a dyn AnyNode>),
    /// `Link` or `OptLink`: a non-owning reference, surfaced by the target's
    /// type name only (the dumper does not recurse through it).
    Link {
        present: bool,
        target_type: Option<&'static str>,
    },
    /// A bare, unwrapped primitive field (`name: String;`), rendered with
    /// its `Debug` representation. Never recursed into.
    Scalar(String),
}

/// One schema-declared field, named, with its edge's current shape.
pub struct Field<'a> {
    pub name: &'static str,
    pub shape: FieldShape<'a>,
}

/// Operations common to every generated `NodeType`, usable without knowing
/// the concrete type.
pub trait AnyNode {
    /// The schema name of this node's concrete type (not its ancestors').
    fn node_type_name(&self) -> &'static str;

    /// Whether this `NodeType` is declared `error` in the schema. The
    /// completeness pass fails as soon as one of these is reached.
    fn is_error_marker(&self) -> bool {
        false
    }

    /// Read-only view of this node's annotations.
    fn annotations(&self) -> AnnotationsRef<'_>;

    /// Mutable view of this node's annotations.
    fn annotations_mut(&mut self) -> AnnotationsMut<'_>;

    /// Visits this node's fields, in schema declaration order, each
    /// reporting its edge's current shape. Drives both
    /// [`crate::visitor::RecursiveVisitor`] (which recurses into
    /// `Single`/`Many` nodes and skips `Link`) and [`crate::visitor::Dumper`].
    /// The default visits nothing, for leaf nodes with no owning fields.
    ///
    /// Callback-shaped rather than `Vec`-returning: a non-leaf NodeType's
    /// `Field`s borrow from its wrapped leaf through a `Ref` guard that must
    /// stay alive for the callback's duration but cannot be returned
    /// alongside the data without holding it for longer than the call.
    fn for_each_field(&self, f: &mut dyn FnMut(Field<'_>)) {
        let _ = f;
    }

    /// Reachability pass: mark this node's address (the caller already did,
    /// via the owning edge) and recurse into every owning field.
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed>;

    /// Completeness pass: confirm required fields are populated, link
    /// targets resolve against `map`, and this isn't an error marker.
    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed>;
}

/// Blanket well-formedness operations built on [`AnyNode`] and
/// [`crate::wellformed`]'s free functions. Every `NodeType` gets this for
/// free.
pub trait WellFormed: AnyNode {
    /// Run both passes of the well-formedness algorithm starting at `self`.
    fn check_well_formed(&self) -> Result<(), NotWellFormed>
    where
        Self: Sized,
    {
        wellformed::check_well_formed(self)
    }

    /// [`WellFormed::check_well_formed`], discarding the error.
    fn is_well_formed(&self) -> bool
    where
        Self: Sized,
    {
        self.check_well_formed().is_ok()
    }
}

impl<T: AnyNode> WellFormed for T {}
