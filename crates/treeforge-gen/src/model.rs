//! The resolved schema model (§3.1) — the analyzer's (C8) output and the
//! emitters' (C9) input. Every reference here is resolved: a field's
//! target is either an index into [`Specification::nodes`] or an opaque
//! [`Primitive`], and every [`NodeType`] knows both its parent and its
//! derived children.

use std::fmt;

/// Index into [`Specification::nodes`], used instead of a name everywhere
/// a field or `parent` link needs to refer to another node type — avoids
/// re-resolving strings during emission.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Exactly,
    Maybe,
    List,
    NonEmptyList,
    Link,
    OptLink,
}

impl EdgeKind {
    pub fn is_owning(self) -> bool {
        matches!(self, EdgeKind::Exactly | EdgeKind::Maybe | EdgeKind::List | EdgeKind::NonEmptyList)
    }

    pub fn is_list(self) -> bool {
        matches!(self, EdgeKind::List | EdgeKind::NonEmptyList)
    }

    pub fn is_optional(self) -> bool {
        matches!(self, EdgeKind::Maybe | EdgeKind::OptLink)
    }

    /// The runtime wrapper type this edge kind emits as (`Exactly<T>`, …),
    /// matching `treeforge_runtime::edge`'s names one-to-one.
    pub fn wrapper_ident(self) -> &'static str {
        match self {
            EdgeKind::Exactly => "Exactly",
            EdgeKind::Maybe => "Maybe",
            EdgeKind::List => "List",
            EdgeKind::NonEmptyList => "NonEmptyList",
            EdgeKind::Link => "Link",
            EdgeKind::OptLink => "OptLink",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wrapper_ident())
    }
}

/// What a [`Field`] points at, once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Node(NodeId),
    Primitive(Primitive),
}

/// An opaque, externally-defined type the schema never describes the
/// shape of (§1, §4.1) — only its schema-local name and, optionally, the
/// concrete Rust path an `ext ... = "...";` directive gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub schema_name: String,
    pub rust_path: Option<String>,
}

impl Primitive {
    /// The Rust type to emit: the declared path if given, otherwise the
    /// schema name verbatim (must already be a valid, in-scope Rust type).
    pub fn rust_type(&self) -> &str {
        self.rust_path.as_deref().unwrap_or(&self.schema_name)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub doc: String,
    /// `None` for a bare, unwrapped primitive field (`name: String;`) —
    /// the value is stored directly, not behind an edge wrapper.
    /// `Some(kind)` for every `EdgeKind<...>`-wrapped field, including
    /// `Exactly<SomePrimitive>` (§3.1: "the EdgeKind may still be wrapped
    /// around the primitive").
    pub edge: Option<EdgeKind>,
    pub target: FieldTarget,
    /// The node type (by declaration, not inheritance) that first
    /// declared this field — used to tell an own field from an inherited
    /// one during emission.
    pub declared_on: NodeId,
}

#[derive(Debug, Clone)]
pub struct NodeType {
    pub id: NodeId,
    pub name: String,
    pub title_name: String,
    pub doc: String,
    pub is_error_marker: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// This node's own declared fields, in declaration order (does not
    /// include inherited fields — see [`Specification::all_fields`]).
    pub own_fields: Vec<Field>,
    /// `reorder(...)` directive, resolved field names kept in the order
    /// given; omitted names are appended after, in original order (§9).
    pub reorder: Option<Vec<String>>,
}

impl Field {
    /// Whether this field is a bare, unwrapped primitive (`name: String;`)
    /// rather than an `EdgeKind<...>`-wrapped one.
    pub fn is_bare(&self) -> bool {
        self.edge.is_none()
    }
}

impl NodeType {
    /// True iff no other `NodeType` derives from this one — leaf types are
    /// the only ones a tree ever actually instantiates (§3.1, §4.5).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub namespace: String,
    pub support: String,
    pub initialize_fn: String,
    pub serialize_fn: Option<String>,
    pub deserialize_fn: Option<String>,
    pub location_type: Option<String>,
    pub includes: Vec<String>,
}

impl Config {
    /// Whether the schema requested serialization support at all (§3.1:
    /// "optional names of the (ser, des) pair").
    pub fn wants_serde(&self) -> bool {
        self.serialize_fn.is_some() || self.deserialize_fn.is_some()
    }
}

/// The fully resolved specification: every [`NodeType`] in topological
/// (parents-before-children) order, plus global [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Specification {
    pub config: Config,
    pub nodes: Vec<NodeType>,
}

impl Specification {
    pub fn node(&self, id: NodeId) -> &NodeType {
        &self.nodes[id]
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// A node's fields in schema-declared order: ancestors' fields first
    /// (root-most ancestor first), each ancestor's own fields in its own
    /// declaration order, then this node's own fields — then, if a
    /// `reorder(...)` directive applies to this exact node, permuted per
    /// §9's "append omitted fields after the listed ones" rule.
    pub fn all_fields(&self, id: NodeId) -> Vec<&Field> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            chain.push(n);
            cur = self.nodes[n].parent;
        }
        chain.reverse();

        let mut fields: Vec<&Field> = Vec::new();
        for n in chain {
            fields.extend(self.nodes[n].own_fields.iter());
        }

        if let Some(order) = &self.nodes[id].reorder {
            let mut ordered: Vec<&Field> = Vec::new();
            for name in order {
                if let Some(f) = fields.iter().find(|f| &f.name == name) {
                    ordered.push(f);
                }
            }
            for f in &fields {
                if !order.contains(&f.name) {
                    ordered.push(f);
                }
            }
            ordered
        } else {
            fields
        }
    }

    /// All ancestors of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes[id].parent;
        while let Some(n) = cur {
            out.push(n);
            cur = self.nodes[n].parent;
        }
        out
    }

    /// Transitive leaf descendants of `id` (or `[id]` if `id` is itself a
    /// leaf) — the set a non-leaf NodeType's `@t` dispatch must cover
    /// (§4.5 "Non-leaf NodeTypes dispatch on `@t` among their transitive
    /// leaves").
    pub fn transitive_leaves(&self, id: NodeId) -> Vec<NodeId> {
        let node = &self.nodes[id];
        if node.is_leaf() {
            return vec![id];
        }
        node.children.iter().flat_map(|&c| self.transitive_leaves(c)).collect()
    }

    /// All leaf node types, in their original declared order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.id).collect()
    }
}
