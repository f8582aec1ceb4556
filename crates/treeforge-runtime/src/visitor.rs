//! Double-dispatch traversal over a tree of [`AnyNode`]s.
//!
//! [`Visitor`] is the abstract base: generated code adds one
//! `visit_<name>` method per schema `NodeType`, each defaulting to its
//! parent's method and bottoming out at [`Visitor::visit_node`]. Double
//! dispatch is realized as a tag-switch generated per schema, not runtime
//! polymorphism — this module only provides the root trait and the two
//! traversals ([`RecursiveVisitor`], [`Dumper`]) built on top of it that
//! don't need per-NodeType specialization.

use std::fmt::Write as _;

use crate::node::{AnyNode, FieldShape};

/// The root of the generated visitor hierarchy.
pub trait Visitor {
    type Output;

    /// The abstract fallback every `visit_<name>` method bottoms out at.
    fn visit_node(&mut self, node: &dyn AnyNode) -> Self::Output;
}

/// Visits every owned child of every node reached from the root, in
/// schema-declared field order, ignoring `Link`/`OptLink` targets.
#[derive(Debug, Default)]
pub struct RecursiveVisitor;

impl Visitor for RecursiveVisitor {
    type Output = ();

    fn visit_node(&mut self, node: &dyn AnyNode) {
        node.for_each_field(&mut |field| match field.shape {
            FieldShape::Single {
                node: Some(child), ..
            } => self.visit_node(child),
            FieldShape::Many(children) => {
                for child in children {
                    self.visit_node(child);
                }
            }
            FieldShape::Single { node: None, .. } | FieldShape::Link { .. } | FieldShape::Scalar(_) => {}
        });
    }
}

/// Writes an indented text representation of a tree, in the style a
/// developer staring at a debugger would want:
///
/// - `!MISSING` — a required `Exactly`/`Link` field that somehow ended up
///   empty (only reachable on an already-invalid tree; well-formed trees
///   never produce this).
/// - `-` — an unset `Maybe`/`OptLink` field.
/// - `[…]` — a `List`/`NonEmptyList` field, followed by its indented
///   elements.
/// - `<…>` — a populated `Maybe` field, followed by its indented node.
/// - `--> TypeName` — a `Link`/`OptLink` field, printed by target type name
///   only (never recursed into, to avoid both link cycles and duplicating
///   the owning tree's own dump of that node).
///
/// A node header reads `NodeName(`, its field lines are indented one level,
/// and the node closes on its own `)` line — `Root()` for a leaf with no
/// fields.
pub struct Dumper {
    out: String,
    indent: usize,
    annotation_comment: Option<Box<dyn Fn(&dyn AnyNode) -> Option<String>>>,
}

impl Dumper {
    /// A dumper with no inline annotation comment.
    pub fn new() -> Self {
        Dumper {
            out: String::new(),
            indent: 0,
            annotation_comment: None,
        }
    }

    /// A dumper that appends `# {comment}` after a node's header line
    /// whenever `comment` returns `Some`. Typically used with the schema's
    /// designated source-location annotation type.
    pub fn with_annotation_comment(comment: impl Fn(&dyn AnyNode) -> Option<String> + 'static) -> Self {
        Dumper {
            out: String::new(),
            indent: 0,
            annotation_comment: Some(Box::new(comment)),
        }
    }

    /// Run the dump starting at `root` and return the accumulated text.
    pub fn dump(mut self, root: &dyn AnyNode) -> String {
        self.visit_node(root);
        self.out
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn write_header(&mut self, node: &dyn AnyNode) {
        self.write_indent();
        let _ = write!(self.out, "{}(", node.node_type_name());
        if let Some(comment_fn) = &self.annotation_comment {
            if let Some(comment) = comment_fn(node) {
                let _ = write!(self.out, "  # {comment}");
            }
        }
        self.out.push('\n');
    }

    fn write_footer(&mut self) {
        self.write_indent();
        self.out.push_str(")\n");
    }

    fn write_field_line(&mut self, text: &str) {
        self.write_indent();
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl Default for Dumper {
    fn default() -> Self {
        Dumper::new()
    }
}

impl Visitor for Dumper {
    type Output = ();

    fn visit_node(&mut self, node: &dyn AnyNode) {
        self.write_header(node);
        self.indent += 1;
        node.for_each_field(&mut |field| match field.shape {
            FieldShape::Single { present: true, node: Some(child) } => {
                self.write_field_line(&format!("{}: <…>", field.name));
                self.indent += 1;
                self.visit_node(child);
                self.indent -= 1;
            }
            FieldShape::Single { present: true, node: None } => {
                self.write_field_line(&format!("{}: !MISSING", field.name));
            }
            FieldShape::Single { present: false, .. } => {
                self.write_field_line(&format!("{}: -", field.name));
            }
            FieldShape::Many(children) => {
                self.write_field_line(&format!("{}: […] ({})", field.name, children.len()));
                self.indent += 1;
                for child in children {
                    self.visit_node(child);
                }
                self.indent -= 1;
            }
            FieldShape::Link {
                present: true,
                target_type: Some(ty),
            } => {
                self.write_field_line(&format!("{}: --> {ty}", field.name));
            }
            FieldShape::Link {
                present: true,
                target_type: None,
            } => {
                self.write_field_line(&format!("{}: !MISSING", field.name));
            }
            FieldShape::Link { present: false, .. } => {
                self.write_field_line(&format!("{}: -", field.name));
            }
            FieldShape::Scalar(rendered) => {
                self.write_field_line(&format!("{}: {rendered}", field.name));
            }
        });
        self.indent -= 1;
        self.write_footer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationMap;

    struct Leaf {
        annotations: AnnotationMap,
    }

    impl AnyNode for Leaf {
        fn node_type_name(&self) -> &'static str {
            "leaf"
        }
        fn annotations(&self) -> crate::annotation::AnnotationsRef<'_> {
            crate::annotation::AnnotationsRef::Direct(&self.annotations)
        }
        fn annotations_mut(&mut self) -> crate::annotation::AnnotationsMut<'_> {
            crate::annotation::AnnotationsMut::Direct(&mut self.annotations)
        }
        fn find_reachable(&self, _map: &mut crate::wellformed::PointerMap) -> Result<(), crate::error::NotWellFormed> {
            Ok(())
        }
        fn check_complete(&self, _map: &crate::wellformed::PointerMap) -> Result<(), crate::error::NotWellFormed> {
            Ok(())
        }
    }

    struct Parent {
        annotations: AnnotationMap,
        child: Leaf,
        note: Option<Leaf>,
    }

    impl AnyNode for Parent {
        fn node_type_name(&self) -> &'static str {
            "parent"
        }
        fn annotations(&self) -> crate::annotation::AnnotationsRef<'_> {
            crate::annotation::AnnotationsRef::Direct(&self.annotations)
        }
        fn annotations_mut(&mut self) -> crate::annotation::AnnotationsMut<'_> {
            crate::annotation::AnnotationsMut::Direct(&mut self.annotations)
        }
        fn for_each_field(&self, f: &mut dyn FnMut(crate::node::Field<'_>)) {
            f(crate::node::Field {
                name: "child",
                shape: FieldShape::Single {
                    present: true,
                    node: Some(&self.child),
                },
            });
            f(crate::node::Field {
                name: "note",
                shape: FieldShape::Single {
                    present: self.note.is_some(),
                    node: self.note.as_ref().map(|n| n as &dyn AnyNode),
                },
            });
        }
        fn find_reachable(&self, map: &mut crate::wellformed::PointerMap) -> Result<(), crate::error::NotWellFormed> {
            self.child.find_reachable(map)
        }
        fn check_complete(&self, map: &crate::wellformed::PointerMap) -> Result<(), crate::error::NotWellFormed> {
            self.child.check_complete(map)
        }
    }

    #[test]
    fn recursive_visitor_descends_into_present_single_fields() {
        let mut visits = 0;
        struct Counter<'a>(&'a mut i32);
        impl Visitor for Counter<'_> {
            type Output = ();
            fn visit_node(&mut self, node: &dyn AnyNode) {
                *self.0 += 1;
                node.for_each_field(&mut |field| {
                    if let FieldShape::Single { node: Some(child), .. } = field.shape {
                        self.visit_node(child);
                    }
                });
            }
        }
        let tree = Parent {
            annotations: AnnotationMap::new(),
            child: Leaf { annotations: AnnotationMap::new() },
            note: None,
        };
        Counter(&mut visits).visit_node(&tree);
        assert_eq!(visits, 2);
    }

    #[test]
    fn dumper_marks_unset_optional_field() {
        let tree = Parent {
            annotations: AnnotationMap::new(),
            child: Leaf { annotations: AnnotationMap::new() },
            note: None,
        };
        let text = Dumper::new().dump(&tree);
        assert!(text.contains("parent"));
        assert!(text.contains("note: -"));
        assert!(text.contains("child: <…>"));
        assert!(text.contains("leaf"));
    }

    #[test]
    fn dumper_recurses_into_populated_optional_field() {
        let tree = Parent {
            annotations: AnnotationMap::new(),
            child: Leaf { annotations: AnnotationMap::new() },
            note: Some(Leaf { annotations: AnnotationMap::new() }),
        };
        let text = Dumper::new().dump(&tree);
        assert!(text.contains("note: <…>"));
    }
}
