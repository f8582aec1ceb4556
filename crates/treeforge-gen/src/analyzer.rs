//! Schema analyzer (C8): resolves a [`RawSpecification`] into the final
//! [`Specification`] (§4.7 "Analyzer").
//!
//! Responsibilities, in order: flatten the nested node blocks into a flat,
//! topologically ordered (parents before children) list assigning each a
//! [`NodeId`]; resolve every field's type name against that list or treat
//! it as an opaque primitive; wire up parent/child back-edges; validate
//! `reorder(...)` names and field-name uniqueness across inheritance; and
//! fill in defaults for anything the schema left unspecified.

use heck::ToPascalCase;
use std::collections::HashSet;

use crate::ast::{RawNode, RawSpecification};
use crate::error::SchemaError;
use crate::model::{Config, EdgeKind, Field, FieldTarget, NodeType, Primitive, Specification};

pub fn analyze(raw: RawSpecification) -> Result<Specification, SchemaError> {
    let mut nodes: Vec<NodeType> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for root in &raw.roots {
        flatten(root, None, &mut nodes, &mut seen_names)?;
    }

    // Field resolution happens in a second pass since a field may name a
    // node type declared later in the schema (forward references are
    // legal — §3.1 gives no declaration-order requirement for references).
    for i in 0..nodes.len() {
        let raw_node = find_raw(&raw.roots, &nodes[i].name)
            .expect("every flattened NodeType came from some RawNode");
        let own_fields = resolve_fields(raw_node, i, &nodes, &raw.externs)?;
        nodes[i].own_fields = own_fields;
    }

    // Validate reorder(...) and field-name uniqueness now that every
    // node's own_fields (and thus the full inherited chain) is resolved.
    for i in 0..nodes.len() {
        validate_field_names(&nodes, i)?;
        if let Some(order) = nodes[i].reorder.clone() {
            validate_reorder(&nodes, i, &order)?;
        }
    }

    if raw.initialize_fn.is_none() {
        let any_primitive_field = nodes
            .iter()
            .flat_map(|n| n.own_fields.iter())
            .any(|f| matches!(f.target, FieldTarget::Primitive(_)));
        if any_primitive_field {
            return Err(SchemaError::MissingInitializeFn { primitive: "<any>".to_string() });
        }
    }

    let config = Config {
        namespace: raw.namespace.unwrap_or_else(|| "generated_tree".to_string()),
        support: raw.support.unwrap_or_else(|| "treeforge_runtime".to_string()),
        initialize_fn: raw.initialize_fn.unwrap_or_else(|| "initialize".to_string()),
        serialize_fn: raw.serialize_fn,
        deserialize_fn: raw.deserialize_fn,
        location_type: raw.location_type,
        includes: raw.includes,
    };

    Ok(Specification { config, nodes })
}

fn find_raw<'a>(roots: &'a [RawNode], name: &str) -> Option<&'a RawNode> {
    for r in roots {
        if r.name == name {
            return Some(r);
        }
        if let Some(found) = find_raw(&r.children, name) {
            return Some(found);
        }
    }
    None
}

fn flatten(
    raw: &RawNode,
    parent: Option<usize>,
    nodes: &mut Vec<NodeType>,
    seen_names: &mut HashSet<String>,
) -> Result<usize, SchemaError> {
    if !seen_names.insert(raw.name.clone()) {
        return Err(SchemaError::DuplicateNode { name: raw.name.clone() });
    }

    let id = nodes.len();
    nodes.push(NodeType {
        id,
        name: raw.name.clone(),
        title_name: raw.name.to_pascal_case(),
        doc: raw.doc.clone(),
        is_error_marker: raw.is_error_marker,
        parent,
        children: Vec::new(),
        own_fields: Vec::new(),
        reorder: raw.reorder.clone(),
    });
    if let Some(p) = parent {
        nodes[p].children.push(id);
    }

    for child in &raw.children {
        flatten(child, Some(id), nodes, seen_names)?;
    }
    Ok(id)
}

fn resolve_fields(
    raw: &RawNode,
    declared_on: usize,
    nodes: &[NodeType],
    externs: &[crate::ast::RawExtern],
) -> Result<Vec<Field>, SchemaError> {
    raw.fields
        .iter()
        .map(|f| {
            // A bare, unwrapped field is always a primitive by grammar
            // (§4.7: `name: PrimitiveType;` is the bare-primitive-only
            // form) — node references require an EdgeKind wrapper, so we
            // never resolve a bare field's name against the node table.
            let edge = f.edge.map(|kw| match kw {
                crate::lexer::EdgeKeyword::Exactly => EdgeKind::Exactly,
                crate::lexer::EdgeKeyword::Maybe => EdgeKind::Maybe,
                crate::lexer::EdgeKeyword::List => EdgeKind::List,
                crate::lexer::EdgeKeyword::NonEmptyList => EdgeKind::NonEmptyList,
                crate::lexer::EdgeKeyword::Link => EdgeKind::Link,
                crate::lexer::EdgeKeyword::OptLink => EdgeKind::OptLink,
            });

            let target = if edge.is_none() {
                resolve_primitive(&f.type_name, externs)
            } else if let Some(nid) = nodes.iter().position(|n| n.name == f.type_name) {
                FieldTarget::Node(nid)
            } else {
                resolve_primitive(&f.type_name, externs)
            };

            if matches!(edge, Some(EdgeKind::Link) | Some(EdgeKind::OptLink)) {
                match &target {
                    FieldTarget::Primitive(p) => {
                        return Err(SchemaError::unknown_ref("node type", p.schema_name.clone(), raw.name.clone()));
                    }
                    FieldTarget::Node(nid) if !nodes[*nid].is_leaf() => {
                        return Err(SchemaError::LinkToNonLeaf {
                            node: raw.name.clone(),
                            field: f.name.clone(),
                            target: nodes[*nid].name.clone(),
                        });
                    }
                    FieldTarget::Node(_) => {}
                }
            }

            Ok(Field { name: f.name.clone(), doc: f.doc.clone(), edge, target, declared_on })
        })
        .collect()
}

fn resolve_primitive(type_name: &str, externs: &[crate::ast::RawExtern]) -> FieldTarget {
    if let Some(ext) = externs.iter().find(|e| e.name == type_name) {
        FieldTarget::Primitive(Primitive { schema_name: ext.name.clone(), rust_path: ext.rust_path.clone() })
    } else {
        FieldTarget::Primitive(Primitive { schema_name: type_name.to_string(), rust_path: None })
    }
}

fn validate_field_names(nodes: &[NodeType], id: usize) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut cur = Some(id);
    while let Some(n) = cur {
        chain.push(n);
        cur = nodes[n].parent;
    }
    chain.reverse();
    for n in chain {
        for f in &nodes[n].own_fields {
            if !seen.insert(f.name.clone()) {
                return Err(SchemaError::DuplicateField { node: nodes[id].name.clone(), field: f.name.clone() });
            }
        }
    }
    Ok(())
}

fn validate_reorder(nodes: &[NodeType], id: usize, order: &[String]) -> Result<(), SchemaError> {
    let all: HashSet<&str> = all_field_names(nodes, id);
    for name in order {
        if !all.contains(name.as_str()) {
            return Err(SchemaError::unknown_ref("field", name.clone(), nodes[id].name.clone()));
        }
    }
    Ok(())
}

fn all_field_names(nodes: &[NodeType], id: usize) -> HashSet<&str> {
    let mut set = HashSet::new();
    let mut cur = Some(id);
    while let Some(n) = cur {
        for f in &nodes[n].own_fields {
            set.insert(f.name.as_str());
        }
        cur = nodes[n].parent;
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn spec(src: &str) -> Specification {
        analyze(parse(src).unwrap()).unwrap()
    }

    #[test]
    fn resolves_node_references_and_inheritance() {
        let src = r#"
            namespace "fs";
            initialize "initialize";
            node entry {
                name: String;
                node file {
                    contents: String;
                }
                node mount {
                    target: Link<directory>;
                }
            }
            node directory {
                entries: List<entry>;
            }
        "#;
        let s = spec(src);
        let file = s.find_by_name("file").unwrap();
        let entry = s.find_by_name("entry").unwrap();
        assert_eq!(s.node(file).parent, Some(entry));
        let fields = s.all_fields(file);
        assert_eq!(fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), vec!["name", "contents"]);

        let directory = s.find_by_name("directory").unwrap();
        let entries_field = &s.node(directory).own_fields[0];
        assert_eq!(entries_field.target, FieldTarget::Node(entry));
    }

    #[test]
    fn duplicate_node_name_is_an_error() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node a { }
            node a { }
        "#;
        let err = analyze(parse(src).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateNode { .. }));
    }

    #[test]
    fn duplicate_field_across_inheritance_is_an_error() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                name: String;
                node file {
                    name: String;
                }
            }
        "#;
        let err = analyze(parse(src).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn link_to_a_primitive_is_an_error() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                target: Link<SomePrimitive>;
            }
        "#;
        let err = analyze(parse(src).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRef { .. }));
    }

    #[test]
    fn link_to_a_non_leaf_node_type_is_an_error() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                name: String;
                node file {
                    contents: String;
                }
                node mount {
                    target: Link<entry>;
                }
            }
        "#;
        let err = analyze(parse(src).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::LinkToNonLeaf { ref target, .. } if target == "entry"));
    }

    #[test]
    fn reorder_appends_omitted_fields_after_listed_ones() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                name: String;
                node mount {
                    target: Link<directory>;
                    extra: String;
                    reorder(target, name);
                }
            }
            node directory { }
        "#;
        let s = spec(src);
        let mount = s.find_by_name("mount").unwrap();
        let names: Vec<_> = s.all_fields(mount).iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["target", "name", "extra"]);
    }

    #[test]
    fn reorder_naming_unknown_field_is_an_error() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                name: String;
                reorder(nope);
            }
        "#;
        let err = analyze(parse(src).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRef { .. }));
    }
}
