//! Compiles a fixed schema fixture and checks the emitted source for the
//! shapes it must contain.
//!
//! This stands in for a byte-exact golden-file comparison: `prettyplease`'s
//! exact formatting (blank-line placement, wrapping thresholds) is an
//! implementation detail of a crate version, and pinning a byte-for-byte
//! fixture here would make the test brittle against upgrades that don't
//! change anything semantically. Structural assertions — which items,
//! methods, and signatures appear — catch the regressions that matter
//! (a field dropped from a struct, a wrong edge kind, a missing
//! `serialize` method) without coupling to formatter internals.

use treeforge_gen::codegen;

const SCHEMA: &str = r#"
namespace "fs";
support "treeforge_runtime";
initialize "initialize";
serialize "to_bytes";
deserialize "from_bytes";

ext Bytes = "Vec<u8>";

/// A filesystem entry: either a regular file or a mount point.
node entry {
    name: String;

    /// A regular file with byte contents.
    node file {
        contents: Bytes;
    }

    /// A mount point pointing at another drive's root directory.
    node mount {
        target: Link<directory>;
    }
}

node directory {
    entries: List<entry>;
}

node drive {
    label: String;
    root_dir: Exactly<directory>;
}

node system {
    drives: NonEmptyList<drive>;
}
"#;

fn compiled() -> treeforge_gen::model::Specification {
    treeforge_gen::compile(SCHEMA).expect("fixture schema compiles")
}

#[test]
fn analyzer_resolves_derivation_and_leaves() {
    let spec = compiled();
    let entry = spec.find_by_name("entry").unwrap();
    assert!(!spec.node(entry).is_leaf());
    assert_eq!(spec.transitive_leaves(entry).len(), 2);

    let file = spec.find_by_name("file").unwrap();
    assert_eq!(spec.node(file).parent, Some(entry));
    assert!(spec.node(file).is_leaf());

    let mut leaf_names: Vec<_> = spec.leaves().into_iter().map(|id| spec.node(id).name.clone()).collect();
    leaf_names.sort();
    assert_eq!(leaf_names, vec!["directory", "drive", "file", "mount", "system"]);
}

#[test]
fn out_main_declares_every_node_kind_and_variant_and_the_visitor_trait() {
    let spec = compiled();
    let src = codegen::render(codegen::emit_main(&spec)).expect("renders");

    assert!(src.contains("pub enum NodeKind"));
    for leaf in ["File", "Mount", "Directory", "Drive", "System"] {
        assert!(src.contains(leaf), "missing NodeKind/struct variant for {leaf}");
    }

    assert!(src.contains("pub enum Entry"));
    assert!(src.contains("RefCell<File>"));
    assert!(src.contains("RefCell<Mount>"));

    assert!(src.contains("pub trait Visitor"));
    assert!(src.contains("fn visit_entry"));
    assert!(src.contains("fn visit_file"));
    assert!(src.contains("fn visit_mount"));
    assert!(src.contains("fn visit_directory"));

    // out-main never carries (de)serialize bodies, even though this schema
    // asked for serde -- those live in out-impl.
    assert!(!src.contains("fn serialize"));
    assert!(!src.contains("fn deserialize"));
}

#[test]
fn out_impl_carries_serialize_and_deserialize_for_every_node_type() {
    let spec = compiled();
    let src = codegen::render(codegen::emit_impl(&spec)).expect("renders");

    assert!(src.contains("impl File"));
    assert!(src.contains("impl Mount"));
    assert!(src.contains("impl Entry"));
    assert!(src.contains("fn serialize"));
    assert!(src.contains("fn deserialize"));
    assert!(src.contains("DeserializeContext"));

    // The abstract NodeType's own serialize never writes the wrapper's own
    // sequence number, only the wrapped leaf's.
    assert!(src.contains("ids . sequence") || src.contains("ids.sequence"));
}

#[test]
fn out_impl_is_near_empty_when_schema_requests_no_wire_format() {
    const NO_SERDE_SCHEMA: &str = r#"
        namespace "x";
        initialize "initialize";
        node leaf {
            label: String;
        }
    "#;
    let spec = treeforge_gen::compile(NO_SERDE_SCHEMA).unwrap();
    assert!(!spec.config.wants_serde());
    let src = codegen::render(codegen::emit_impl(&spec)).expect("renders");
    assert!(!src.contains("fn serialize"));
    assert!(!src.contains("fn deserialize"));
}

#[test]
fn out_secondary_omits_serialize_even_when_schema_wants_it() {
    let spec = compiled();
    let src = codegen::render(codegen::emit_minimal(&spec)).expect("renders");
    assert!(src.contains("pub enum NodeKind"));
    assert!(src.contains("pub trait Visitor"));
    assert!(!src.contains("fn serialize"));
    assert!(!src.contains("fn deserialize"));
}

#[test]
fn reorder_directive_changes_declared_field_order() {
    const SCHEMA: &str = r#"
        namespace "x";
        initialize "initialize";
        node mount {
            target: Link<directory>;
            name: String;
            reorder(name, target);
        }
        node directory { }
    "#;
    let spec = treeforge_gen::compile(SCHEMA).unwrap();
    let mount = spec.find_by_name("mount").unwrap();
    let names: Vec<_> = spec.all_fields(mount).iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["name", "target"]);
}

#[test]
fn unresolvable_node_reference_is_a_schema_error() {
    const SCHEMA: &str = r#"
        namespace "x";
        initialize "initialize";
        node entry {
            target: Link<nowhere>;
        }
    "#;
    let err = treeforge_gen::compile(SCHEMA).unwrap_err();
    assert!(matches!(err, treeforge_gen::error::SchemaError::UnknownRef { .. }));
}

#[test]
fn compiled_output_writes_to_disk_as_valid_rust_files() {
    let spec = treeforge_gen::compile(SCHEMA).unwrap();

    let tmp_dir = tempfile::tempdir().expect("should be able to create temp directory for output");
    let out_main = tmp_dir.path().join("nodes.rs");
    let out_impl = tmp_dir.path().join("nodes_impl.rs");
    let out_secondary = tmp_dir.path().join("nodes_secondary.rs");

    std::fs::write(&out_main, codegen::render(codegen::emit_main(&spec)).unwrap()).unwrap();
    std::fs::write(&out_impl, codegen::render(codegen::emit_impl(&spec)).unwrap()).unwrap();
    std::fs::write(&out_secondary, codegen::render(codegen::emit_minimal(&spec)).unwrap()).unwrap();

    assert!(out_main.exists());
    assert!(out_impl.exists());
    assert!(out_secondary.exists());

    let main_src = std::fs::read_to_string(&out_main).unwrap();
    assert!(main_src.starts_with("// @generated by treeforge-gen. DO NOT EDIT."));
    syn::parse_file(&main_src).expect("emitted out-main must parse as valid Rust");

    let impl_src = std::fs::read_to_string(&out_impl).unwrap();
    syn::parse_file(&impl_src).expect("emitted out-impl must parse as valid Rust");

    let secondary_src = std::fs::read_to_string(&out_secondary).unwrap();
    syn::parse_file(&secondary_src).expect("emitted out-secondary must parse as valid Rust");
}
