//! Command-line argument parsing for the `treeforge-gen` binary.
//!
//! Kept separate from `src/bin/codegen.rs` so a `build.rs` can derive man
//! pages and shell completions from the same [`clap::Command`] without
//! linking the binary itself.

use std::path::PathBuf;

use clap::Parser;

/// Compile one schema file into Rust source (§6):
/// `treeforge-gen <schema-file> <out-main> <out-impl> [<out-secondary>]`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compile a typed tree schema into Rust source")]
pub struct Args {
    /// Path to the schema file to compile.
    pub schema_file: PathBuf,

    /// Where to write the `NodeKind` discriminant, the generated `Visitor`
    /// trait, and every NodeType's declaration.
    pub out_main: PathBuf,

    /// Where to write every NodeType's `serialize`/`deserialize` bodies —
    /// written as a near-empty file when the schema names no (ser, des)
    /// pair.
    pub out_impl: PathBuf,

    /// Optional path for a second, self-contained, non-serializing
    /// emission of the same NodeTypes (§2) — a second consumer
    /// language/target pairing.
    pub out_secondary: Option<PathBuf>,
}
