//! # Schema compiler for typed tree code generation
//!
//! Reads a schema describing a family of tree-shaped NodeTypes and emits
//! Rust source defining each one: structs/enums, constructors,
//! `copy`/`clone_deep`/`equals`, the visitor double-dispatch hook, and —
//! when the schema asks for it — a CBOR `serialize`/`deserialize` pair
//! built on [`treeforge_runtime`].
//!
//! ## Usage
//!
//! The `treeforge-gen` binary drives the whole pipeline from the command
//! line:
//!
//! ```bash
//! cargo run -p treeforge-gen -- schema.tree src/nodes.rs src/nodes_impl.rs
//! ```
//!
//! The library APIs below take schema text directly and never touch the
//! filesystem; reading the schema file and writing emitted output is the
//! binary's job (`src/bin/codegen.rs`).
//!
//! ## Pipeline
//!
//! ```text
//! schema text -> parser::parse -> analyzer::analyze -> codegen::emit_main/emit_impl/emit_minimal -> TokenStream
//! ```
//!
//! ## Modules
//!
//! - [`lexer`] — tokenizes schema source
//! - [`ast`] — the raw, unresolved parse tree
//! - [`parser`] — recursive-descent parsing of [`lexer::Token`]s into [`ast::RawSpecification`]
//! - [`model`] — the resolved schema model ([`model::Specification`]) emitters consume
//! - [`analyzer`] — resolves an [`ast::RawSpecification`] into a [`model::Specification`]
//! - [`codegen`] — `Specification -> TokenStream` emitters
//! - [`cli`] — command-line argument parsing for the `treeforge-gen` binary
//! - [`error`] — [`error::SchemaError`] and friends

pub mod analyzer;
pub mod ast;
pub mod cli;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;

use crate::error::SchemaError;
use crate::model::Specification;

/// Parse and resolve schema source text into a [`Specification`], ready
/// for [`codegen::emit_main`]/[`codegen::emit_impl`]/[`codegen::emit_minimal`].
/// Never touches the filesystem — `src` is already-read schema text.
pub fn compile(src: &str) -> Result<Specification, SchemaError> {
    let raw = parser::parse(src)?;
    analyzer::analyze(raw)
}
