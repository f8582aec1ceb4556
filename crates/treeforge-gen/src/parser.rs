//! Recursive-descent parser over the schema grammar (§4.7).
//!
//! A predictive recursive-descent parser — one function per production, a
//! single token of lookahead — over the same lexer/token grammar a
//! table-driven LALR parser would consume. Chosen as the idiom more
//! natural to a hand-written Rust tool (see `DESIGN.md`); the grammar
//! itself is unchanged.

use crate::ast::{RawExtern, RawField, RawNode, RawSpecification};
use crate::error::SchemaError;
use crate::lexer::{EdgeKeyword, Lexer, Token, TokenKind};

pub fn parse(src: &str) -> Result<RawSpecification, SchemaError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(src, tokens).parse_specification()
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    pending_doc: Vec<String>,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str, tokens: Vec<Token>) -> Self {
        Self { src, tokens, pos: 0, pending_doc: Vec::new() }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        let tok = self.current();
        SchemaError::parse_error(message, self.src.to_string(), tok.offset, tok.len.max(1))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, SchemaError> {
        if self.peek() == kind {
            Ok(self.bump())
        } else {
            Err(self.err(format!("expected {what}, found {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SchemaError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String, SchemaError> {
        match self.peek().clone() {
            TokenKind::StringLit(s) => {
                self.bump();
                Ok(s)
            }
            other => Err(self.err(format!("expected string literal, found {other:?}"))),
        }
    }

    /// Consumes a run of consecutive doc-comment tokens, concatenating
    /// their lines, and stashes the result to be attached to the next
    /// node or field declaration (§4.7: "documentation comments (kept,
    /// concatenated, trimmed)").
    fn collect_doc(&mut self) {
        while let TokenKind::DocComment(line) = self.peek().clone() {
            self.bump();
            self.pending_doc.push(line);
        }
    }

    fn take_doc(&mut self) -> String {
        let doc = self.pending_doc.join("\n");
        self.pending_doc.clear();
        doc
    }

    fn parse_specification(&mut self) -> Result<RawSpecification, SchemaError> {
        let mut spec = RawSpecification::default();
        loop {
            self.collect_doc();
            match self.peek().clone() {
                TokenKind::Eof => break,
                TokenKind::KwNamespace => {
                    self.bump();
                    let name = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    if spec.namespace.is_some() {
                        return Err(SchemaError::DuplicateDirective { directive: "namespace" });
                    }
                    spec.namespace = Some(name);
                }
                TokenKind::KwSupport => {
                    self.bump();
                    let name = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.support = Some(name);
                }
                TokenKind::KwInitialize => {
                    self.bump();
                    let name = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.initialize_fn = Some(name);
                }
                TokenKind::KwSerialize => {
                    self.bump();
                    let name = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.serialize_fn = Some(name);
                }
                TokenKind::KwDeserialize => {
                    self.bump();
                    let name = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.deserialize_fn = Some(name);
                }
                TokenKind::KwLocation => {
                    self.bump();
                    let name = self.expect_ident()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.location_type = Some(name);
                }
                TokenKind::KwInclude => {
                    self.bump();
                    let path = self.expect_string()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.includes.push(path);
                }
                TokenKind::KwExt => {
                    self.bump();
                    let name = self.expect_ident()?;
                    let rust_path = if self.peek() == &TokenKind::Eq {
                        self.bump();
                        Some(self.expect_string()?)
                    } else {
                        None
                    };
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    spec.externs.push(RawExtern { name, rust_path });
                }
                TokenKind::KwError | TokenKind::KwNode => {
                    let doc = self.take_doc();
                    spec.roots.push(self.parse_node(doc)?);
                }
                other => return Err(self.err(format!("unexpected top-level token {other:?}"))),
            }
        }
        Ok(spec)
    }

    fn parse_node(&mut self, doc: String) -> Result<RawNode, SchemaError> {
        let is_error_marker = if self.peek() == &TokenKind::KwError {
            self.bump();
            true
        } else {
            false
        };
        self.expect(&TokenKind::KwNode, "'node'")?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace, "'{'")?;

        let mut fields = Vec::new();
        let mut children = Vec::new();
        let mut reorder = None;

        loop {
            self.collect_doc();
            match self.peek().clone() {
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                TokenKind::KwReorder => {
                    self.bump();
                    reorder = Some(self.parse_reorder_args()?);
                }
                TokenKind::KwNode | TokenKind::KwError => {
                    let child_doc = self.take_doc();
                    children.push(self.parse_node(child_doc)?);
                }
                TokenKind::Ident(_) => {
                    let field_doc = self.take_doc();
                    fields.push(self.parse_field(field_doc)?);
                }
                other => return Err(self.err(format!("unexpected token in node body: {other:?}"))),
            }
        }

        Ok(RawNode { name, doc, is_error_marker, fields, reorder, children })
    }

    fn parse_field(&mut self, doc: String) -> Result<RawField, SchemaError> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Colon, "':'")?;

        let (edge, type_name) = match self.peek().clone() {
            TokenKind::EdgeKind(kw) => {
                self.bump();
                self.expect(&TokenKind::LAngle, "'<'")?;
                let inner = self.expect_ident()?;
                self.expect(&TokenKind::RAngle, "'>'")?;
                (Some(kw), inner)
            }
            TokenKind::Ident(bare) => {
                self.bump();
                (None, bare)
            }
            other => return Err(self.err(format!("expected a field type, found {other:?}"))),
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(RawField { name, doc, edge, type_name })
    }

    /// Parses a `reorder(a, b, c);` directive's argument list, called
    /// just after the `reorder` keyword has been consumed.
    fn parse_reorder_args(&mut self) -> Result<Vec<String>, SchemaError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut names = Vec::new();
        loop {
            if self.peek() == &TokenKind::RParen {
                self.bump();
                break;
            }
            names.push(self.expect_ident()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RParen => {}
                other => return Err(self.err(format!("expected ',' or ')', found {other:?}"))),
            }
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_spec() {
        let src = r#"
            namespace "fs";
            support "treeforge_runtime";
            initialize "initialize";

            /// The whole filesystem.
            node system {
                drives: NonEmptyList<drive>;
            }

            node drive {
                letter: Letter;
                root_dir: Exactly<directory>;
            }
        "#;
        let spec = parse(src).unwrap();
        assert_eq!(spec.namespace.as_deref(), Some("fs"));
        assert_eq!(spec.roots.len(), 2);
        assert_eq!(spec.roots[0].name, "system");
        assert_eq!(spec.roots[0].doc, "The whole filesystem.");
        assert_eq!(spec.roots[0].fields[0].name, "drives");
    }

    #[test]
    fn parses_nested_derivation_and_error_marker() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node entry {
                name: String;

                node file {
                    contents: String;
                }

                error node parse_error {
                }
            }
        "#;
        let spec = parse(src).unwrap();
        let entry = &spec.roots[0];
        assert_eq!(entry.children.len(), 2);
        assert_eq!(entry.children[0].name, "file");
        assert!(entry.children[1].is_error_marker);
    }

    #[test]
    fn bare_primitive_field_has_no_edge() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node leaf {
                label: String;
            }
        "#;
        let spec = parse(src).unwrap();
        assert!(spec.roots[0].fields[0].edge.is_none());
    }

    #[test]
    fn parses_reorder_directive() {
        let src = r#"
            namespace "x";
            initialize "initialize";
            node mount {
                target: Link<directory>;
                name: String;
                reorder(name, target);
            }
        "#;
        let spec = parse(src).unwrap();
        assert_eq!(spec.roots[0].reorder, Some(vec!["name".to_string(), "target".to_string()]));
    }

    #[test]
    fn unknown_directive_is_a_parse_error() {
        let err = parse("bogus \"x\";").unwrap_err();
        assert!(matches!(err, SchemaError::ParseError { .. }));
    }
}
