//! Tokenizer for the schema grammar (§4.7).
//!
//! A hand-written scanner over the regular-language subset of the schema
//! grammar: identifiers, string literals, doc comments (`///`, kept and
//! trimmed), the edge-kind keywords, and the handful of punctuation the
//! parser needs. Doc comments on consecutive lines are concatenated by the
//! parser, not here — the lexer just hands back one [`TokenKind::DocComment`]
//! per line so the parser can decide where a run of them ends.

use std::fmt;

use crate::error::SchemaError;

/// A lexed token together with its byte span in the source, used for
/// error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    StringLit(String),
    DocComment(String),
    /// `Exactly`, `Maybe`, `List`, `NonEmptyList`, `Link`, `OptLink`.
    EdgeKind(EdgeKeyword),
    KwNode,
    KwExt,
    KwError,
    KwReorder,
    KwNamespace,
    KwSupport,
    KwInitialize,
    KwSerialize,
    KwDeserialize,
    KwLocation,
    KwInclude,
    LBrace,
    RBrace,
    LAngle,
    RAngle,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Eq,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKeyword {
    Exactly,
    Maybe,
    List,
    NonEmptyList,
    Link,
    OptLink,
}

impl fmt::Display for EdgeKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKeyword::Exactly => "Exactly",
            EdgeKeyword::Maybe => "Maybe",
            EdgeKeyword::List => "List",
            EdgeKeyword::NonEmptyList => "NonEmptyList",
            EdgeKeyword::Link => "Link",
            EdgeKeyword::OptLink => "OptLink",
        };
        f.write_str(s)
    }
}

pub struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, bytes: src.as_bytes(), pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, SchemaError> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            out.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_insignificant(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') && self.bytes.get(self.pos + 2) != Some(&b'/') => {
                    while let Some(b) = self.peek_byte() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn err(&self, offset: usize, len: usize, message: impl Into<String>) -> SchemaError {
        SchemaError::parse_error(message, self.src.to_string(), offset, len)
    }

    fn next_token(&mut self) -> Result<Token, SchemaError> {
        self.skip_insignificant();
        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            return Ok(Token { kind: TokenKind::Eof, offset: start, len: 0 });
        };

        let kind = match b {
            b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') && self.bytes.get(self.pos + 2) == Some(&b'/') => {
                self.pos += 3;
                let line_start = self.pos;
                while let Some(b) = self.peek_byte() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                TokenKind::DocComment(self.src[line_start..self.pos].trim().to_string())
            }
            b'"' => {
                self.pos += 1;
                let str_start = self.pos;
                loop {
                    match self.bump() {
                        Some(b'"') => break,
                        Some(_) => continue,
                        None => return Err(self.err(start, self.pos - start, "unterminated string literal")),
                    }
                }
                TokenKind::StringLit(self.src[str_start..self.pos - 1].to_string())
            }
            b'{' => {
                self.pos += 1;
                TokenKind::LBrace
            }
            b'}' => {
                self.pos += 1;
                TokenKind::RBrace
            }
            b'<' => {
                self.pos += 1;
                TokenKind::LAngle
            }
            b'>' => {
                self.pos += 1;
                TokenKind::RAngle
            }
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b':' => {
                self.pos += 1;
                TokenKind::Colon
            }
            b';' => {
                self.pos += 1;
                TokenKind::Semicolon
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b'=' => {
                self.pos += 1;
                TokenKind::Eq
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while let Some(b) = self.peek_byte() {
                    if b.is_ascii_alphanumeric() || b == b'_' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                let word = &self.src[start..self.pos];
                classify_word(word)
            }
            other => {
                return Err(self.err(start, 1, format!("unexpected character '{}'", other as char)));
            }
        };
        Ok(Token { kind, offset: start, len: self.pos - start })
    }
}

fn classify_word(word: &str) -> TokenKind {
    match word {
        "Exactly" => TokenKind::EdgeKind(EdgeKeyword::Exactly),
        "Maybe" => TokenKind::EdgeKind(EdgeKeyword::Maybe),
        "List" => TokenKind::EdgeKind(EdgeKeyword::List),
        "NonEmptyList" => TokenKind::EdgeKind(EdgeKeyword::NonEmptyList),
        "Link" => TokenKind::EdgeKind(EdgeKeyword::Link),
        "OptLink" => TokenKind::EdgeKind(EdgeKeyword::OptLink),
        "node" => TokenKind::KwNode,
        "ext" => TokenKind::KwExt,
        "error" => TokenKind::KwError,
        "reorder" => TokenKind::KwReorder,
        "namespace" => TokenKind::KwNamespace,
        "support" => TokenKind::KwSupport,
        "initialize" => TokenKind::KwInitialize,
        "serialize" => TokenKind::KwSerialize,
        "deserialize" => TokenKind::KwDeserialize,
        "location" => TokenKind::KwLocation,
        "include" => TokenKind::KwInclude,
        _ => TokenKind::Ident(word.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_directives_and_node_block() {
        let src = r#"
            namespace "fs";
            /// A drive.
            node drive {
                letter: Letter;
                root_dir: Exactly<Directory>;
            }
        "#;
        let k = kinds(src);
        assert_eq!(k[0], TokenKind::KwNamespace);
        assert_eq!(k[1], TokenKind::StringLit("fs".into()));
        assert_eq!(k[2], TokenKind::Semicolon);
        assert_eq!(k[3], TokenKind::DocComment("A drive.".into()));
        assert_eq!(k[4], TokenKind::KwNode);
        assert_eq!(k[5], TokenKind::Ident("drive".into()));
        assert_eq!(k[6], TokenKind::LBrace);
        assert!(k.contains(&TokenKind::EdgeKind(EdgeKeyword::Exactly)));
        assert_eq!(*k.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn skips_line_comments_but_not_doc_comments() {
        let toks = kinds("// just a comment\nnamespace \"x\";");
        assert_eq!(toks[0], TokenKind::KwNamespace);
    }

    #[test]
    fn unterminated_string_errors() {
        let err = Lexer::new("namespace \"unterminated").tokenize().unwrap_err();
        assert!(matches!(err, SchemaError::ParseError { .. }));
    }
}
