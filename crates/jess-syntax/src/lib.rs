//! The default parse oracle: a hand-written lexer and recursive-descent
//! parser for the Java subset the pipeline models.
//!
//! Constructs outside the subset (anonymous classes, switch, labelled loops,
//! text blocks) are reported as [`ParseError`]s rather than silently
//! mangled.

mod lexer;
mod parser;

pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_compilation_unit, parse_type_ref};

use jess_core::{LineCol, Span};

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub line: u32,
    pub col: u32,
}

impl ParseError {
    pub(crate) fn new(text: &str, span: Span, message: impl Into<String>) -> Self {
        let LineCol { line, col } = LineCol::of_offset(text, span.start);
        Self {
            message: message.into(),
            span,
            line,
            col,
        }
    }
}
