//! Error Types - Position-Aware Diagnostics
//!
//! Two error kinds flow out of the front-end: lexing errors (bad or
//! unterminated delimiters, unknown flags) and parsing errors (structure).
//! Both carry a human-readable message plus the byte offset where the
//! problem was seen, and render a caret-context display pointing into the
//! offending input. Validation failures are a third, position-free kind
//! produced by the semantic gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Render `message` above the input with a caret under the failing offset.
fn caret_context(message: &str, text: &str, pos: usize) -> String {
    if text.is_empty() {
        return format!("{} at offset {}", message, pos);
    }
    // Clamp to a char boundary so the caret column is printable
    let col = text
        .char_indices()
        .take_while(|(i, _)| *i < pos)
        .count()
        .min(text.chars().count());
    format!("{}\n> {}\n>  {}^", message, text, " ".repeat(col))
}

/// Failure while splitting `D pattern D flags` into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexerError {
    pub message: String,
    /// Byte offset into the full delimited input.
    pub pos: usize,
    pub input: String,
}

impl LexerError {
    pub fn new(message: impl Into<String>, pos: usize, input: impl Into<String>) -> Self {
        LexerError {
            message: message.into(),
            pos,
            input: input.into(),
        }
    }

    fn format_error(&self) -> String {
        caret_context(&self.message, &self.input, self.pos)
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_error())
    }
}

impl std::error::Error for LexerError {}

/// Failure while parsing the pattern body into an AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserError {
    pub message: String,
    /// Byte offset into the pattern body (between the delimiters).
    pub pos: usize,
    pub pattern: String,
}

impl ParserError {
    pub fn new(message: impl Into<String>, pos: usize, pattern: impl Into<String>) -> Self {
        ParserError {
            message: message.into(),
            pos,
            pattern: pattern.into(),
        }
    }

    fn format_error(&self) -> String {
        caret_context(&self.message, &self.pattern, self.pos)
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_error())
    }
}

impl std::error::Error for ParserError {}

/// Semantic violation reported by the validator. The first violation aborts
/// the pass; errors are never accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
        }
    }
}

/// Umbrella error for the façade entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of `validate`: either ok, or the first failure's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            ok: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ValidationResult {
            ok: false,
            message: Some(message.into()),
        }
    }
}
