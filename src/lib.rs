//! PCRE Pattern Front-End
//!
//! This crate ingests a delimited PCRE pattern string, produces a typed
//! abstract syntax tree, and exposes a family of analyses and
//! transformations over that tree: validation, re-compilation to canonical
//! pattern text, modernization, guaranteed-literal extraction, match-width
//! analysis and structural metrics.
//!
//! # Modules
//!
//! - `core`: AST nodes, the visitor protocol, lexer, parser and error types
//! - `passes`: the analysis and transformation visitors
//!
//! # Entry points
//!
//! [`parse`] and [`validate`] are the stateless façade; every other pass is
//! reached by constructing its visitor and calling `regex.accept(&mut v)`:
//!
//! ```
//! use pcre_ast::{parse, Compiler, LiteralExtractor};
//!
//! let regex = parse("/(a|b)c/").unwrap();
//! assert_eq!(Compiler::compile(&regex), "/(a|b)c/");
//! let literals = LiteralExtractor::extract(&regex);
//! assert!(literals.prefixes.contains("ac"));
//! ```

pub mod core;
pub mod passes;

// Re-export commonly used types for convenience
pub use crate::core::errors::{Error, LexerError, ParserError, ValidationError, ValidationResult};
pub use crate::core::nodes::{Node, Regex, Span};
pub use crate::core::visitor::{visit_children, Rewriter, Visitor};
pub use crate::passes::compiler::Compiler;
pub use crate::passes::length::{LengthAnalyzer, LengthRange};
pub use crate::passes::literals::{LiteralExtractor, LiteralSet};
pub use crate::passes::metrics::{Metrics, MetricsSnapshot};
pub use crate::passes::modernizer::Modernizer;
pub use crate::passes::validator::Validator;

/// Parse a delimited pattern (`D pattern D flags`) into its AST root.
pub fn parse(pattern: &str) -> Result<Regex, Error> {
    let lexed = crate::core::lexer::lex(pattern)?;
    let regex = crate::core::parser::Parser::new(lexed).parse()?;
    Ok(regex)
}

/// Parse and validate a pattern, folding every failure into the result.
pub fn validate(pattern: &str) -> ValidationResult {
    match parse(pattern) {
        Ok(regex) => match regex.accept(&mut Validator::new()) {
            Ok(()) => ValidationResult::ok(),
            Err(error) => ValidationResult::fail(error.message),
        },
        Err(error) => ValidationResult::fail(error.to_string()),
    }
}
