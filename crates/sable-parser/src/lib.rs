//! # Sable Parser
//!
//! Lexer and parsers for the two stylesheet syntaxes understood by Sable.
//! Both front-ends build the same dynamic tree of [`Node`]s; SassScript
//! expressions inside it are parsed by one shared precedence-climbing
//! parser.
//!
//! ## Usage
//!
//! ```
//! # use sable_parser::{parse, Syntax, SyntaxError};
//! fn main() -> Result<(), SyntaxError> {
//!     let source = "$c: red;\na { color: $c; }";
//!     let root = parse(source, Syntax::Scss, Some("main.scss"))?;
//!     assert_eq!(root.children.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! Resolved selector text is parsed separately with [`parse_selector`].

pub mod error;
mod lexer;
mod sass;
mod scanner;
mod script;
mod scss;
mod selector;
mod span;
mod stmt;
mod tokens;
pub mod tree;

#[cfg(test)]
mod parser_tests;

use std::sync::Arc;

use log::debug;

pub use error::{BacktraceFrame, Diagnostic, ErrorCode, ErrorKind, Severity, SyntaxError};
pub use sable_core::style::Syntax;
pub use selector::parse_selector;
pub use span::{LineIndex, Span, Spanned};
pub use tree::{
    BinaryOp, CallArgs, Expr, ExprKind, ImportTarget, InterpPart, Interpolation, Node, NodeKind,
    Param, UnaryOp,
};

use sass::SassParser;
use scss::ScssParser;

/// Parse a whole stylesheet into its dynamic tree.
///
/// `filename` is recorded on every node and on the diagnostic if parsing
/// fails.
///
/// # Errors
///
/// Returns a [`SyntaxError`] holding the first lexer or parser error.
pub fn parse(source: &str, syntax: Syntax, filename: Option<&str>) -> Result<Node, SyntaxError> {
    debug!(syntax:% = syntax, bytes = source.len(); "parsing stylesheet");
    let lines = LineIndex::new(source);
    let parsed = match syntax {
        Syntax::Indented => SassParser::new(source, &lines).parse(),
        Syntax::Scss => ScssParser::new(source, &lines).parse(),
    };
    match parsed {
        Ok(mut root) => {
            root.set_filename(filename.map(Arc::from));
            Ok(root)
        }
        Err(diag) => Err(SyntaxError::from(diag.with_filename(filename))),
    }
}

/// Parse a standalone SassScript expression, such as `1px + $x`.
///
/// # Errors
///
/// Fails if the text is not exactly one expression.
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let lines = LineIndex::new(source);
    script::parse_all(source, &lines).map_err(SyntaxError::from)
}
