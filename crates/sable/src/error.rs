//! Error types for Sable operations.
//!
//! [`SableError`] wraps the failures a compile can end in. Stylesheet errors
//! carry structured diagnostics plus the source text of the file they were
//! raised in, so callers can render them with source snippets.

use std::io;

use thiserror::Error;

use sable_parser::error::SyntaxError;

/// The main error type for Sable operations.
#[derive(Debug, Error)]
pub enum SableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A lexer, parser or evaluation failure.
    ///
    /// `src` is the text of the file named by the primary diagnostic, or of
    /// the compiled source when the diagnostic names no other file.
    #[error("{err}")]
    Compile { err: SyntaxError, src: String },

    #[error("Cache error: {0}")]
    Cache(String),
}

impl SableError {
    /// Create a new `Compile` error with the associated source code.
    pub fn new_compile_error(err: SyntaxError, src: impl Into<String>) -> Self {
        Self::Compile {
            err,
            src: src.into(),
        }
    }

    /// The underlying stylesheet error, if this is one.
    pub fn syntax_error(&self) -> Option<&SyntaxError> {
        match self {
            Self::Compile { err, .. } => Some(err),
            _ => None,
        }
    }
}
