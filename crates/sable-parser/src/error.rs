//! Error and diagnostic system for the Sable parser and compiler.
//!
//! The error system is built around the [`Diagnostic`] type: a single error
//! or warning with an optional [`ErrorCode`], labeled source spans, help
//! text and a stylesheet backtrace. One or more diagnostics are wrapped in a
//! [`SyntaxError`] when a phase fails.
//!
//! # Example
//!
//! ```
//! # use sable_parser::error::{BacktraceFrame, Diagnostic, ErrorCode};
//! # use sable_parser::Span;
//! let mut diag = Diagnostic::error("Undefined variable: \"$x\".")
//!     .with_code(ErrorCode::E300)
//!     .with_line(2)
//!     .with_label(Span::new(14..16), "undefined variable");
//!
//! // Unwinding through `@include box` on line 8:
//! diag.modify_backtrace(BacktraceFrame::default().with_mixin("box"));
//! diag.add_backtrace(BacktraceFrame::at_line(8));
//!
//! assert_eq!(diag.backtrace().len(), 2);
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod severity;
mod syntax_error;

pub use collector::DiagnosticCollector;
pub use diagnostic::{BacktraceFrame, Diagnostic};
pub use error_code::{ErrorCode, ErrorKind};
pub use label::Label;
pub use severity::Severity;
pub use syntax_error::SyntaxError;

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;
