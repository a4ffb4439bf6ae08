//! The error type returned by every compile phase.

use thiserror::Error;

use crate::error::Diagnostic;

/// Error type for the parse and compile lifecycle.
///
/// Wraps one or more diagnostics. The first one is the primary failure.
#[derive(Debug, Clone, Error)]
#[error("{}", summary(.diagnostics))]
pub struct SyntaxError {
    diagnostics: Vec<Diagnostic>,
}

impl SyntaxError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut [Diagnostic] {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// The primary diagnostic.
    pub fn primary(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }
}

/// `error[E300]: message`, followed by `(+N more)` when there are others.
fn summary(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => String::new(),
        [first] => first.to_string(),
        [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
    }
}

impl From<Diagnostic> for SyntaxError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for SyntaxError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_syntax_error_from_diagnostic() {
        let err: SyntaxError = Diagnostic::error("test error")
            .with_code(ErrorCode::E300)
            .into();

        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.to_string(), "error[E300]: test error");
    }

    #[test]
    fn test_syntax_error_display_multiple() {
        let err: SyntaxError = vec![
            Diagnostic::error("error 1"),
            Diagnostic::error("error 2"),
            Diagnostic::error("error 3"),
        ]
        .into();

        assert_eq!(err.to_string(), "error: error 1 (+2 more)");
    }
}
