//! Collector for accumulating diagnostics during a processing phase.
//!
//! Phases that can report several independent problems (nesting checks,
//! for instance) push each one here instead of failing on the first.

use crate::error::{Diagnostic, SyntaxError};

/// Accumulates diagnostics and turns them into a result.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Finish collection.
    ///
    /// Returns every collected diagnostic as an error if any of them is an
    /// error, otherwise returns the warnings.
    pub fn finish(self) -> Result<Vec<Diagnostic>, SyntaxError> {
        if self.has_errors {
            Err(SyntaxError::new(self.diagnostics))
        } else {
            Ok(self.diagnostics)
        }
    }
}
