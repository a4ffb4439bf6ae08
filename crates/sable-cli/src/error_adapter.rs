//! Error adapter for converting [`SableError`] to miette diagnostics.
//!
//! Each diagnostic of a compile error is rendered independently. Source
//! snippets are shown only when every label lies inside the source text the
//! error carries; diagnostics raised in another file are reported without
//! them.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use sable::SableError;
use sable_parser::{Diagnostic, Span};

/// A single error as miette renders it.
///
/// A compile error becomes one `Diagnostic` per stylesheet diagnostic; every
/// other [`SableError`] is reported as is.
#[derive(Debug)]
pub enum Reportable<'a> {
    Diagnostic { diag: &'a Diagnostic, src: &'a str },
    Error(&'a SableError),
}

impl Reportable<'_> {
    /// The stylesheet backtrace of a diagnostic, as `on line N of file`
    /// lines, or `None` when there is nothing to show.
    pub fn backtrace(&self, default_filename: &str) -> Option<String> {
        match self {
            Reportable::Diagnostic { diag, .. } => {
                let trace = diag.backtrace_string(default_filename);
                (!trace.is_empty()).then_some(trace)
            }
            Reportable::Error(_) => None,
        }
    }

    /// The diagnostic and its source, when every label lies inside that
    /// source.
    fn located(&self) -> Option<(&Diagnostic, &str)> {
        let Reportable::Diagnostic { diag, src } = self else {
            return None;
        };
        let labels = diag.labels();
        let fits = !labels.is_empty() && labels.iter().all(|label| label.span().end() <= src.len());
        fits.then_some((*diag, *src))
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic { diag, .. } => f.write_str(diag.message()),
            Reportable::Error(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic { diag, .. } => {
                diag.code().map(|c| Box::new(c) as Box<dyn fmt::Display>)
            }
            Reportable::Error(SableError::Io(_)) => Some(Box::new("sable::io")),
            Reportable::Error(SableError::Cache(_)) => Some(Box::new("sable::cache")),
            Reportable::Error(SableError::Compile { .. }) => None,
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic { diag, .. } => {
                diag.help().map(|h| Box::new(h) as Box<dyn fmt::Display>)
            }
            Reportable::Error(_) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic { src, .. } if self.located().is_some() => {
                Some(src as &dyn miette::SourceCode)
            }
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (diag, _) = self.located()?;
        Some(Box::new(diag.labels().iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`SableError`] into a list of reportable errors.
pub fn to_reportables(err: &SableError) -> Vec<Reportable<'_>> {
    match err {
        SableError::Compile { err: syntax_err, src } => syntax_err
            .diagnostics()
            .iter()
            .map(|diag| Reportable::Diagnostic { diag, src })
            .collect(),
        _ => vec![Reportable::Error(err)],
    }
}
