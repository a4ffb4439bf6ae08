//! The core diagnostic type for the Sable error system.
//!
//! A [`Diagnostic`] represents a single error or warning with an optional
//! error code, labeled source spans, help text and a stylesheet backtrace.

use std::fmt;

use crate::{
    error::{ErrorCode, Label, Severity},
    span::Span,
};

/// One entry of a stylesheet backtrace.
///
/// The innermost frame is the place the error was raised. Each `@include`
/// or `@import` the error unwinds through adds an outer frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacktraceFrame {
    pub filename: Option<String>,
    pub line: Option<usize>,
    pub mixin: Option<String>,
}

impl BacktraceFrame {
    pub fn at_line(line: usize) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: Option<impl Into<String>>) -> Self {
        self.filename = filename.map(Into::into);
        self
    }

    pub fn with_mixin(mut self, mixin: impl Into<String>) -> Self {
        self.mixin = Some(mixin.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.filename.is_none() && self.line.is_none() && self.mixin.is_none()
    }

    /// Fill the fields this frame is missing from `attrs`, and clear from
    /// `attrs` every field this frame already had.
    fn absorb(&mut self, attrs: &mut BacktraceFrame) {
        fn merge<T>(slot: &mut Option<T>, attr: &mut Option<T>) {
            if slot.is_none() {
                *slot = attr.take();
            } else {
                *attr = None;
            }
        }
        merge(&mut self.filename, &mut attrs.filename);
        merge(&mut self.line, &mut attrs.line);
        merge(&mut self.mixin, &mut attrs.mixin);
    }
}

/// A rich diagnostic message with source location information.
///
/// # Example
///
/// ```text
/// error[E300]: Undefined variable: "$width".
///   on line 3 of main.scss, in `box'
///   from line 9 of main.scss
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
    backtrace: Vec<BacktraceFrame>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use sable_parser::error::{Diagnostic, ErrorCode};
    /// # use sable_parser::Span;
    /// let diag = Diagnostic::error("Undefined variable: \"$x\".")
    ///     .with_code(ErrorCode::E300)
    ///     .with_line(4)
    ///     .with_label(Span::new(10..12), "not defined")
    ///     .with_help("define the variable before using it");
    /// assert_eq!(diag.line(), Some(4));
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The backtrace, innermost frame first.
    pub fn backtrace(&self) -> &[BacktraceFrame] {
        &self.backtrace
    }

    /// The line the error was raised on.
    pub fn line(&self) -> Option<usize> {
        self.backtrace.first().and_then(|f| f.line)
    }

    /// The file the error was raised in.
    pub fn filename(&self) -> Option<&str> {
        self.backtrace.first().and_then(|f| f.filename.as_deref())
    }

    /// The mixin the error was raised in, if any.
    pub fn mixin(&self) -> Option<&str> {
        self.backtrace.first().and_then(|f| f.mixin.as_deref())
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Set the line of the innermost frame, if it has none yet.
    pub fn with_line(mut self, line: usize) -> Self {
        self.modify_backtrace(BacktraceFrame::at_line(line));
        self
    }

    /// Set the filename of the innermost frame, if it has none yet.
    pub fn with_filename(mut self, filename: Option<impl Into<String>>) -> Self {
        self.modify_backtrace(BacktraceFrame::default().with_filename(filename));
        self
    }

    /// Fill in missing backtrace fields.
    ///
    /// Frames are visited from the outermost inward. Each frame takes the
    /// fields it lacks from `attrs`; a field is consumed by the first frame
    /// that either takes it or already has it.
    pub fn modify_backtrace(&mut self, mut attrs: BacktraceFrame) {
        if attrs.is_empty() {
            return;
        }
        if self.backtrace.is_empty() {
            self.backtrace.push(attrs);
            return;
        }
        for frame in self.backtrace.iter_mut().rev() {
            frame.absorb(&mut attrs);
            if attrs.is_empty() {
                break;
            }
        }
    }

    /// Push a new outermost frame.
    pub fn add_backtrace(&mut self, frame: BacktraceFrame) {
        if self.backtrace.is_empty() {
            self.backtrace.push(BacktraceFrame::default());
        }
        self.backtrace.push(frame);
    }

    /// Render the backtrace as indented `on line N of file` lines.
    ///
    /// Frames without a filename use `default_filename`.
    pub fn backtrace_string(&self, default_filename: &str) -> String {
        let mut out = String::new();
        for (i, frame) in self.backtrace.iter().enumerate() {
            let Some(line) = frame.line else { continue };
            out.push_str(if i == 0 { "  on line " } else { "  from line " });
            out.push_str(&line.to_string());
            out.push_str(" of ");
            out.push_str(frame.filename.as_deref().unwrap_or(default_filename));
            if let Some(mixin) = &frame.mixin {
                out.push_str(", in `");
                out.push_str(mixin);
                out.push('\'');
            }
            out.push('\n');
        }
        out
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
            backtrace: Vec::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::error("test error");

        assert!(diag.severity().is_error());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.labels().is_empty());
        assert!(diag.backtrace().is_empty());
        assert_eq!(diag.line(), None);
    }

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::error("Undefined mixin 'foo'.").with_code(ErrorCode::E301);

        assert_eq!(diag.to_string(), "error[E301]: Undefined mixin 'foo'.");
    }

    #[test]
    fn test_diagnostic_display_without_code() {
        let diag = Diagnostic::warning("unused");

        assert_eq!(diag.to_string(), "warning: unused");
    }

    #[test]
    fn test_diagnostic_with_line_keeps_first_line() {
        let diag = Diagnostic::error("x").with_line(3).with_line(10);

        assert_eq!(diag.line(), Some(3));
    }

    #[test]
    fn test_modify_backtrace_fills_innermost_frame() {
        let mut diag = Diagnostic::error("x").with_line(3);
        diag.modify_backtrace(
            BacktraceFrame::default()
                .with_mixin("foo")
                .with_filename(Some("a.scss")),
        );

        assert_eq!(diag.line(), Some(3));
        assert_eq!(diag.mixin(), Some("foo"));
        assert_eq!(diag.filename(), Some("a.scss"));
    }

    #[test]
    fn test_add_backtrace_pushes_outer_frame() {
        let mut diag = Diagnostic::error("x").with_line(3);
        diag.modify_backtrace(BacktraceFrame::default().with_mixin("inner"));
        diag.add_backtrace(BacktraceFrame::at_line(9));
        diag.modify_backtrace(BacktraceFrame::default().with_mixin("outer"));
        diag.modify_backtrace(BacktraceFrame::default().with_filename(Some("main.scss")));

        let frames = diag.backtrace();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].mixin.as_deref(), Some("inner"));
        assert_eq!(frames[1].mixin.as_deref(), Some("outer"));
        assert_eq!(frames[1].filename.as_deref(), Some("main.scss"));
        // The outer frame took the filename; the inner one stays unset.
        assert_eq!(frames[0].filename, None);
    }

    #[test]
    fn test_backtrace_string() {
        let mut diag = Diagnostic::error("x").with_line(2);
        diag.modify_backtrace(BacktraceFrame::default().with_mixin("box"));
        diag.add_backtrace(BacktraceFrame::at_line(7));

        assert_eq!(
            diag.backtrace_string("main.scss"),
            "  on line 2 of main.scss, in `box'\n  from line 7 of main.scss\n"
        );
    }
}
