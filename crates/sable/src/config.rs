//! Compile options.
//!
//! [`Options`] controls the source syntax, the output style, where imports
//! are looked up and the safety limits of the evaluator. It implements
//! [`serde::Deserialize`] with kebab-case keys so it can be loaded from a
//! configuration file; every field is optional.
//!
//! # Example
//!
//! ```
//! # use sable::config::Options;
//! # use sable::{OutputStyle, Syntax};
//! let options = Options::default()
//!     .with_syntax(Syntax::Scss)
//!     .with_style(OutputStyle::Compressed);
//! assert_eq!(options.style(), OutputStyle::Compressed);
//! assert!(options.cache());
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use sable_core::style::{OutputStyle, Syntax};

const DEFAULT_MAX_CALL_DEPTH: usize = 64;
const DEFAULT_MAX_LOOP_ITERATIONS: usize = 100_000;

/// Options for a single compilation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    syntax: Syntax,
    style: OutputStyle,
    /// Directories searched by `@import`, in order.
    load_paths: Vec<PathBuf>,
    /// Emit `/* line N, file */` before each rule.
    line_comments: bool,
    cache: bool,
    /// Name of the source used in diagnostics and as the cache key of
    /// string compiles.
    filename: Option<String>,
    /// Silence `@debug` and `@warn`.
    quiet: bool,
    max_call_depth: usize,
    max_loop_iterations: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            syntax: Syntax::default(),
            style: OutputStyle::default(),
            load_paths: Vec::new(),
            line_comments: false,
            cache: true,
            filename: None,
            quiet: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
        }
    }
}

impl Options {
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn style(&self) -> OutputStyle {
        self.style
    }

    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }

    pub fn line_comments(&self) -> bool {
        self.line_comments
    }

    /// Whether compiled output may be read from and written to the cache.
    pub fn cache(&self) -> bool {
        self.cache
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// How many mixin and function calls may be nested.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// How many times a single `@while`, `@for` or `@each` may iterate.
    pub fn max_loop_iterations(&self) -> usize {
        self.max_loop_iterations
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_load_path(mut self, path: impl AsRef<Path>) -> Self {
        self.load_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_load_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.load_paths.extend(paths);
        self
    }

    pub fn with_line_comments(mut self, line_comments: bool) -> Self {
        self.line_comments = line_comments;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_loop_iterations(mut self, iterations: usize) -> Self {
        self.max_loop_iterations = iterations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.syntax(), Syntax::Indented);
        assert_eq!(options.style(), OutputStyle::Nested);
        assert!(options.load_paths().is_empty());
        assert!(!options.line_comments());
        assert!(options.cache());
        assert_eq!(options.max_call_depth(), 64);
        assert_eq!(options.max_loop_iterations(), 100_000);
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let options: Options = serde_json::from_str(
            r#"{"style": "compressed", "syntax": "scss", "line-comments": true, "load-paths": ["lib"]}"#,
        )
        .expect("valid options");
        assert_eq!(options.style(), OutputStyle::Compressed);
        assert_eq!(options.syntax(), Syntax::Scss);
        assert!(options.line_comments());
        assert_eq!(options.load_paths(), [PathBuf::from("lib")]);
        assert!(options.cache());
    }
}
