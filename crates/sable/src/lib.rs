//! Sable - a compiler for the indented and SCSS stylesheet languages.
//!
//! A stylesheet goes through these stages:
//!
//! 1. parsing into a dynamic tree ([`sable_parser`]);
//! 2. structural checks on that tree;
//! 3. evaluation of variables, control directives, mixins, functions and
//!    imports, producing a nested static tree;
//! 4. flattening of nested rules and properties, collecting `@extend`;
//! 5. applying `@extend` to the flat tree;
//! 6. rendering as CSS in one of four output styles, or back to source.
//!
//! # Examples
//!
//! ```
//! use sable::{OutputStyle, Syntax, config::Options};
//!
//! let options = Options::default()
//!     .with_syntax(Syntax::Scss)
//!     .with_style(OutputStyle::Compact);
//! let css = sable::compile("$c: red;\n.a { color: $c; }", &options).expect("compiles");
//! assert_eq!(css, ".a { color: red; }\n");
//! ```

pub mod cache;
pub mod config;
pub mod importer;
pub mod staleness;
pub mod stylesheet;

mod check_nesting;
mod convert;
mod cssize;
mod environment;
mod error;
mod extend;
mod functions;
mod perform;
mod session;
mod to_css;

pub use sable_core::style::{OutputStyle, Syntax};
pub use sable_parser::{BacktraceFrame, Diagnostic, ErrorCode, SyntaxError};

pub use error::SableError;
pub use stylesheet::Stylesheet;

use std::{fs, path::Path, time::SystemTime};

use log::{debug, info, trace, warn};

use cache::{Artifact, CacheKey, CacheStore, MemoryStore};
use config::Options;
use importer::{FilesystemImporter, Importer, SourceId};
use session::Session;
use staleness::StalenessChecker;

/// Compile `source` with `options`.
///
/// # Errors
///
/// Returns the first syntax or evaluation error.
pub fn compile(source: &str, options: &Options) -> Result<String, SableError> {
    Compiler::new(options.clone()).compile(source)
}

/// The result of a compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub css: String,
    /// Warnings raised by `@warn` and by `@extend` targets that were never
    /// found.
    pub warnings: Vec<Diagnostic>,
    /// Every file imported, directly or not.
    pub dependencies: Vec<SourceId>,
}

/// Compiles stylesheets with a fixed set of options, importers and cache.
///
/// Importers are consulted in the order they were added, after those built
/// from [`Options::load_paths`].
///
/// # Examples
///
/// ```
/// use sable::{Compiler, Syntax, config::Options, importer::MemoryImporter};
///
/// let importer = MemoryImporter::new().with_file("_vars.scss", "$w: 10px;");
/// let compiler = Compiler::new(Options::default().with_syntax(Syntax::Scss))
///     .with_importer(importer);
/// let output = compiler
///     .compile_output("@import \"vars\";\n.a { width: $w * 2; }")
///     .expect("compiles");
/// assert_eq!(output.css, ".a {\n  width: 20px; }\n");
/// assert_eq!(output.dependencies.len(), 1);
/// ```
#[derive(Debug)]
pub struct Compiler {
    options: Options,
    importers: Vec<Box<dyn Importer>>,
    cache: Box<dyn CacheStore>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        let importers = options
            .load_paths()
            .iter()
            .map(|path| Box::new(FilesystemImporter::new(path)) as Box<dyn Importer>)
            .collect();
        Self {
            options,
            importers,
            cache: Box::new(MemoryStore::new()),
        }
    }

    /// Add an importer after the existing ones.
    pub fn with_importer(mut self, importer: impl Importer + 'static) -> Self {
        self.importers.push(Box::new(importer));
        self
    }

    /// Replace the cache store.
    pub fn with_cache_store(mut self, store: impl CacheStore + 'static) -> Self {
        self.cache = Box::new(store);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compile `source` to CSS.
    ///
    /// # Errors
    ///
    /// Returns the first syntax or evaluation error.
    pub fn compile(&self, source: &str) -> Result<String, SableError> {
        self.compile_output(source).map(|output| output.css)
    }

    /// Compile `source`, also returning its warnings and dependencies.
    ///
    /// # Errors
    ///
    /// Returns the first syntax or evaluation error.
    pub fn compile_output(&self, source: &str) -> Result<CompileOutput, SableError> {
        let key = (
            "string".to_string(),
            self.options.filename().unwrap_or("stdin").to_string(),
        );
        self.run(source, &self.options, self.importer_refs(), None, key)
    }

    /// Compile the file at `path`.
    ///
    /// The syntax follows the file extension when it is `.sass` or `.scss`.
    /// Imports are looked up next to the file before the load paths.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, or with the first syntax or
    /// evaluation error.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompileOutput, SableError> {
        let path = path.as_ref();
        info!(path:? = path; "compiling file");
        let source = fs::read_to_string(path)?;
        let syntax = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Syntax::from_extension)
            .unwrap_or(self.options.syntax());
        let uri = path.to_string_lossy().into_owned();
        let options = self
            .options
            .clone()
            .with_syntax(syntax)
            .with_filename(uri.clone());

        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let entry_importer = FilesystemImporter::new(dir);
        let key = entry_importer.cache_key(&uri);
        let mut importers = vec![&entry_importer as &dyn Importer];
        importers.extend(self.importer_refs());
        self.run(&source, &options, importers, Some(SourceId::new(0, uri)), key)
    }

    /// Compile `source` to its flattened tree, for rendering in several
    /// styles or converting back to source.
    ///
    /// # Errors
    ///
    /// Returns the first syntax or evaluation error.
    pub fn compile_to_stylesheet(&self, source: &str) -> Result<Stylesheet, SableError> {
        let mut session = Session::new(&self.options, self.importer_refs());
        build(source, &mut session, None)
    }

    fn importer_refs(&self) -> Vec<&dyn Importer> {
        self.importers
            .iter()
            .map(|importer| importer.as_ref() as &dyn Importer)
            .collect()
    }

    fn run(
        &self,
        source: &str,
        options: &Options,
        importers: Vec<&dyn Importer>,
        entry: Option<SourceId>,
        key: CacheKey,
    ) -> Result<CompileOutput, SableError> {
        info!(
            syntax:% = options.syntax(),
            style:% = options.style();
            "compiling stylesheet"
        );
        let started = SystemTime::now();
        let hash = options.cache().then(|| cache::content_hash(source, options));
        if let Some(hash) = &hash {
            if let Some(output) = self.cached(&key, hash, &importers) {
                return Ok(output);
            }
        }

        let mut session = Session::new(options, importers);
        let stylesheet = build(source, &mut session, entry)?;
        let css = stylesheet.to_css(options.style(), options.line_comments());
        let (warnings, dependencies) = session.into_parts();
        info!(bytes = css.len(), warnings = warnings.len(); "compiled stylesheet");

        if let Some(hash) = &hash {
            let artifact = Artifact::new(css.clone(), dependencies.clone(), started);
            let stored = artifact
                .to_bytes()
                .and_then(|bytes| self.cache.store(&key, hash, &bytes));
            if let Err(err) = stored {
                warn!(key:? = key, err:% = err; "could not cache stylesheet");
            }
        }
        Ok(CompileOutput {
            css,
            warnings,
            dependencies,
        })
    }

    /// A cached compile of the same source whose dependencies are
    /// unchanged.
    fn cached(
        &self,
        key: &CacheKey,
        hash: &str,
        importers: &[&dyn Importer],
    ) -> Option<CompileOutput> {
        let bytes = self.cache.retrieve(key, hash)?;
        let artifact = match Artifact::from_bytes(&bytes) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(key:? = key, err:% = err; "unreadable cache entry");
                return None;
            }
        };
        let mut checker = StalenessChecker::new(importers.to_vec());
        let stale = artifact.dependencies.iter().any(|dep| {
            checker.stylesheet_modified_since(&dep.uri, dep.importer, artifact.compiled_at())
        });
        if stale {
            debug!(key:? = key; "cached stylesheet is stale");
            return None;
        }
        trace!(key:? = key; "using cached stylesheet");
        Some(CompileOutput {
            css: artifact.css,
            warnings: Vec::new(),
            dependencies: artifact.dependencies,
        })
    }
}

/// Run every stage up to the flattened, extended tree.
fn build(
    source: &str,
    session: &mut Session<'_>,
    entry: Option<SourceId>,
) -> Result<Stylesheet, SableError> {
    let options = session.options();
    let filename = options.filename();
    if let Some(entry) = &entry {
        session.set_entry(entry.clone());
    }
    if let Some(filename) = filename {
        session.add_source(filename, source);
    }

    let root = sable_parser::parse(source, options.syntax(), filename)
        .map_err(|err| SableError::new_compile_error(err, source))?;
    check_nesting::check_nesting(&root)
        .map_err(|err| SableError::new_compile_error(err, source))?;

    let tree = perform::perform(&root, session, entry)
        .map_err(|diag| compile_error(diag, session, source))?;
    debug!("evaluated stylesheet");
    let (mut root, extensions) = cssize::cssize(tree, options.style())
        .map_err(|diag| compile_error(diag, session, source))?;
    debug!("flattened stylesheet");
    extensions.apply(&mut root, session);
    Ok(Stylesheet::new(root))
}

/// Wrap an evaluation error with the text of the file it names.
fn compile_error(diag: Diagnostic, session: &Session<'_>, source: &str) -> SableError {
    let src = diag
        .filename()
        .and_then(|filename| session.source(filename))
        .unwrap_or(source)
        .to_string();
    SableError::new_compile_error(SyntaxError::new(vec![diag]), src)
}
