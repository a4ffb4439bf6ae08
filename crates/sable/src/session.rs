//! State of one compilation.
//!
//! A [`Session`] is created per compile and threaded through evaluation. It
//! owns the warnings raised so far, the stack of files being imported, the
//! set of files the output depends on and the source text of every file
//! read, which is needed to render diagnostics.

use std::{collections::HashMap, io};

use indexmap::IndexSet;
use log::warn;

use sable_parser::error::Diagnostic;

use crate::{
    config::Options,
    importer::{self, ImportedSource, Importer, SourceId},
};

pub(crate) struct Session<'a> {
    options: &'a Options,
    importers: Vec<&'a dyn Importer>,
    warnings: Vec<Diagnostic>,
    import_stack: Vec<SourceId>,
    dependencies: IndexSet<SourceId>,
    sources: HashMap<String, String>,
}

impl<'a> Session<'a> {
    pub fn new(options: &'a Options, importers: Vec<&'a dyn Importer>) -> Self {
        Self {
            options,
            importers,
            warnings: Vec::new(),
            import_stack: Vec::new(),
            dependencies: IndexSet::new(),
            sources: HashMap::new(),
        }
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    /// Record a warning. Also logs it unless the session is quiet.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        if !self.options.quiet() {
            warn!(
                line:? = diagnostic.line(),
                file:? = diagnostic.filename();
                "{}", diagnostic.message()
            );
        }
        self.warnings.push(diagnostic);
    }

    /// Resolve an import, relative to `from` first.
    ///
    /// # Errors
    ///
    /// Returns the error of an importer that found the file but could not
    /// read it.
    pub fn resolve(
        &self,
        uri: &str,
        from: Option<&SourceId>,
    ) -> io::Result<Option<(SourceId, ImportedSource)>> {
        importer::resolve(&self.importers, uri, from)
    }

    /// Enter an imported file, returning the files forming a loop if it is
    /// already being imported.
    pub fn enter_import(&mut self, id: &SourceId) -> Result<(), Vec<SourceId>> {
        if let Some(start) = self.import_stack.iter().position(|s| s == id) {
            let mut cycle = self.import_stack[start..].to_vec();
            cycle.push(id.clone());
            return Err(cycle);
        }
        self.import_stack.push(id.clone());
        self.dependencies.insert(id.clone());
        Ok(())
    }

    pub fn leave_import(&mut self) {
        self.import_stack.pop();
    }

    /// Make `id` the bottom of the import stack, for file compiles.
    pub fn set_entry(&mut self, id: SourceId) {
        self.import_stack.push(id);
    }

    pub fn add_source(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.sources.insert(name.into(), contents.into());
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<SourceId>) {
        (self.warnings, self.dependencies.into_iter().collect())
    }
}
