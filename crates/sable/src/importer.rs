//! Locating the stylesheets named by `@import`.
//!
//! An [`Importer`] maps an import name to source text. Each imported file
//! remembers which importer found it, so its own imports are looked up
//! relative to it first (through [`ImportContext::base`]) before the
//! importers of the load path are tried in order.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use sable_core::style::Syntax;

/// A stylesheet returned by an [`Importer`].
#[derive(Debug, Clone)]
pub struct ImportedSource {
    pub contents: String,
    pub syntax: Syntax,
    /// Name that identifies the file to the importer that found it. Passing
    /// it back to [`Importer::find`] finds the same file.
    pub canonical: String,
}

/// Where an import is being resolved from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportContext<'a> {
    /// Canonical name of the importing file, when that file came from the
    /// importer being asked.
    pub base: Option<&'a str>,
}

/// A file known to a compile: the index of the importer that found it and
/// its canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId {
    pub importer: usize,
    pub uri: String,
}

impl SourceId {
    pub fn new(importer: usize, uri: impl Into<String>) -> Self {
        Self {
            importer,
            uri: uri.into(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// A source of imported stylesheets.
pub trait Importer: fmt::Debug {
    /// Find the stylesheet `uri` names.
    ///
    /// # Errors
    ///
    /// Returns an error when a matching file exists but cannot be read.
    fn find(&self, uri: &str, ctx: &ImportContext<'_>) -> io::Result<Option<ImportedSource>>;

    /// Last modification time of the stylesheet with canonical name `uri`.
    fn mtime(&self, uri: &str) -> Option<SystemTime>;

    /// Cache key of the stylesheet with canonical name `uri`.
    fn cache_key(&self, uri: &str) -> (String, String);
}

/// Names to try for an import of `name`, in order.
///
/// A name with a stylesheet extension is used as given; otherwise the
/// partial (`_name`) and plain forms are tried with each extension.
fn candidates(name: &str) -> Vec<String> {
    let has_extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Syntax::from_extension)
        .is_some();
    if has_extension {
        return vec![name.to_string()];
    }
    let (dir, base) = match name.rfind('/') {
        Some(slash) => (&name[..=slash], &name[slash + 1..]),
        None => ("", name),
    };
    let mut names = Vec::with_capacity(4);
    for prefix in ["_", ""] {
        for syntax in [Syntax::Indented, Syntax::Scss] {
            names.push(format!("{dir}{prefix}{base}.{}", syntax.extension()));
        }
    }
    names
}

fn syntax_of(path: &str) -> Syntax {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Syntax::from_extension)
        .unwrap_or_default()
}

/// Pick the first match, warning when more than one file fits.
fn first_match(uri: &str, mut matches: Vec<String>) -> Option<String> {
    if matches.len() > 1 {
        warn!(
            uri,
            candidates:? = matches;
            "ambiguous import, using the first match"
        );
    }
    if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    }
}

/// Resolve an import against `importers`.
///
/// The importer that found `from` is asked first, relative to `from`; then
/// every importer in order.
///
/// # Errors
///
/// Returns the error of an importer that found the file but could not read
/// it.
pub(crate) fn resolve(
    importers: &[&dyn Importer],
    uri: &str,
    from: Option<&SourceId>,
) -> io::Result<Option<(SourceId, ImportedSource)>> {
    if let Some(from) = from {
        if let Some(importer) = importers.get(from.importer) {
            let ctx = ImportContext {
                base: Some(&from.uri),
            };
            if let Some(found) = importer.find(uri, &ctx)? {
                return Ok(Some((SourceId::new(from.importer, &found.canonical), found)));
            }
        }
    }
    for (index, importer) in importers.iter().enumerate() {
        if let Some(found) = importer.find(uri, &ImportContext::default())? {
            trace!(uri, importer = index; "import found");
            return Ok(Some((SourceId::new(index, &found.canonical), found)));
        }
    }
    Ok(None)
}

/// Finds stylesheets on disk under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemImporter {
    root: PathBuf,
}

impl FilesystemImporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_in(&self, dir: &Path, uri: &str) -> Option<String> {
        let matches = candidates(uri)
            .into_iter()
            .map(|name| dir.join(name))
            .filter(|path| path.is_file())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        first_match(uri, matches)
    }
}

impl Importer for FilesystemImporter {
    fn find(&self, uri: &str, ctx: &ImportContext<'_>) -> io::Result<Option<ImportedSource>> {
        let relative = ctx
            .base
            .and_then(|base| Path::new(base).parent())
            .and_then(|dir| self.find_in(dir, uri));
        let Some(path) = relative.or_else(|| self.find_in(&self.root, uri)) else {
            return Ok(None);
        };
        trace!(uri, path:% = path; "import resolved on disk");
        let contents = fs::read_to_string(&path)?;
        Ok(Some(ImportedSource {
            contents,
            syntax: syntax_of(&path),
            canonical: path,
        }))
    }

    fn mtime(&self, uri: &str) -> Option<SystemTime> {
        fs::metadata(uri).and_then(|meta| meta.modified()).ok()
    }

    fn cache_key(&self, uri: &str) -> (String, String) {
        let path = Path::new(uri);
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        (
            self.root.to_string_lossy().into_owned(),
            relative.to_string_lossy().into_owned(),
        )
    }
}

/// Serves stylesheets from memory.
///
/// Every file reports the same modification time, set at construction and
/// changed with [`MemoryImporter::touch`].
#[derive(Debug, Clone)]
pub struct MemoryImporter {
    files: HashMap<String, String>,
    mtime: SystemTime,
}

impl Default for MemoryImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            mtime: SystemTime::now(),
        }
    }

    /// Add a file; its syntax follows its extension.
    pub fn with_file(mut self, uri: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(uri, contents);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(uri.into(), contents.into());
    }

    /// Set the modification time reported for every file.
    pub fn touch(&mut self, mtime: SystemTime) {
        self.mtime = mtime;
    }

    fn find_in(&self, dir: &str, uri: &str) -> Option<String> {
        let matches = candidates(uri)
            .into_iter()
            .map(|name| format!("{dir}{name}"))
            .filter(|name| self.files.contains_key(name))
            .collect();
        first_match(uri, matches)
    }
}

impl Importer for MemoryImporter {
    fn find(&self, uri: &str, ctx: &ImportContext<'_>) -> io::Result<Option<ImportedSource>> {
        let relative = ctx
            .base
            .and_then(|base| base.rfind('/').map(|slash| &base[..=slash]))
            .and_then(|dir| self.find_in(dir, uri));
        let found = relative.or_else(|| self.find_in("", uri));
        Ok(found.and_then(|name| {
            self.files.get(&name).map(|contents| ImportedSource {
                contents: contents.clone(),
                syntax: syntax_of(&name),
                canonical: name,
            })
        }))
    }

    fn mtime(&self, uri: &str) -> Option<SystemTime> {
        self.files.contains_key(uri).then_some(self.mtime)
    }

    fn cache_key(&self, uri: &str) -> (String, String) {
        ("memory".to_string(), uri.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_candidates() {
        assert_eq!(
            candidates("lib/colors"),
            [
                "lib/_colors.sass",
                "lib/_colors.scss",
                "lib/colors.sass",
                "lib/colors.scss"
            ]
        );
        assert_eq!(candidates("a.scss"), ["a.scss"]);
    }

    #[test]
    fn test_filesystem_importer_finds_partials() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("_vars.scss"), "$a: 1;").expect("write");
        let importer = FilesystemImporter::new(dir.path());

        let found = importer
            .find("vars", &ImportContext::default())
            .expect("readable")
            .expect("found");
        assert_eq!(found.contents, "$a: 1;");
        assert_eq!(found.syntax, Syntax::Scss);
        assert!(importer.mtime(&found.canonical).is_some());
        assert_eq!(importer.cache_key(&found.canonical).1, "_vars.scss");
        assert!(
            importer
                .find("missing", &ImportContext::default())
                .expect("readable")
                .is_none()
        );
    }

    #[test]
    fn test_filesystem_importer_prefers_relative_match() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(dir.path().join("b.sass"), "// root").expect("write");
        fs::write(sub.join("b.sass"), "// sub").expect("write");
        let importer = FilesystemImporter::new(dir.path());

        let base = sub.join("a.sass").to_string_lossy().into_owned();
        let found = importer
            .find("b", &ImportContext { base: Some(&base) })
            .expect("readable")
            .expect("found");
        assert_eq!(found.contents, "// sub");
    }

    #[test]
    fn test_memory_importer() {
        let importer = MemoryImporter::new()
            .with_file("lib/_mixins.scss", "@mixin m {}")
            .with_file("lib/colors.sass", "$c: red");

        let found = importer
            .find("lib/mixins", &ImportContext::default())
            .expect("readable")
            .expect("found");
        assert_eq!(found.canonical, "lib/_mixins.scss");

        let relative = importer
            .find("colors", &ImportContext { base: Some("lib/_mixins.scss") })
            .expect("readable")
            .expect("found");
        assert_eq!(relative.syntax, Syntax::Indented);
        assert!(importer.mtime("lib/colors.sass").is_some());
        assert!(importer.mtime("nope").is_none());
    }
}
