//! Deciding whether a compiled stylesheet is out of date.
//!
//! A stylesheet needs recompiling when it, or any stylesheet it imports
//! directly or transitively, was modified after it was compiled. The
//! [`StalenessChecker`] memoizes modification times and dependency lists
//! for its own lifetime only, so create one per batch of checks.

use std::{
    collections::{HashMap, HashSet},
    time::SystemTime,
};

use log::{debug, trace};

use sable_parser::{ImportTarget, Node, NodeKind, parse};

use crate::importer::{self, ImportContext, Importer, SourceId};

pub struct StalenessChecker<'a> {
    importers: Vec<&'a dyn Importer>,
    mtimes: HashMap<SourceId, Option<SystemTime>>,
    /// `None` when the dependencies could not be computed.
    dependencies: HashMap<SourceId, Option<Vec<SourceId>>>,
    stale: HashMap<(SourceId, SystemTime), bool>,
    visiting: HashSet<SourceId>,
}

impl<'a> StalenessChecker<'a> {
    /// A checker resolving stylesheets through `importers`; a stylesheet's
    /// importer is named by its index in this list.
    pub fn new(importers: Vec<&'a dyn Importer>) -> Self {
        Self {
            importers,
            mtimes: HashMap::new(),
            dependencies: HashMap::new(),
            stale: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Whether the stylesheet `uri` must be recompiled, given when its
    /// compiled form was produced, if it ever was.
    pub fn stylesheet_needs_update(
        &mut self,
        uri: &str,
        importer: usize,
        compiled_at: Option<SystemTime>,
    ) -> bool {
        match compiled_at {
            Some(time) => self.stylesheet_modified_since(uri, importer, time),
            None => true,
        }
    }

    /// Whether `uri` or any of its dependencies changed after `time`.
    ///
    /// A stylesheet whose modification time is unknown, whose dependencies
    /// cannot be computed, or which imports itself counts as modified.
    pub fn stylesheet_modified_since(&mut self, uri: &str, importer: usize, time: SystemTime) -> bool {
        let id = SourceId::new(importer, uri);
        let modified = self.updated(&id, time);
        debug!(uri, modified; "checked stylesheet staleness");
        modified
    }

    /// The stylesheets `uri` imports directly, or `None` when it cannot be
    /// read or parsed or one of its imports cannot be found.
    pub fn dependencies(&mut self, uri: &str, importer: usize) -> Option<Vec<SourceId>> {
        self.dependencies_of(&SourceId::new(importer, uri))
    }

    fn updated(&mut self, id: &SourceId, time: SystemTime) -> bool {
        let Some(mtime) = self.mtime(id) else {
            trace!(uri:% = id; "no modification time");
            return true;
        };
        if mtime > time {
            trace!(uri:% = id; "modified");
            return true;
        }
        if let Some(&stale) = self.stale.get(&(id.clone(), time)) {
            return stale;
        }
        if !self.visiting.insert(id.clone()) {
            trace!(uri:% = id; "import cycle");
            return true;
        }
        let stale = match self.dependencies_of(id) {
            Some(deps) => deps.iter().any(|dep| self.updated(dep, time)),
            None => true,
        };
        self.visiting.remove(id);
        self.stale.insert((id.clone(), time), stale);
        stale
    }

    fn mtime(&mut self, id: &SourceId) -> Option<SystemTime> {
        if let Some(&mtime) = self.mtimes.get(id) {
            return mtime;
        }
        let mtime = self
            .importers
            .get(id.importer)
            .and_then(|importer| importer.mtime(&id.uri));
        self.mtimes.insert(id.clone(), mtime);
        mtime
    }

    fn dependencies_of(&mut self, id: &SourceId) -> Option<Vec<SourceId>> {
        if let Some(deps) = self.dependencies.get(id) {
            return deps.clone();
        }
        let deps = self.compute_dependencies(id);
        self.dependencies.insert(id.clone(), deps.clone());
        deps
    }

    fn compute_dependencies(&self, id: &SourceId) -> Option<Vec<SourceId>> {
        let found_by = self.importers.get(id.importer)?;
        let source = found_by
            .find(&id.uri, &ImportContext::default())
            .ok()
            .flatten()?;
        let root = parse(&source.contents, source.syntax, Some(id.uri.as_str())).ok()?;

        let mut uris = Vec::new();
        collect_imports(&root, &mut uris);
        let mut deps = Vec::with_capacity(uris.len());
        for uri in uris {
            let (dep, _) = importer::resolve(&self.importers, uri, Some(id)).ok().flatten()?;
            deps.push(dep);
        }
        trace!(uri:% = id, count = deps.len(); "computed dependencies");
        Some(deps)
    }
}

fn collect_imports<'n>(node: &'n Node, out: &mut Vec<&'n str>) {
    if let NodeKind::Import {
        target: ImportTarget::Sass(uri),
    } = &node.kind
    {
        out.push(uri);
    }
    for child in &node.children {
        collect_imports(child, out);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::importer::MemoryImporter;

    fn importer_at(mtime: SystemTime) -> MemoryImporter {
        let mut importer = MemoryImporter::new()
            .with_file("main.scss", "@import \"lib\";\n.a { x: 1; }")
            .with_file("_lib.scss", "@import \"colors\";")
            .with_file("_colors.scss", "$c: red;");
        importer.touch(mtime);
        importer
    }

    #[test]
    fn test_dependencies() {
        let importer = importer_at(SystemTime::now());
        let mut checker = StalenessChecker::new(vec![&importer as &dyn Importer]);
        assert_eq!(
            checker.dependencies("main.scss", 0),
            Some(vec![SourceId::new(0, "_lib.scss")])
        );
        assert_eq!(checker.dependencies("_colors.scss", 0), Some(Vec::new()));
    }

    #[test]
    fn test_modified_since() {
        let then = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let importer = importer_at(then);
        let mut checker = StalenessChecker::new(vec![&importer as &dyn Importer]);

        assert!(!checker.stylesheet_modified_since("main.scss", 0, then + Duration::from_secs(1)));
        assert!(checker.stylesheet_modified_since("main.scss", 0, then - Duration::from_secs(1)));
        assert!(checker.stylesheet_needs_update("main.scss", 0, None));
        assert!(checker.stylesheet_needs_update("missing.scss", 0, Some(then)));
    }

    #[test]
    fn test_missing_import_is_stale() {
        let then = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut importer = MemoryImporter::new().with_file("a.scss", "@import \"nowhere\";");
        importer.touch(then);
        let mut checker = StalenessChecker::new(vec![&importer as &dyn Importer]);
        assert_eq!(checker.dependencies("a.scss", 0), None);
        assert!(checker.stylesheet_modified_since("a.scss", 0, then + Duration::from_secs(1)));
    }

    #[test]
    fn test_import_cycle_is_stale() {
        let then = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut importer = MemoryImporter::new()
            .with_file("a.scss", "@import \"b\";")
            .with_file("b.scss", "@import \"a\";");
        importer.touch(then);
        let mut checker = StalenessChecker::new(vec![&importer as &dyn Importer]);
        assert!(checker.stylesheet_modified_since("a.scss", 0, then + Duration::from_secs(1)));
    }
}
