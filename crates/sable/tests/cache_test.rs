//! Integration tests for compile caching and file compiles.

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, SystemTime},
};

use tempfile::tempdir;

use sable::{
    Compiler, SableError, Syntax,
    cache::{CacheKey, CacheStore, FilesystemStore, MemoryStore},
    config::Options,
    importer::MemoryImporter,
};

/// A memory store that counts how often it is written and read.
#[derive(Debug, Default)]
struct CountingStore {
    inner: MemoryStore,
    stores: Arc<AtomicUsize>,
    hits: Arc<AtomicUsize>,
}

impl CacheStore for CountingStore {
    fn store(&self, key: &CacheKey, content_hash: &str, bytes: &[u8]) -> Result<(), SableError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, content_hash, bytes)
    }

    fn retrieve(&self, key: &CacheKey, content_hash: &str) -> Option<Vec<u8>> {
        let found = self.inner.retrieve(key, content_hash);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        found
    }
}

fn importer_at(mtime: SystemTime) -> MemoryImporter {
    let mut importer = MemoryImporter::new().with_file("_vars.scss", "$w: 10px;");
    importer.touch(mtime);
    importer
}

fn scss() -> Options {
    Options::default().with_syntax(Syntax::Scss)
}

const SOURCE: &str = "@import \"vars\";\n.a { width: $w; }";

#[test]
fn test_second_compile_uses_the_cache() {
    let store = CountingStore::default();
    let stores = Arc::clone(&store.stores);
    let hits = Arc::clone(&store.hits);
    let compiler = Compiler::new(scss())
        .with_importer(importer_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)))
        .with_cache_store(store);

    let first = compiler.compile_output(SOURCE).expect("compiles");
    let second = compiler.compile_output(SOURCE).expect("compiles");

    assert_eq!(stores.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(first.css, second.css);
    assert_eq!(first.dependencies, second.dependencies);
}

#[test]
fn test_changed_source_is_recompiled() {
    let store = CountingStore::default();
    let stores = Arc::clone(&store.stores);
    let compiler = Compiler::new(scss())
        .with_importer(importer_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)))
        .with_cache_store(store);

    compiler.compile(SOURCE).expect("compiles");
    let css = compiler
        .compile("@import \"vars\";\n.a { width: $w * 2; }")
        .expect("compiles");
    assert_eq!(css, ".a {\n  width: 20px; }\n");
    assert_eq!(stores.load(Ordering::SeqCst), 2);
}

#[test]
fn test_modified_dependency_is_recompiled() {
    let store = CountingStore::default();
    let stores = Arc::clone(&store.stores);
    let hits = Arc::clone(&store.hits);
    // Every dependency looks newer than any compile.
    let future = SystemTime::now() + Duration::from_secs(3_600);
    let compiler = Compiler::new(scss())
        .with_importer(importer_at(future))
        .with_cache_store(store);

    compiler.compile(SOURCE).expect("compiles");
    compiler.compile(SOURCE).expect("compiles");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(stores.load(Ordering::SeqCst), 2);
}

#[test]
fn test_disabled_cache_is_never_touched() {
    let store = CountingStore::default();
    let stores = Arc::clone(&store.stores);
    let hits = Arc::clone(&store.hits);
    let compiler = Compiler::new(scss().with_cache(false))
        .with_importer(importer_at(SystemTime::UNIX_EPOCH))
        .with_cache_store(store);

    compiler.compile(SOURCE).expect("compiles");
    compiler.compile(SOURCE).expect("compiles");
    assert_eq!(stores.load(Ordering::SeqCst), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_compile_file_follows_the_extension() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("_mixins.sass"), "=pad($n)\n  padding: $n\n").expect("write");
    fs::write(
        dir.path().join("main.scss"),
        "@import \"mixins\";\n.a { @include pad(3px); }\n",
    )
    .expect("write");

    // The options say indented; the file is SCSS.
    let compiler = Compiler::new(Options::default().with_cache(false));
    let output = compiler
        .compile_file(dir.path().join("main.scss"))
        .expect("compiles");
    assert_eq!(output.css, ".a {\n  padding: 3px; }\n");
    assert_eq!(output.dependencies.len(), 1);
    assert!(output.dependencies[0].uri.ends_with("_mixins.sass"));
}

#[test]
fn test_compile_file_uses_load_paths() {
    let dir = tempdir().expect("temp dir");
    let lib = dir.path().join("lib");
    fs::create_dir(&lib).expect("mkdir");
    fs::write(lib.join("_theme.scss"), "$fg: red;").expect("write");
    fs::write(dir.path().join("site.scss"), "@import \"theme\";\nbody { color: $fg; }").expect("write");

    let compiler = Compiler::new(scss().with_cache(false).with_load_path(&lib));
    let output = compiler
        .compile_file(dir.path().join("site.scss"))
        .expect("compiles");
    assert_eq!(output.css, "body {\n  color: red; }\n");
}

#[test]
fn test_compile_file_missing() {
    let dir = tempdir().expect("temp dir");
    let err = Compiler::default()
        .compile_file(dir.path().join("absent.scss"))
        .expect_err("no such file");
    assert!(matches!(err, SableError::Io(_)));
}

#[test]
fn test_filesystem_cache_sees_changed_imports() {
    let dir = tempdir().expect("temp dir");
    let cache_dir = dir.path().join("cache");
    let partial = dir.path().join("_vars.scss");
    let main = dir.path().join("main.scss");
    fs::write(&partial, "$w: 1px;").expect("write");
    fs::write(&main, "@import \"vars\";\n.a { width: $w; }").expect("write");

    let compiler = Compiler::new(scss()).with_cache_store(FilesystemStore::new(&cache_dir));
    let first = compiler.compile_file(&main).expect("compiles");
    assert_eq!(first.css, ".a {\n  width: 1px; }\n");
    let cached = compiler.compile_file(&main).expect("compiles from cache");
    assert_eq!(cached.css, first.css);

    // Keep the new modification time clear of the cached compile time.
    thread::sleep(Duration::from_millis(50));
    fs::write(&partial, "$w: 2px;").expect("write");
    let updated = compiler.compile_file(&main).expect("recompiles");
    assert_eq!(updated.css, ".a {\n  width: 2px; }\n");
}
