use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

use sable::{SableError, Syntax};
use sable_cli::{Args, error_adapter::to_reportables, run};

fn fixtures(kind: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(kind)
}

/// Collects the stylesheets of a fixture directory, skipping partials.
fn collect_stylesheets(dir: PathBuf) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    let ext = path.extension().and_then(|s| s.to_str());
                    let partial = path
                        .file_name()
                        .and_then(|s| s.to_str())
                        .is_some_and(|name| name.starts_with('_'));
                    path.is_file() && !partial && matches!(ext, Some("sass" | "scss"))
                })
                .collect()
        })
        .unwrap_or_default();

    files.sort();
    files
}

fn args_for(input: &Path, output: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        output: Some(output.to_string_lossy().to_string()),
        style: None,
        syntax: None,
        load_paths: Vec::new(),
        line_comments: false,
        no_cache: true,
        cache_location: None,
        to: None,
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_fixtures() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let valid = collect_stylesheets(fixtures("valid"));
    assert!(!valid.is_empty(), "No valid fixtures found");

    let mut failed = Vec::new();
    for path in &valid {
        let output_path = temp_dir.path().join(format!(
            "{}.css",
            path.file_stem().expect("fixture has a name").to_string_lossy()
        ));
        match run(&args_for(path, &output_path)) {
            Ok(()) => {
                let css = fs::read_to_string(&output_path).expect("output written");
                assert!(!css.trim().is_empty(), "{} produced no CSS", path.display());
            }
            Err(err) => failed.push((path.clone(), err)),
        }
    }

    if !failed.is_empty() {
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} valid fixture(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_smoke_test_invalid_fixtures() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let invalid = collect_stylesheets(fixtures("invalid"));
    assert!(!invalid.is_empty(), "No invalid fixtures found");

    for path in &invalid {
        let output_path = temp_dir.path().join("out.css");
        let err = run(&args_for(path, &output_path))
            .expect_err(&format!("{} should fail", path.display()));
        assert!(
            matches!(err, SableError::Compile { .. }),
            "{}: expected a compile error, got {err}",
            path.display()
        );
        assert!(!to_reportables(&err).is_empty());
        assert!(!output_path.exists(), "no output for a failed compile");
    }
}

#[test]
fn e2e_import_and_style() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures("valid").join("with_import.scss");
    let output_path = temp_dir.path().join("out.css");

    let mut args = args_for(&input, &output_path);
    args.style = Some(sable::OutputStyle::Compressed);
    run(&args).expect("compiles");

    let css = fs::read_to_string(&output_path).expect("output written");
    assert_eq!(css, ".alert{color:red;background:#aaa}\n");
}

#[test]
fn e2e_convert_to_sass() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures("valid").join("nested.sass");
    let output_path = temp_dir.path().join("out.sass");

    let mut args = args_for(&input, &output_path);
    args.to = Some(Syntax::Indented);
    run(&args).expect("converts");

    let converted = fs::read_to_string(&output_path).expect("output written");
    assert!(!converted.contains('{'));
    assert!(converted.contains(".nav a:hover\n  color: blue\n"));
}

#[test]
fn e2e_cache_location() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let cache_dir = temp_dir.path().join("cache");
    let input = fixtures("valid").join("basic.scss");
    let output_path = temp_dir.path().join("out.css");

    let mut args = args_for(&input, &output_path);
    args.no_cache = false;
    args.cache_location = Some(cache_dir.to_string_lossy().to_string());
    run(&args).expect("compiles");
    let first = fs::read_to_string(&output_path).expect("output written");
    assert!(cache_dir.exists(), "cache directory created");

    run(&args).expect("compiles from cache");
    let second = fs::read_to_string(&output_path).expect("output written");
    assert_eq!(first, second);
}
