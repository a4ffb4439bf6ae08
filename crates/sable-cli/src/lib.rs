//! CLI logic for the Sable stylesheet compiler.
//!
//! The CLI loads the configuration, layers the command-line flags on top and
//! calls the library's compile entry points. Nothing in here changes how a
//! stylesheet is compiled.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use log::{debug, info};

use sable::{
    Compiler, SableError, Syntax, cache::FilesystemStore, config::Options,
    importer::FilesystemImporter,
};

/// Run the Sable CLI application
///
/// Compiles the input file to CSS, or converts it to source in another
/// syntax when `--to` is given, and writes the result to the output file or
/// standard output.
///
/// # Errors
///
/// Returns `SableError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Syntax and evaluation errors in the stylesheet
pub fn run(args: &Args) -> Result<(), SableError> {
    info!(
        input_path = args.input,
        output_path:? = args.output;
        "Processing stylesheet"
    );

    let config = config::load_config(args.config.as_ref())?.apply_args(args);
    let options = config.options().clone();
    debug!(options:? = options; "Resolved options");

    let output = match args.to {
        Some(syntax) => convert(&args.input, options, syntax)?,
        None => {
            let mut compiler = Compiler::new(options.clone());
            if options.cache() {
                compiler = compiler.with_cache_store(FilesystemStore::new(config.cache_location()));
            }
            let compiled = compiler.compile_file(&args.input)?;
            debug!(
                dependencies = compiled.dependencies.len(),
                warnings = compiled.warnings.len();
                "Compiled stylesheet"
            );
            compiled.css
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, output)?;
            info!(output_file = path; "Output written");
        }
        None => io::stdout().write_all(output.as_bytes())?,
    }
    Ok(())
}

/// Compile `input` to its flattened tree and render it back as source.
fn convert(input: &str, options: Options, to: Syntax) -> Result<String, SableError> {
    let path = Path::new(input);
    let source = fs::read_to_string(path)?;
    let syntax = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Syntax::from_extension)
        .unwrap_or(options.syntax());
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let options = options.with_syntax(syntax).with_filename(input);
    let compiler = Compiler::new(options).with_importer(FilesystemImporter::new(dir));
    let stylesheet = compiler.compile_to_stylesheet(&source)?;
    info!(to:% = to; "Converting stylesheet");
    Ok(stylesheet.to_source(to))
}
