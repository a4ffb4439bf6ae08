//! Command-line argument definitions for the Sable CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Flags given here override the values read from the
//! configuration file.

use clap::Parser;

use sable::{OutputStyle, Syntax};

/// Command-line arguments for the Sable stylesheet compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input stylesheet
    #[arg(help = "Path to the input file (.sass or .scss)")]
    pub input: String,

    /// Path to the output file; standard output when absent
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output style (nested, expanded, compact, compressed)
    #[arg(long)]
    pub style: Option<OutputStyle>,

    /// Syntax of an input whose extension is neither .sass nor .scss
    #[arg(long)]
    pub syntax: Option<Syntax>,

    /// Directory searched by `@import`; may be repeated
    #[arg(short = 'I', long = "load-path")]
    pub load_paths: Vec<String>,

    /// Emit `/* line N, file */` comments before each rule
    #[arg(long)]
    pub line_comments: bool,

    /// Neither read nor write the compile cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory holding the compile cache
    #[arg(long)]
    pub cache_location: Option<String>,

    /// Convert to stylesheet source in this syntax instead of CSS
    #[arg(long)]
    pub to: Option<Syntax>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "sable",
            "main.scss",
            "-o",
            "out.css",
            "--style",
            "compressed",
            "-I",
            "lib",
            "-I",
            "vendor",
            "--no-cache",
            "--to",
            "sass",
        ]);
        assert_eq!(args.input, "main.scss");
        assert_eq!(args.output.as_deref(), Some("out.css"));
        assert_eq!(args.style, Some(OutputStyle::Compressed));
        assert_eq!(args.load_paths, ["lib", "vendor"]);
        assert!(args.no_cache);
        assert!(!args.line_comments);
        assert_eq!(args.to, Some(Syntax::Indented));
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_rejects_unknown_style() {
        assert!(Args::try_parse_from(["sable", "a.scss", "--style", "pretty"]).is_err());
    }
}
