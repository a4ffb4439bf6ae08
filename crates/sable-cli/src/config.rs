//! Configuration file loading for the CLI
//!
//! This module finds and loads the TOML configuration file from an explicit
//! path, the local project directory or the platform configuration
//! directory, then layers the command-line flags on top.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use sable::{SableError, config::Options};

use crate::Args;

const DEFAULT_CACHE_LOCATION: &str = ".sable-cache";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for SableError {
    fn from(err: ConfigError) -> Self {
        SableError::Io(io::Error::other(err.to_string()))
    }
}

/// Settings read from a configuration file.
///
/// Compile options sit at the top level, next to the CLI-only
/// `cache-location`:
///
/// ```toml
/// style = "compressed"
/// load-paths = ["vendor"]
/// cache-location = "tmp/sable-cache"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    #[serde(flatten)]
    options: Options,
    cache_location: Option<PathBuf>,
}

impl CliConfig {
    /// Override the file values with the flags given on the command line.
    pub fn apply_args(mut self, args: &Args) -> Self {
        let mut options = self.options;
        if let Some(style) = args.style {
            options = options.with_style(style);
        }
        if let Some(syntax) = args.syntax {
            options = options.with_syntax(syntax);
        }
        options = options.with_load_paths(args.load_paths.iter().map(PathBuf::from));
        if args.line_comments {
            options = options.with_line_comments(true);
        }
        if args.no_cache {
            options = options.with_cache(false);
        }
        self.options = options;
        if let Some(location) = &args.cache_location {
            self.cache_location = Some(PathBuf::from(location));
        }
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Directory for the compile cache.
    pub fn cache_location(&self) -> &Path {
        self.cache_location
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_CACHE_LOCATION))
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (sable/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<CliConfig, SableError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("sable/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "sable", "sable") {
        let system_config = proj_dirs.config_dir().join("config.toml");
        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }
        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(CliConfig::default())
}

fn load_config_file(path: impl AsRef<Path>) -> Result<CliConfig, SableError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }
    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use sable::{OutputStyle, Syntax};

    use super::*;

    #[test]
    fn test_parse_config_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "style = \"compact\"\nsyntax = \"scss\"\nload-paths = [\"vendor\"]\ncache-location = \"cache\"\n",
        )
        .expect("write config");

        let config = load_config(Some(&path)).expect("config loads");
        assert_eq!(config.options().style(), OutputStyle::Compact);
        assert_eq!(config.options().syntax(), Syntax::Scss);
        assert_eq!(config.options().load_paths(), [PathBuf::from("vendor")]);
        assert_eq!(config.cache_location(), Path::new("cache"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = load_config(Some("/nonexistent/sable.toml")).expect_err("missing file");
        assert!(err.to_string().contains("Missing configuration file"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "style = [").expect("write config");
        let err = load_config(Some(&path)).expect_err("invalid toml");
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_flags_override_file() {
        let config: CliConfig =
            toml::from_str("style = \"compact\"\nload-paths = [\"vendor\"]").expect("valid toml");
        let args = Args::parse_from([
            "sable",
            "a.scss",
            "--style",
            "expanded",
            "-I",
            "lib",
            "--no-cache",
            "--line-comments",
        ]);
        let config = config.apply_args(&args);
        let options = config.options();
        assert_eq!(options.style(), OutputStyle::Expanded);
        assert_eq!(
            options.load_paths(),
            [PathBuf::from("vendor"), PathBuf::from("lib")]
        );
        assert!(!options.cache());
        assert!(options.line_comments());
        assert_eq!(config.cache_location(), Path::new(DEFAULT_CACHE_LOCATION));
    }
}
