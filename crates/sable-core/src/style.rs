//! Output styles and source syntaxes.

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// The concrete syntax a stylesheet is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// Whitespace-sensitive syntax without braces or semicolons.
    #[default]
    #[serde(alias = "sass")]
    Indented,
    /// Brace-delimited CSS superset.
    Scss,
}

impl Syntax {
    /// Guess the syntax from a file extension (`sass` or `scss`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "sass" => Some(Self::Indented),
            "scss" => Some(Self::Scss),
            _ => None,
        }
    }

    /// The conventional file extension for this syntax.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Indented => "sass",
            Self::Scss => "scss",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Indented => "indented",
            Self::Scss => "scss",
        })
    }
}

impl FromStr for Syntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "indented" | "sass" => Ok(Self::Indented),
            "scss" => Ok(Self::Scss),
            _ => Err(format!("unknown syntax `{s}`")),
        }
    }
}

/// How the rendered CSS is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Indentation mirrors the nesting of the source.
    #[default]
    Nested,
    /// One declaration per line, braces on their own lines.
    Expanded,
    /// One rule per line.
    Compact,
    /// No whitespace beyond what is required.
    Compressed,
}

impl OutputStyle {
    pub fn is_compressed(self) -> bool {
        self == Self::Compressed
    }

    /// Separator placed between items of a comma-separated list.
    pub fn comma_separator(self) -> &'static str {
        if self.is_compressed() { "," } else { ", " }
    }
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nested => "nested",
            Self::Expanded => "expanded",
            Self::Compact => "compact",
            Self::Compressed => "compressed",
        })
    }
}

impl FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(Self::Nested),
            "expanded" => Ok(Self::Expanded),
            "compact" => Ok(Self::Compact),
            "compressed" => Ok(Self::Compressed),
            _ => Err(format!("unknown output style `{s}`")),
        }
    }
}
