//! Quoted and unquoted strings.

use std::fmt;

/// Whether a string is written with quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    Quoted,
    Unquoted,
}

/// A SassScript string.
///
/// The text is stored without the surrounding quotes. Backslash escapes are
/// kept verbatim so they reach the CSS output untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SassString {
    text: String,
    quotes: QuoteKind,
}

impl SassString {
    pub fn new(text: impl Into<String>, quotes: QuoteKind) -> Self {
        Self {
            text: text.into(),
            quotes,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(text, QuoteKind::Quoted)
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Self::new(text, QuoteKind::Unquoted)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn quotes(&self) -> QuoteKind {
        self.quotes
    }

    pub fn is_quoted(&self) -> bool {
        self.quotes == QuoteKind::Quoted
    }

    /// Text written to CSS.
    pub fn to_css(&self) -> String {
        match self.quotes {
            QuoteKind::Quoted => quote(&self.text),
            QuoteKind::Unquoted => self.text.replace('\n', " "),
        }
    }
}

impl fmt::Display for SassString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Wrap `text` in quotes, preferring double quotes.
pub fn quote(text: &str) -> String {
    let has_double = has_unescaped(text, '"');
    let has_single = has_unescaped(text, '\'');
    if has_double && !has_single {
        return format!("'{text}'");
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    let mut escaped = false;
    for c in text.chars() {
        if c == '"' && !escaped {
            quoted.push('\\');
        }
        escaped = c == '\\' && !escaped;
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn has_unescaped(text: &str, needle: char) -> bool {
    let mut escaped = false;
    for c in text.chars() {
        if c == needle && !escaped {
            return true;
        }
        escaped = c == '\\' && !escaped;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_prefers_double_quotes() {
        assert_eq!(quote("foo"), "\"foo\"");
        assert_eq!(quote("it's"), "\"it's\"");
    }

    #[test]
    fn test_quote_switches_for_embedded_double_quotes() {
        assert_eq!(quote("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote("a\\\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_unquoted_output_flattens_newlines() {
        assert_eq!(SassString::unquoted("a\nb").to_css(), "a b");
    }
}
