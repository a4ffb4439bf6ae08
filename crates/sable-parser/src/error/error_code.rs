//! Error codes for the Sable diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Nesting errors
//! - `E3xx` - Evaluation errors
//! - `E4xx` - `@extend` errors
//! - `E5xx` - Import and cache errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    E001,

    /// Unexpected character.
    ///
    /// No SassScript token starts with this character.
    E002,

    /// Unterminated interpolation.
    ///
    /// A `#{` was opened but the input ended before the matching `}`.
    E003,

    /// Unterminated comment.
    E004,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser expected one production and found something else.
    E100,

    /// Incomplete input.
    ///
    /// The input ended before a complete construct was parsed.
    E101,

    /// Inconsistent indentation in the indented syntax.
    E102,

    /// Tabs and spaces mixed in indentation.
    E103,

    /// Invalid selector.
    E104,

    /// Invalid property declaration.
    E105,

    /// `@else` without a preceding `@if`.
    E106,

    // =========================================================================
    // Nesting Errors (E2xx)
    // =========================================================================
    /// A node is not allowed inside its parent.
    E200,

    /// `@charset` is only allowed at the root of a document.
    E201,

    /// `@mixin` and `@function` definitions must be at the root or in
    /// plain rules, never inside control directives or mixins.
    E202,

    /// A property was declared outside of a rule.
    E203,

    /// `@return` outside of a function.
    E204,

    /// `@extend` outside of a rule or mixin.
    E205,

    /// `@import` in a position where imports are not allowed.
    E206,

    /// A function body contains something other than variables, control
    /// directives and `@return`.
    E207,

    /// Only properties may be nested beneath a property.
    E208,

    // =========================================================================
    // Evaluation Errors (E3xx)
    // =========================================================================
    /// Undefined variable.
    E300,

    /// Undefined mixin.
    E301,

    /// Bad arguments to a mixin or function.
    E302,

    /// Incompatible units.
    E303,

    /// `@include` loop.
    E304,

    /// Recursion or iteration limit exceeded.
    E305,

    /// Invalid operation or value.
    E306,

    /// A function finished without `@return`.
    E307,

    /// Invalid use of the parent selector `&`.
    E308,

    // =========================================================================
    // Extend Errors (E4xx)
    // =========================================================================
    /// The `@extend` target cannot be extended.
    E400,

    /// The `@extend` target was not found anywhere in the stylesheet.
    E401,

    // =========================================================================
    // Import and Cache Errors (E5xx)
    // =========================================================================
    /// Imported file not found.
    E500,

    /// Import loop.
    E501,

    /// Cache entry could not be read.
    E502,

    /// Imported file could not be read.
    E503,
}

/// The failure taxonomy each error code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    Nesting,
    Undefined,
    Argument,
    UnitConversion,
    IncludeLoop,
    Evaluation,
    Extend,
    Import,
}

impl ErrorCode {
    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",

            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",

            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",

            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
            ErrorCode::E305 => "E305",
            ErrorCode::E306 => "E306",
            ErrorCode::E307 => "E307",
            ErrorCode::E308 => "E308",

            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",

            ErrorCode::E500 => "E500",
            ErrorCode::E501 => "E501",
            ErrorCode::E502 => "E502",
            ErrorCode::E503 => "E503",
        }
    }

    /// A short description of the error class.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "unterminated interpolation",
            ErrorCode::E004 => "unterminated comment",

            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "inconsistent indentation",
            ErrorCode::E103 => "mixed tabs and spaces",
            ErrorCode::E104 => "invalid selector",
            ErrorCode::E105 => "invalid property declaration",
            ErrorCode::E106 => "misplaced @else",

            ErrorCode::E200 => "illegal nesting",
            ErrorCode::E201 => "misplaced @charset",
            ErrorCode::E202 => "misplaced definition",
            ErrorCode::E203 => "property outside of a rule",
            ErrorCode::E204 => "@return outside of a function",
            ErrorCode::E205 => "@extend outside of a rule",
            ErrorCode::E206 => "misplaced @import",
            ErrorCode::E207 => "invalid function body",
            ErrorCode::E208 => "non-property nested in a property",

            ErrorCode::E300 => "undefined variable",
            ErrorCode::E301 => "undefined mixin",
            ErrorCode::E302 => "invalid arguments",
            ErrorCode::E303 => "incompatible units",
            ErrorCode::E304 => "@include loop",
            ErrorCode::E305 => "limit exceeded",
            ErrorCode::E306 => "invalid operation",
            ErrorCode::E307 => "missing @return",
            ErrorCode::E308 => "invalid parent selector",

            ErrorCode::E400 => "invalid @extend target",
            ErrorCode::E401 => "@extend target not found",

            ErrorCode::E500 => "file to import not found",
            ErrorCode::E501 => "import loop",
            ErrorCode::E502 => "unreadable cache entry",
            ErrorCode::E503 => "unreadable import",
        }
    }

    /// The failure class this code reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::E001 | ErrorCode::E002 | ErrorCode::E003 | ErrorCode::E004 => {
                ErrorKind::Lex
            }
            ErrorCode::E100
            | ErrorCode::E101
            | ErrorCode::E102
            | ErrorCode::E103
            | ErrorCode::E104
            | ErrorCode::E105
            | ErrorCode::E106 => ErrorKind::Parse,
            ErrorCode::E200
            | ErrorCode::E201
            | ErrorCode::E202
            | ErrorCode::E203
            | ErrorCode::E204
            | ErrorCode::E205
            | ErrorCode::E206
            | ErrorCode::E207
            | ErrorCode::E208 => ErrorKind::Nesting,
            ErrorCode::E300 | ErrorCode::E301 => ErrorKind::Undefined,
            ErrorCode::E302 => ErrorKind::Argument,
            ErrorCode::E303 => ErrorKind::UnitConversion,
            ErrorCode::E304 => ErrorKind::IncludeLoop,
            ErrorCode::E305 | ErrorCode::E306 | ErrorCode::E307 | ErrorCode::E308 => {
                ErrorKind::Evaluation
            }
            ErrorCode::E400 | ErrorCode::E401 => ErrorKind::Extend,
            ErrorCode::E500 | ErrorCode::E501 | ErrorCode::E502 | ErrorCode::E503 => {
                ErrorKind::Import
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E304.to_string(), "E304");
        assert_eq!(ErrorCode::E503.to_string(), "E503");
    }

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::E002.kind(), ErrorKind::Lex);
        assert_eq!(ErrorCode::E102.kind(), ErrorKind::Parse);
        assert_eq!(ErrorCode::E204.kind(), ErrorKind::Nesting);
        assert_eq!(ErrorCode::E300.kind(), ErrorKind::Undefined);
        assert_eq!(ErrorCode::E301.kind(), ErrorKind::Undefined);
        assert_eq!(ErrorCode::E302.kind(), ErrorKind::Argument);
        assert_eq!(ErrorCode::E303.kind(), ErrorKind::UnitConversion);
        assert_eq!(ErrorCode::E304.kind(), ErrorKind::IncludeLoop);
        assert_eq!(ErrorCode::E400.kind(), ErrorKind::Extend);
        assert_eq!(ErrorCode::E501.kind(), ErrorKind::Import);
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E001.description(), "unterminated string literal");
        assert_eq!(ErrorCode::E304.description(), "@include loop");
    }
}
