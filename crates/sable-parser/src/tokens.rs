//! SassScript tokens.

use std::fmt;

use sable_core::value::{Color, Number, QuoteKind};

use crate::span::Span;

/// Operators and punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    SingleEq,
    Colon,
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    Eq,
    Neq,
    Gte,
    Lte,
    Gt,
    Lt,
    Semicolon,
    LBrace,
    /// A `}` that does not close an interpolation.
    RBrace,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Times => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::SingleEq => "=",
            Op::Colon => ":",
            Op::LParen => "(",
            Op::RParen => ")",
            Op::Comma => ",",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Eq => "==",
            Op::Neq => "!=",
            Op::Gte => ">=",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Semicolon => ";",
            Op::LBrace => "{",
            Op::RBrace => "}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `$name`, without the `$`.
    Variable(String),
    Ident(String),
    /// An identifier directly followed by `(`. The parenthesis is consumed.
    Function(String),
    Number(Number),
    Color(Color),
    Bool(bool),
    /// A complete string. Unquoted strings come from raw special functions
    /// such as `url(foo.png)` and from unicode ranges.
    Str { text: String, quotes: QuoteKind },
    /// The text of a string up to its first `#{`, which is consumed.
    StrStart { text: String, quotes: QuoteKind },
    /// Text between an interpolation's `}` and the next `#{`.
    StrMid(String),
    /// Text after the last interpolation, up to the end of the string.
    StrEnd(String),
    /// `!name`, such as `!important` or `!default`. Stored lowercased.
    Flag(String),
    Op(Op),
    /// `#{` in plain SassScript.
    BeginInterpolation,
    /// The `}` closing a `#{`.
    EndInterpolation,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Variable(name) => write!(f, "${name}"),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Function(name) => write!(f, "{name}("),
            TokenKind::Number(number) => write!(f, "{number}"),
            TokenKind::Color(color) => write!(f, "{color}"),
            TokenKind::Bool(value) => write!(f, "{value}"),
            TokenKind::Str { text, .. } | TokenKind::StrStart { text, .. } => f.write_str(text),
            TokenKind::StrMid(text) | TokenKind::StrEnd(text) => f.write_str(text),
            TokenKind::Flag(name) => write!(f, "!{name}"),
            TokenKind::Op(op) => f.write_str(op.as_str()),
            TokenKind::BeginInterpolation => f.write_str("#{"),
            TokenKind::EndInterpolation => f.write_str("}"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with position information.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
    /// Whether whitespace directly precedes the token.
    pub whitespace_before: bool,
}

impl Token {
    pub fn is_op(&self, op: Op) -> bool {
        self.kind == TokenKind::Op(op)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}
