//! SassScript expression nodes.

use std::fmt;

use sable_core::value::{ListSeparator, QuoteKind, Value};

use crate::span::Span;

/// Binary operators, from loosest to tightest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `=`, only meaningful in legacy function arguments like `alpha(opacity=20)`.
    SingleEq,
    Or,
    And,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Plus,
    Minus,
    Times,
    Div,
    Mod,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::SingleEq => 0,
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Neq => 3,
            BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => 4,
            BinaryOp::Plus | BinaryOp::Minus => 5,
            BinaryOp::Times | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::SingleEq => "=",
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Div,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Div => "/",
            UnaryOp::Not => "not ",
        }
    }
}

/// A piece of text that may contain `#{}` interpolation.
#[derive(Debug, Clone)]
pub enum InterpPart {
    Text(String),
    Expr(Expr),
}

/// Text with embedded `#{}` expressions, used for selectors, property
/// names, directive parameters and comments.
#[derive(Debug, Clone, Default)]
pub struct Interpolation {
    parts: Vec<InterpPart>,
}

impl Interpolation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let mut interp = Self::new();
        interp.push_text(text);
        interp
    }

    pub fn parts(&self) -> &[InterpPart] {
        &self.parts
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(InterpPart::Text(last)) => last.push_str(&text),
            _ => self.parts.push(InterpPart::Text(text)),
        }
    }

    pub fn push_expr(&mut self, expr: Expr) {
        self.parts.push(InterpPart::Expr(expr));
    }

    /// Append every part of `other`.
    pub fn extend(&mut self, other: Interpolation) {
        for part in other.parts {
            match part {
                InterpPart::Text(text) => self.push_text(text),
                InterpPart::Expr(expr) => self.push_expr(expr),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn has_interpolation(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, InterpPart::Expr(_)))
    }

    /// The text, if there is no interpolation.
    pub fn as_plain(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [InterpPart::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// Strip leading and trailing whitespace from the outer text parts.
    pub fn trimmed(mut self) -> Self {
        if let Some(InterpPart::Text(first)) = self.parts.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(InterpPart::Text(last)) = self.parts.last_mut() {
            *last = last.trim_end().to_string();
        }
        self.parts
            .retain(|p| !matches!(p, InterpPart::Text(text) if text.is_empty()));
        self
    }
}

/// Positional and keyword arguments of a call or `@include`.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Expr>,
    /// Keyword arguments in source order, names without `$`.
    pub keywords: Vec<(String, Expr)>,
}

impl CallArgs {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// A formal parameter of a mixin or function.
#[derive(Debug, Clone)]
pub struct Param {
    /// Name without `$`.
    pub name: String,
    pub default: Option<Expr>,
}

/// A SassScript expression.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A value known at parse time: numbers, colors, booleans and plain
    /// strings or identifiers.
    Literal(Value),
    /// `$name`, stored without the `$`.
    Variable(String),
    /// A string with interpolation. Unquoted strings of this kind come from
    /// `url(...)` and the other raw special functions.
    Str {
        quotes: QuoteKind,
        parts: Vec<InterpPart>,
    },
    /// `before #{mid} after` outside a string. Evaluates to an unquoted
    /// string; the flags record whether whitespace separated the parts.
    Interpolation {
        before: Option<Box<Expr>>,
        mid: Box<Expr>,
        after: Option<Box<Expr>>,
        ws_before: bool,
        ws_after: bool,
    },
    List {
        items: Vec<Expr>,
        separator: ListSeparator,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: CallArgs,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize, span: Span) -> Self {
        Self { kind, line, span }
    }

    pub fn literal(value: Value, line: usize, span: Span) -> Self {
        Self::new(ExprKind::Literal(value), line, span)
    }

    /// The literal value, if this expression is one.
    pub fn as_literal(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this is the empty `()` list.
    pub fn is_empty_list(&self) -> bool {
        matches!(&self.kind, ExprKind::List { items, .. } if items.is_empty())
    }
}

impl fmt::Display for Expr {
    /// Renders the expression back to SassScript source.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{}", value.inspect()),
            ExprKind::Variable(name) => write!(f, "${name}"),
            ExprKind::Str { quotes, parts } => {
                let quote = match quotes {
                    QuoteKind::Quoted => "\"",
                    QuoteKind::Unquoted => "",
                };
                f.write_str(quote)?;
                for part in parts {
                    match part {
                        InterpPart::Text(text) => f.write_str(text)?,
                        InterpPart::Expr(expr) => write!(f, "#{{{expr}}}")?,
                    }
                }
                f.write_str(quote)
            }
            ExprKind::Interpolation {
                before,
                mid,
                after,
                ws_before,
                ws_after,
            } => {
                if let Some(before) = before {
                    write!(f, "{before}")?;
                    if *ws_before {
                        f.write_str(" ")?;
                    }
                }
                write!(f, "#{{{mid}}}")?;
                if let Some(after) = after {
                    if *ws_after {
                        f.write_str(" ")?;
                    }
                    write!(f, "{after}")?;
                }
                Ok(())
            }
            ExprKind::List { items, separator } => {
                if items.is_empty() {
                    return f.write_str("()");
                }
                let sep = match separator {
                    ListSeparator::Space => " ",
                    ListSeparator::Comma => ", ",
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            ExprKind::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            ExprKind::Unary { op, operand } => write!(f, "{}{operand}", op.as_str()),
            ExprKind::Call { name, args } => {
                write!(f, "{name}(")?;
                let mut first = true;
                for arg in &args.positional {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{arg}")?;
                }
                for (name, arg) in &args.keywords {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "${name}: {arg}")?;
                }
                f.write_str(")")
            }
            ExprKind::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
