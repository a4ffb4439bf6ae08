//! SassScript values and their operators.
//!
//! Every expression evaluates to a [`Value`]. Binary operators dispatch on the
//! pair of operand variants: numbers combine arithmetically with unit
//! conversion, colors combine channel by channel, and everything else falls
//! back to building an unquoted string out of both operands (for `+`, `-`,
//! `/`) or fails with [`ValueError::UndefinedOperation`].

mod color;
mod number;
mod string;
pub mod units;

use std::{cmp::Ordering, fmt};

pub use color::{Color, ColorOperand};
pub use number::{Number, PRECISION, format_number, round_to_precision};
pub use string::{QuoteKind, SassString, quote};

use crate::{error::ValueError, style::OutputStyle};

/// How list items are separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListSeparator {
    Space,
    Comma,
}

impl ListSeparator {
    /// Name used by `join`/`append` and `@debug`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Comma => "comma",
        }
    }
}

/// A SassScript list.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    items: Vec<Value>,
    separator: ListSeparator,
}

impl List {
    pub fn new(items: Vec<Value>, separator: ListSeparator) -> Self {
        Self { items, separator }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), ListSeparator::Space)
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn separator(&self) -> ListSeparator {
        self.separator
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn join_with<F>(&self, style: OutputStyle, render: F) -> Result<String, ValueError>
    where
        F: Fn(&Value) -> Result<String, ValueError>,
    {
        let separator = match self.separator {
            ListSeparator::Space => " ",
            ListSeparator::Comma => style.comma_separator(),
        };
        let parts = self
            .items
            .iter()
            .filter(|item| !matches!(item, Value::List(list) if list.is_empty()))
            .map(render)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(separator))
    }
}

/// A SassScript value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Color(Color),
    Str(SassString),
    Bool(bool),
    List(List),
}

impl Value {
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::Str(SassString::quoted(text))
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Self::Str(SassString::unquoted(text))
    }

    pub fn number(value: f64) -> Self {
        Self::Number(Number::unitless(value))
    }

    /// Name reported by `type-of`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Color(_) => "color",
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
        }
    }

    /// Everything except `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Bool(false))
    }

    /// The items of a list, or the value itself as a one-item list.
    pub fn to_items(&self) -> Vec<Value> {
        match self {
            Self::List(list) => list.items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Separator of a non-empty list.
    pub fn separator(&self) -> Option<ListSeparator> {
        match self {
            Self::List(list) if !list.is_empty() => Some(list.separator),
            _ => None,
        }
    }

    /// The same value with any literal number text removed.
    pub fn without_original(self) -> Self {
        match self {
            Self::Number(number) => Self::Number(number.without_original()),
            other => other,
        }
    }

    /// Text written to CSS.
    ///
    /// # Errors
    ///
    /// Fails for numbers with compound units and for empty lists.
    pub fn to_css(&self, style: OutputStyle) -> Result<String, ValueError> {
        match self {
            Self::Number(number) => number.to_css(),
            Self::Color(color) => Ok(color.to_css(style)),
            Self::Str(string) => Ok(string.to_css()),
            Self::Bool(value) => Ok(value.to_string()),
            Self::List(list) if list.is_empty() => Err(ValueError::InvalidCss("()".to_string())),
            Self::List(list) => list.join_with(style, |item| item.to_css(style)),
        }
    }

    /// Text substituted by `#{}`: strings lose their quotes.
    pub fn interpolated(&self, style: OutputStyle) -> Result<String, ValueError> {
        match self {
            Self::Str(string) => Ok(string.text().to_string()),
            other => other.to_css(style),
        }
    }

    /// Text for `@debug` and diagnostics; never fails.
    pub fn inspect(&self) -> String {
        match self {
            Self::Number(number) => number
                .original()
                .map_or_else(|| number.inspect(), str::to_string),
            Self::Color(color) => color.to_css(OutputStyle::Nested),
            Self::Str(string) => string.to_css(),
            Self::Bool(value) => value.to_string(),
            Self::List(list) if list.is_empty() => "()".to_string(),
            Self::List(list) => list
                .join_with(OutputStyle::Nested, |item| Ok(item.inspect()))
                .unwrap_or_default(),
        }
    }

    fn concat_text(&self) -> Result<String, ValueError> {
        self.to_css(OutputStyle::Nested)
    }

    pub fn plus(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.plus(b)?)),
            (Self::Number(n), Self::Color(c)) | (Self::Color(c), Self::Number(n)) => {
                Ok(Self::Color(c.plus(&ColorOperand::Number(n))?))
            }
            (Self::Color(a), Self::Color(b)) => Ok(Self::Color(a.plus(&ColorOperand::Color(b))?)),
            (Self::Str(s), _) => {
                let right = match other {
                    Self::Str(o) => o.text().to_string(),
                    o => o.concat_text()?,
                };
                Ok(Self::Str(SassString::new(
                    format!("{}{}", s.text(), right),
                    s.quotes(),
                )))
            }
            (_, Self::Str(o)) => Ok(Self::Str(SassString::new(
                format!("{}{}", self.concat_text()?, o.text()),
                o.quotes(),
            ))),
            _ => Ok(Self::unquoted(format!(
                "{}{}",
                self.concat_text()?,
                other.concat_text()?
            ))),
        }
    }

    pub fn minus(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.minus(b)?)),
            (Self::Color(c), Self::Number(n)) => {
                Ok(Self::Color(c.minus(&ColorOperand::Number(n))?))
            }
            (Self::Color(a), Self::Color(b)) => {
                Ok(Self::Color(a.minus(&ColorOperand::Color(b))?))
            }
            _ => Ok(Self::unquoted(format!(
                "{}-{}",
                self.concat_text()?,
                other.concat_text()?
            ))),
        }
    }

    pub fn times(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.times(b)?)),
            (Self::Number(n), Self::Color(c)) | (Self::Color(c), Self::Number(n)) => {
                Ok(Self::Color(c.times(&ColorOperand::Number(n))?))
            }
            (Self::Color(a), Self::Color(b)) => {
                Ok(Self::Color(a.times(&ColorOperand::Color(b))?))
            }
            _ => Err(self.undefined("*", other)),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.div(b)?)),
            (Self::Color(c), Self::Number(n)) => Ok(Self::Color(c.div(&ColorOperand::Number(n))?)),
            (Self::Color(a), Self::Color(b)) => Ok(Self::Color(a.div(&ColorOperand::Color(b))?)),
            _ => Ok(Self::unquoted(format!(
                "{}/{}",
                self.concat_text()?,
                other.concat_text()?
            ))),
        }
    }

    pub fn modulo(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.modulo(b)?)),
            (Self::Color(c), Self::Number(n)) => {
                Ok(Self::Color(c.modulo(&ColorOperand::Number(n))?))
            }
            (Self::Color(a), Self::Color(b)) => {
                Ok(Self::Color(a.modulo(&ColorOperand::Color(b))?))
            }
            _ => Err(self.undefined("%", other)),
        }
    }

    /// `a=b`, used by legacy IE filters.
    pub fn single_eq(&self, other: &Value) -> Result<Value, ValueError> {
        Ok(Self::unquoted(format!(
            "{}={}",
            self.concat_text()?,
            other.concat_text()?
        )))
    }

    /// SassScript `==`.
    pub fn sass_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.sass_eq(b),
            (Self::Color(a), Self::Color(b)) => a.sass_eq(b),
            (Self::Str(a), Self::Str(b)) => a.text() == b.text(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.separator == b.separator
                    && a.items.len() == b.items.len()
                    && a.items.iter().zip(&b.items).all(|(x, y)| x.sass_eq(y))
            }
            _ => false,
        }
    }

    pub fn lt(&self, other: &Value) -> Result<Value, ValueError> {
        self.compare(other, "<", Ordering::is_lt)
    }

    pub fn lte(&self, other: &Value) -> Result<Value, ValueError> {
        self.compare(other, "<=", Ordering::is_le)
    }

    pub fn gt(&self, other: &Value) -> Result<Value, ValueError> {
        self.compare(other, ">", Ordering::is_gt)
    }

    pub fn gte(&self, other: &Value) -> Result<Value, ValueError> {
        self.compare(other, ">=", Ordering::is_ge)
    }

    pub fn unary_minus(&self) -> Result<Value, ValueError> {
        match self {
            Self::Number(number) => Ok(Self::Number(number.negate())),
            other => Ok(Self::unquoted(format!("-{}", other.concat_text()?))),
        }
    }

    pub fn unary_plus(&self) -> Result<Value, ValueError> {
        match self {
            Self::Number(number) => Ok(Self::Number(number.clone().without_original())),
            other => Ok(Self::unquoted(format!("+{}", other.concat_text()?))),
        }
    }

    pub fn unary_div(&self) -> Result<Value, ValueError> {
        Ok(Self::unquoted(format!("/{}", self.concat_text()?)))
    }

    pub fn not(&self) -> Value {
        Self::Bool(!self.is_truthy())
    }

    fn compare(
        &self,
        other: &Value,
        op: &'static str,
        test: fn(Ordering) -> bool,
    ) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Bool(test(a.compare(b)?))),
            _ => Err(self.undefined(op, other)),
        }
    }

    fn undefined(&self, op: &'static str, other: &Value) -> ValueError {
        ValueError::UndefinedOperation {
            left: self.inspect(),
            op,
            right: other.inspect(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}
