//! Built-in SassScript functions.
//!
//! Each built-in declares its parameter names and how many of them are
//! required. Calls bind positional arguments first and keyword arguments to
//! the remaining parameters by name. Functions taking arbitrary keyword
//! arguments (`adjust-color` and friends) receive the unmatched keywords
//! through [`Args::keywords`].

mod color;
mod list;
mod math;
mod meta;

use indexmap::IndexMap;
use thiserror::Error;

use sable_core::{
    ValueError,
    value::{Color, Number, SassString, Value},
};

/// Failure inside a built-in.
#[derive(Debug, Error)]
pub enum FnError {
    /// Bad argument; the caller appends the function name.
    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

pub type FnResult = Result<Value, FnError>;

/// A built-in function.
pub struct Builtin {
    pub name: &'static str,
    params: &'static [&'static str],
    required: usize,
    /// Accept keyword arguments that match no parameter.
    kwargs: bool,
    call: fn(&mut Args) -> FnResult,
}

impl Builtin {
    const fn new(
        name: &'static str,
        params: &'static [&'static str],
        required: usize,
        call: fn(&mut Args) -> FnResult,
    ) -> Self {
        Self {
            name,
            params,
            required,
            kwargs: false,
            call,
        }
    }

    const fn with_kwargs(mut self) -> Self {
        self.kwargs = true;
        self
    }

    /// Bind the arguments and run the function.
    ///
    /// # Errors
    ///
    /// Returns the message of an arity, keyword or argument type failure.
    pub fn invoke(
        &self,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, FnError> {
        let mut args = self.bind(positional, keywords)?;
        let result = (self.call)(&mut args)?;
        if let Some(name) = args.keywords.keys().next() {
            return Err(FnError::Argument(format!(
                "Function {} doesn't have an argument named ${name}",
                self.name
            )));
        }
        Ok(result)
    }

    fn bind(&self, positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Args, FnError> {
        if positional.len() > self.params.len() {
            return Err(self.arity_error(positional.len() + keywords.len()));
        }
        let passed = positional.len() + keywords.len();
        let mut values: Vec<Option<Value>> = positional.into_iter().map(Some).collect();
        values.resize(self.params.len(), None);
        let mut extra = IndexMap::new();
        for (name, value) in keywords {
            let name = name.replace('_', "-");
            match self.params.iter().position(|p| *p == name) {
                Some(index) if values[index].is_some() => {
                    return Err(FnError::Argument(format!(
                        "Function {} was passed argument ${name} both by position and by name",
                        self.name
                    )));
                }
                Some(index) => values[index] = Some(value),
                None if self.kwargs => {
                    extra.insert(name, value);
                }
                None => {
                    return Err(FnError::Argument(format!(
                        "Function {} doesn't have an argument named ${name}",
                        self.name
                    )));
                }
            }
        }
        if let Some(missing) = values[..self.required].iter().position(Option::is_none) {
            if keywords_only(&values, self.required) {
                return Err(FnError::Argument(format!(
                    "Function {} requires an argument named ${}",
                    self.name, self.params[missing]
                )));
            }
            return Err(self.arity_error(passed));
        }
        Ok(Args {
            values,
            params: self.params,
            keywords: extra,
        })
    }

    fn arity_error(&self, passed: usize) -> FnError {
        let expected = if self.required == self.params.len() {
            self.required.to_string()
        } else {
            format!("{}..{}", self.required, self.params.len())
        };
        FnError::Argument(format!("wrong number of arguments ({passed} for {expected})"))
    }
}

/// Whether some required slot is filled while an earlier one is empty, which
/// only keyword arguments can cause.
fn keywords_only(values: &[Option<Value>], required: usize) -> bool {
    let first_missing = values[..required].iter().position(Option::is_none);
    let last_filled = values.iter().rposition(Option::is_some);
    matches!((first_missing, last_filled), (Some(m), Some(f)) if f > m)
}

/// Bound arguments of one call.
pub struct Args {
    values: Vec<Option<Value>>,
    params: &'static [&'static str],
    keywords: IndexMap<String, Value>,
}

impl Args {
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Number of leading arguments that were passed.
    pub fn len(&self) -> usize {
        self.values.iter().take_while(|v| v.is_some()).count()
    }

    /// Remove and return an unmatched keyword argument.
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        self.keywords.shift_remove(name)
    }

    /// The first unmatched keyword argument not yet taken.
    pub fn first_keyword(&self) -> Option<(&str, &Value)> {
        self.keywords.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn value(&self, index: usize) -> Result<&Value, FnError> {
        self.get(index).ok_or_else(|| {
            FnError::Argument(format!(
                "Missing argument ${}",
                self.params.get(index).copied().unwrap_or("argument")
            ))
        })
    }

    pub fn color(&self, index: usize) -> Result<&Color, FnError> {
        match self.value(index)? {
            Value::Color(color) => Ok(color),
            other => Err(not_a(other, "color")),
        }
    }

    pub fn number(&self, index: usize) -> Result<&Number, FnError> {
        match self.value(index)? {
            Value::Number(number) => Ok(number),
            other => Err(not_a(other, "number")),
        }
    }

    pub fn string(&self, index: usize) -> Result<&SassString, FnError> {
        match self.value(index)? {
            Value::Str(string) => Ok(string),
            other => Err(not_a(other, "string")),
        }
    }

    /// The number at `index`, or `default` if it was not passed.
    pub fn number_or(&self, index: usize, default: Number) -> Result<Number, FnError> {
        match self.get(index) {
            None => Ok(default),
            Some(Value::Number(number)) => Ok(number.clone()),
            Some(other) => Err(not_a(other, "number")),
        }
    }
}

fn not_a(value: &Value, type_name: &str) -> FnError {
    FnError::Argument(format!("{} is not a {type_name}", value.inspect()))
}

/// Fail unless `value` lies in `range`, naming the bounds with `unit`.
fn check_range(
    what: &str,
    number: &Number,
    range: std::ops::RangeInclusive<f64>,
    unit: &str,
) -> Result<f64, FnError> {
    let value = number.value();
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(FnError::Argument(format!(
            "{what} {} must be between {}{unit} and {}{unit}",
            number.inspect(),
            sable_core::value::format_number(*range.start()),
            sable_core::value::format_number(*range.end()),
        )))
    }
}

static BUILTINS: &[Builtin] = &[
    // Colors
    Builtin::new("rgb", &["red", "green", "blue"], 3, color::rgb),
    Builtin::new("rgba", &["red", "green", "blue", "alpha"], 2, color::rgba),
    Builtin::new("hsl", &["hue", "saturation", "lightness"], 3, color::hsl),
    Builtin::new(
        "hsla",
        &["hue", "saturation", "lightness", "alpha"],
        4,
        color::hsla,
    ),
    Builtin::new("red", &["color"], 1, color::red),
    Builtin::new("green", &["color"], 1, color::green),
    Builtin::new("blue", &["color"], 1, color::blue),
    Builtin::new("hue", &["color"], 1, color::hue),
    Builtin::new("saturation", &["color"], 1, color::saturation),
    Builtin::new("lightness", &["color"], 1, color::lightness),
    Builtin::new("alpha", &["color"], 1, color::alpha),
    Builtin::new("opacity", &["color"], 1, color::alpha),
    Builtin::new("opacify", &["color", "amount"], 2, color::opacify),
    Builtin::new("fade-in", &["color", "amount"], 2, color::opacify),
    Builtin::new("transparentize", &["color", "amount"], 2, color::transparentize),
    Builtin::new("fade-out", &["color", "amount"], 2, color::transparentize),
    Builtin::new("lighten", &["color", "amount"], 2, color::lighten),
    Builtin::new("darken", &["color", "amount"], 2, color::darken),
    Builtin::new("saturate", &["color", "amount"], 2, color::saturate),
    Builtin::new("desaturate", &["color", "amount"], 2, color::desaturate),
    Builtin::new("adjust-hue", &["color", "degrees"], 2, color::adjust_hue),
    Builtin::new("adjust-color", &["color"], 1, color::adjust_color).with_kwargs(),
    Builtin::new("scale-color", &["color"], 1, color::scale_color).with_kwargs(),
    Builtin::new("change-color", &["color"], 1, color::change_color).with_kwargs(),
    Builtin::new("mix", &["color-1", "color-2", "weight"], 2, color::mix),
    Builtin::new("grayscale", &["color"], 1, color::grayscale),
    Builtin::new("complement", &["color"], 1, color::complement),
    Builtin::new("invert", &["color"], 1, color::invert),
    // Strings
    Builtin::new("unquote", &["string"], 1, meta::unquote),
    Builtin::new("quote", &["string"], 1, meta::quote),
    // Numbers
    Builtin::new("percentage", &["value"], 1, math::percentage),
    Builtin::new("round", &["value"], 1, math::round),
    Builtin::new("ceil", &["value"], 1, math::ceil),
    Builtin::new("floor", &["value"], 1, math::floor),
    Builtin::new("abs", &["value"], 1, math::abs),
    // Lists
    Builtin::new("length", &["list"], 1, list::length),
    Builtin::new("nth", &["list", "n"], 2, list::nth),
    Builtin::new("join", &["list1", "list2", "separator"], 2, list::join),
    Builtin::new("append", &["list", "val", "separator"], 2, list::append),
    // Introspection
    Builtin::new("type-of", &["value"], 1, meta::type_of),
    Builtin::new("unit", &["number"], 1, meta::unit),
    Builtin::new("unitless", &["number"], 1, meta::unitless),
    Builtin::new("comparable", &["number-1", "number-2"], 2, meta::comparable),
    Builtin::new("if", &["condition", "if-true", "if-false"], 3, meta::if_),
];

/// Find a built-in by name. `_` and `-` are interchangeable.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    let name = name.replace('_', "-");
    BUILTINS.iter().find(|b| b.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, positional: Vec<Value>) -> FnResult {
        lookup(name).expect("known function").invoke(positional, Vec::new())
    }

    fn px(value: f64) -> Value {
        Value::Number(Number::with_unit(value, "px"))
    }

    #[test]
    fn test_lookup_normalizes_name() {
        assert!(lookup("adjust_hue").is_some());
        assert!(lookup("no-such-function").is_none());
    }

    #[test]
    fn test_arity_error() {
        let err = call("rgb", vec![Value::number(1.0)]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of arguments (1 for 3)");
        let err = call("mix", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of arguments (0 for 2..3)");
    }

    #[test]
    fn test_keyword_binding() {
        let result = lookup("rgb")
            .expect("known")
            .invoke(
                vec![Value::number(255.0)],
                vec![
                    ("blue".to_string(), Value::number(0.0)),
                    ("green".to_string(), Value::number(0.0)),
                ],
            )
            .expect("binds");
        assert_eq!(result.inspect(), "red");
    }

    #[test]
    fn test_unknown_keyword() {
        let err = lookup("abs")
            .expect("known")
            .invoke(vec![px(1.0)], vec![("foo".to_string(), px(1.0))])
            .unwrap_err();
        assert_eq!(err.to_string(), "Function abs doesn't have an argument named $foo");
    }

    #[test]
    fn test_missing_keyword_argument() {
        let err = lookup("nth")
            .expect("known")
            .invoke(Vec::new(), vec![("n".to_string(), Value::number(1.0))])
            .unwrap_err();
        assert_eq!(err.to_string(), "Function nth requires an argument named $list");
    }

    #[test]
    fn test_type_error_message() {
        let err = call("lighten", vec![Value::quoted("x"), px(1.0)]).unwrap_err();
        assert_eq!(err.to_string(), "\"x\" is not a color");
    }
}
