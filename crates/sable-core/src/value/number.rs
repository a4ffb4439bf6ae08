//! Numbers with units.

use std::fmt;

use crate::error::ValueError;

use super::units;

/// Multiplier used when rounding numbers for output.
pub const PRECISION: f64 = 1000.0;

/// Tolerance used when comparing numbers for equality.
const EPSILON: f64 = 1e-10;

/// A SassScript number.
///
/// Numbers carry numerator and denominator unit lists. Units that appear on
/// both sides are cancelled on construction, converting between units of the
/// same group where needed. `original` keeps the source text of a number that
/// came straight from a literal so that `12px/1.5` can be written back as-is.
#[derive(Debug, Clone)]
pub struct Number {
    value: f64,
    numerator_units: Vec<String>,
    denominator_units: Vec<String>,
    original: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Number {
    /// Create a number and cancel units shared by both unit lists.
    pub fn new(value: f64, numerator_units: Vec<String>, denominator_units: Vec<String>) -> Self {
        let mut number = Self {
            value,
            numerator_units,
            denominator_units,
            original: None,
        };
        number.normalize();
        number
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, Vec::new(), Vec::new())
    }

    /// A number with a single numerator unit (`%` included).
    pub fn with_unit(value: f64, unit: &str) -> Self {
        Self::new(value, vec![unit.to_string()], Vec::new())
    }

    /// Attach the literal source text of this number.
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Drop the literal source text, forcing the computed value to be used.
    pub fn without_original(mut self) -> Self {
        self.original = None;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn numerator_units(&self) -> &[String] {
        &self.numerator_units
    }

    pub fn denominator_units(&self) -> &[String] {
        &self.denominator_units
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn is_unitless(&self) -> bool {
        self.numerator_units.is_empty() && self.denominator_units.is_empty()
    }

    pub fn is_int(&self) -> bool {
        (self.value - self.value.round()).abs() < EPSILON
    }

    /// Whether the number has exactly the single unit `unit`.
    pub fn has_unit(&self, unit: &str) -> bool {
        self.denominator_units.is_empty()
            && self.numerator_units.len() == 1
            && self.numerator_units[0] == unit
    }

    /// Whether the units can be written in CSS (at most one numerator unit).
    pub fn has_legal_units(&self) -> bool {
        self.numerator_units.len() <= 1 && self.denominator_units.is_empty()
    }

    /// Units rendered as `num*num/den*den`, each side sorted.
    pub fn unit_string(&self) -> String {
        let mut numerator = self.numerator_units.clone();
        numerator.sort();
        let mut rendered = numerator.join("*");
        if !self.denominator_units.is_empty() {
            let mut denominator = self.denominator_units.clone();
            denominator.sort();
            rendered.push('/');
            rendered.push_str(&denominator.join("*"));
        }
        rendered
    }

    /// The same number with a different value and no original text.
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            numerator_units: self.numerator_units.clone(),
            denominator_units: self.denominator_units.clone(),
            original: None,
        }
    }

    /// Convert to the given units.
    ///
    /// A unitless number adopts the target units without changing value.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::IncompatibleUnits`] when the units do not
    /// convert into each other.
    pub fn coerce(&self, numerator: &[String], denominator: &[String]) -> Result<Self, ValueError> {
        let value = if self.is_unitless() {
            self.value
        } else {
            self.value * coercion_factor(&self.numerator_units, numerator)?
                / coercion_factor(&self.denominator_units, denominator)?
        };
        Ok(Self {
            value,
            numerator_units: numerator.to_vec(),
            denominator_units: denominator.to_vec(),
            original: None,
        })
    }

    /// Whether the two numbers can be added or compared.
    pub fn is_comparable_to(&self, other: &Number) -> bool {
        self.align(other).is_ok()
    }

    pub fn plus(&self, other: &Number) -> Result<Self, ValueError> {
        self.operate(other, Arith::Add)
    }

    pub fn minus(&self, other: &Number) -> Result<Self, ValueError> {
        self.operate(other, Arith::Sub)
    }

    pub fn times(&self, other: &Number) -> Result<Self, ValueError> {
        self.operate(other, Arith::Mul)
    }

    pub fn div(&self, other: &Number) -> Result<Self, ValueError> {
        self.operate(other, Arith::Div)
    }

    pub fn modulo(&self, other: &Number) -> Result<Self, ValueError> {
        self.operate(other, Arith::Rem)
    }

    pub fn negate(&self) -> Self {
        self.with_value(-self.value)
    }

    /// Compare after converting both sides to common units.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::IncompatibleUnits`] for unrelated units.
    pub fn compare(&self, other: &Number) -> Result<std::cmp::Ordering, ValueError> {
        let (this, other) = self.align(other)?;
        Ok(this.value.total_cmp(&other.value))
    }

    /// SassScript equality: equal after conversion, `false` when the units
    /// cannot be converted.
    pub fn sass_eq(&self, other: &Number) -> bool {
        match self.align(other) {
            Ok((this, other)) => (this.value - other.value).abs() < EPSILON,
            Err(_) => false,
        }
    }

    /// Text written to CSS.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidCss`] for numbers with compound units.
    pub fn to_css(&self) -> Result<String, ValueError> {
        if let Some(original) = &self.original {
            return Ok(original.clone());
        }
        if !self.has_legal_units() {
            return Err(ValueError::InvalidCss(self.inspect()));
        }
        Ok(self.inspect())
    }

    /// Text for diagnostics and `@debug`, including compound units.
    pub fn inspect(&self) -> String {
        format!("{}{}", format_number(self.value), self.unit_string())
    }

    /// Bring both operands to the units of the one that has units.
    fn align(&self, other: &Number) -> Result<(Number, Number), ValueError> {
        if self.is_unitless() {
            Ok((
                self.coerce(&other.numerator_units, &other.denominator_units)?,
                other.clone(),
            ))
        } else {
            Ok((
                self.clone(),
                other.coerce(&self.numerator_units, &self.denominator_units)?,
            ))
        }
    }

    fn operate(&self, other: &Number, op: Arith) -> Result<Self, ValueError> {
        let (this, other) = match op {
            Arith::Add | Arith::Sub => self.align(other)?,
            _ => (self.clone(), other.clone()),
        };
        let value = match op {
            Arith::Add => this.value + other.value,
            Arith::Sub => this.value - other.value,
            Arith::Mul => this.value * other.value,
            Arith::Div => this.value / other.value,
            Arith::Rem => this.value.rem_euclid(other.value),
        };
        let (numerator, denominator) = match op {
            Arith::Mul => (
                concat(&this.numerator_units, &other.numerator_units),
                concat(&this.denominator_units, &other.denominator_units),
            ),
            Arith::Div => (
                concat(&this.numerator_units, &other.denominator_units),
                concat(&this.denominator_units, &other.numerator_units),
            ),
            _ => (this.numerator_units, this.denominator_units),
        };
        Ok(Self::new(value, numerator, denominator))
    }

    fn normalize(&mut self) {
        if self.is_unitless() {
            return;
        }
        let (numerator, denominator) =
            sans_common_units(&self.numerator_units, &self.denominator_units);
        self.numerator_units = numerator;
        self.denominator_units = Vec::new();
        for unit in denominator {
            let partner = self
                .numerator_units
                .iter()
                .position(|n| n != &unit && units::conversion_factor(&unit, n).is_some());
            match partner {
                Some(index) => {
                    let numerator = self.numerator_units.remove(index);
                    if let Some(factor) = units::conversion_factor(&unit, &numerator) {
                        self.value /= factor;
                    }
                }
                None => self.denominator_units.push(unit),
            }
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        (self.value - other.value).abs() < EPSILON
            && self.numerator_units == other.numerator_units
            && self.denominator_units == other.denominator_units
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

/// Round to [`PRECISION`], half away from zero.
pub fn round_to_precision(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

/// Render a float the way numbers appear in CSS output.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let rounded = round_to_precision(value);
    if rounded == 0.0 {
        "0".to_string()
    } else if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

fn concat(left: &[String], right: &[String]) -> Vec<String> {
    left.iter().chain(right).cloned().collect()
}

/// Remove units present in both lists, one occurrence at a time.
fn sans_common_units(units1: &[String], units2: &[String]) -> (Vec<String>, Vec<String>) {
    let mut remaining = units2.to_vec();
    let kept = units1
        .iter()
        .filter(|unit| match remaining.iter().position(|u| u == *unit) {
            Some(index) => {
                remaining.remove(index);
                false
            }
            None => true,
        })
        .cloned()
        .collect();
    (kept, remaining)
}

fn coercion_factor(from: &[String], to: &[String]) -> Result<f64, ValueError> {
    let (from, to) = sans_common_units(from, to);
    let incompatible = || ValueError::IncompatibleUnits {
        left: from.join("*"),
        right: to.join("*"),
    };
    if from.len() != to.len() {
        return Err(incompatible());
    }
    from.iter().zip(&to).try_fold(1.0, |acc, (f, t)| {
        units::conversion_factor(f, t)
            .map(|factor| acc * factor)
            .ok_or_else(incompatible)
    })
}
