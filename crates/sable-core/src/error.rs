//! Errors raised by SassScript value operations.

use thiserror::Error;

/// Failure of an operation on SassScript values.
///
/// These errors carry no location. The evaluator attaches the line and
/// error code of the expression that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Units that cannot be converted into each other.
    #[error("Incompatible units: '{left}' and '{right}'.")]
    IncompatibleUnits { left: String, right: String },

    /// An operator that has no meaning for the given operands.
    #[error("Undefined operation: \"{left} {op} {right}\".")]
    UndefinedOperation {
        left: String,
        op: &'static str,
        right: String,
    },

    /// A value that cannot be written to CSS as-is.
    #[error("{0} isn't a valid CSS value.")]
    InvalidCss(String),

    /// Piecewise color arithmetic between colors with different alpha.
    #[error("Alpha channels must be equal: {left} {op} {right}")]
    AlphaMismatch {
        left: String,
        op: &'static str,
        right: String,
    },

    /// Piecewise color arithmetic with a number that carries units.
    #[error("Cannot add a number with units ({number}) to a color ({color}).")]
    UnitsWithColor { number: String, color: String },
}

impl ValueError {
    /// Whether this error comes from unit conversion.
    pub fn is_unit_conversion(&self) -> bool {
        matches!(self, Self::IncompatibleUnits { .. })
    }
}

/// Failure while combining selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// `&` used in a rule that has no parent rule.
    #[error("Base-level rules cannot contain the parent-selector-referencing character '&'.")]
    ParentAtBaseLevel,

    /// The parent selector ends in a combinator and cannot absorb a suffix.
    #[error("Invalid parent selector: \"{0}\"")]
    InvalidParent(String),
}
