use sable_core::value::{Number, Value};

use super::{Args, FnError, FnResult};

pub(super) fn percentage(args: &mut Args) -> FnResult {
    let value = args.number(0)?;
    if !value.is_unitless() {
        return Err(FnError::Argument(format!(
            "{} is not a unitless number",
            value.inspect()
        )));
    }
    Ok(Value::Number(Number::with_unit(value.value() * 100.0, "%")))
}

/// Apply `f` to the value of a number, keeping its units.
fn transform(args: &Args, f: fn(f64) -> f64) -> FnResult {
    let number = args.number(0)?;
    Ok(Value::Number(number.with_value(f(number.value()))))
}

pub(super) fn round(args: &mut Args) -> FnResult {
    transform(args, f64::round)
}

pub(super) fn ceil(args: &mut Args) -> FnResult {
    transform(args, f64::ceil)
}

pub(super) fn floor(args: &mut Args) -> FnResult {
    transform(args, f64::floor)
}

pub(super) fn abs(args: &mut Args) -> FnResult {
    transform(args, f64::abs)
}
