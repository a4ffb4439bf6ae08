use sable_core::value::Value;

use super::{Args, FnResult};

/// Strings lose their quotes; anything else passes through.
pub(super) fn unquote(args: &mut Args) -> FnResult {
    match args.value(0)? {
        Value::Str(string) => Ok(Value::unquoted(string.text())),
        other => Ok(other.clone()),
    }
}

pub(super) fn quote(args: &mut Args) -> FnResult {
    Ok(Value::quoted(args.string(0)?.text()))
}

pub(super) fn type_of(args: &mut Args) -> FnResult {
    Ok(Value::unquoted(args.value(0)?.type_name()))
}

pub(super) fn unit(args: &mut Args) -> FnResult {
    Ok(Value::quoted(args.number(0)?.unit_string()))
}

pub(super) fn unitless(args: &mut Args) -> FnResult {
    Ok(Value::Bool(args.number(0)?.is_unitless()))
}

pub(super) fn comparable(args: &mut Args) -> FnResult {
    let first = args.number(0)?;
    let second = args.number(1)?;
    Ok(Value::Bool(first.is_comparable_to(second)))
}

pub(super) fn if_(args: &mut Args) -> FnResult {
    let chosen = if args.value(0)?.is_truthy() { 1 } else { 2 };
    args.value(chosen).cloned()
}
