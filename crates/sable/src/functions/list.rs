use sable_core::value::{List, ListSeparator, Value};

use super::{Args, FnError, FnResult};

pub(super) fn length(args: &mut Args) -> FnResult {
    let items = args.value(0)?.to_items();
    Ok(Value::number(items.len() as f64))
}

pub(super) fn nth(args: &mut Args) -> FnResult {
    let items = args.value(0)?.to_items();
    let n = args.number(1)?;
    let shown = n.inspect();
    if !n.is_int() {
        return Err(FnError::Argument(format!(
            "List index {shown} must be an integer"
        )));
    }
    let index = n.value().round();
    if index < 1.0 {
        return Err(FnError::Argument(format!(
            "List index {shown} must be greater than or equal to 1"
        )));
    }
    if items.is_empty() {
        return Err(FnError::Argument(format!(
            "List index is {shown} but list has no items"
        )));
    }
    let size = items.len();
    if index as usize > size {
        let plural = if size == 1 { "" } else { "s" };
        return Err(FnError::Argument(format!(
            "List index is {shown} but list is only {size} item{plural} long"
        )));
    }
    Ok(items[index as usize - 1].clone())
}

/// Resolve the `$separator` argument; `auto` defers to `fallback`.
fn separator(args: &Args, index: usize, fallback: Option<ListSeparator>) -> Result<ListSeparator, FnError> {
    let name = match args.get(index) {
        None => "auto",
        Some(_) => args.string(index)?.text(),
    };
    match name {
        "auto" => Ok(fallback.unwrap_or(ListSeparator::Space)),
        "space" => Ok(ListSeparator::Space),
        "comma" => Ok(ListSeparator::Comma),
        _ => Err(FnError::Argument(
            "Separator name must be space, comma, or auto".to_string(),
        )),
    }
}

pub(super) fn join(args: &mut Args) -> FnResult {
    let first = args.value(0)?;
    let second = args.value(1)?;
    let separator = separator(args, 2, first.separator().or(second.separator()))?;
    let mut items = first.to_items();
    items.extend(second.to_items());
    Ok(Value::List(List::new(items, separator)))
}

pub(super) fn append(args: &mut Args) -> FnResult {
    let list = args.value(0)?;
    let separator = separator(args, 2, list.separator())?;
    let mut items = list.to_items();
    items.push(args.value(1)?.clone());
    Ok(Value::List(List::new(items, separator)))
}

#[cfg(test)]
mod tests {
    use crate::functions::lookup;

    use super::*;

    fn list(items: &[f64], separator: ListSeparator) -> Value {
        Value::List(List::new(
            items.iter().map(|v| Value::number(*v)).collect(),
            separator,
        ))
    }

    fn call(name: &str, args: Vec<Value>) -> Result<Value, FnError> {
        lookup(name).expect("known function").invoke(args, Vec::new())
    }

    #[test]
    fn test_length_treats_single_values_as_lists() {
        let three = list(&[1.0, 2.0, 3.0], ListSeparator::Space);
        assert_eq!(call("length", vec![three]).unwrap(), Value::number(3.0));
        assert_eq!(
            call("length", vec![Value::unquoted("a")]).unwrap(),
            Value::number(1.0)
        );
    }

    #[test]
    fn test_nth_bounds() {
        let two = list(&[1.0, 2.0], ListSeparator::Comma);
        assert_eq!(
            call("nth", vec![two.clone(), Value::number(2.0)]).unwrap(),
            Value::number(2.0)
        );
        let err = call("nth", vec![two.clone(), Value::number(3.0)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "List index is 3 but list is only 2 items long"
        );
        let err = call("nth", vec![two, Value::number(0.0)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "List index 0 must be greater than or equal to 1"
        );
    }

    #[test]
    fn test_join_picks_separator() {
        let spaced = list(&[1.0, 2.0], ListSeparator::Space);
        let commas = list(&[3.0], ListSeparator::Comma);
        let joined = call("join", vec![spaced.clone(), commas.clone()]).unwrap();
        assert_eq!(joined.separator(), Some(ListSeparator::Space));
        assert_eq!(joined.inspect(), "1 2 3");
        let joined = call("join", vec![spaced, commas, Value::unquoted("comma")]).unwrap();
        assert_eq!(joined.inspect(), "1, 2, 3");
    }

    #[test]
    fn test_append() {
        let commas = list(&[1.0, 2.0], ListSeparator::Comma);
        let appended = call("append", vec![commas, Value::number(3.0)]).unwrap();
        assert_eq!(appended.inspect(), "1, 2, 3");
        let err = call(
            "append",
            vec![Value::number(1.0), Value::number(2.0), Value::unquoted("tab")],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Separator name must be space, comma, or auto"
        );
    }
}
