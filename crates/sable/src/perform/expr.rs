//! SassScript evaluation.

use std::rc::Rc;

use log::trace;

use sable_core::{
    ValueError,
    value::{List, SassString, Value},
};
use sable_parser::{
    BinaryOp, CallArgs, Diagnostic, ErrorCode, Expr, ExprKind, InterpPart, Interpolation, UnaryOp,
};

use crate::{
    environment::{Callable, CallableKind, ScopeId, StackFrame},
    functions::{self, FnError},
};

use super::{Perform, Result};

/// Attach the location of `expr` to a failed value operation.
pub(super) fn value_error(err: ValueError, expr: &Expr) -> Diagnostic {
    let code = if err.is_unit_conversion() {
        ErrorCode::E303
    } else {
        ErrorCode::E306
    };
    Diagnostic::error(err.to_string())
        .with_code(code)
        .with_label(expr.span, "in this expression")
        .with_line(expr.line)
}

fn call_error(message: String, expr: &Expr) -> Diagnostic {
    Diagnostic::error(message)
        .with_code(ErrorCode::E302)
        .with_label(expr.span, "in this call")
        .with_line(expr.line)
}

impl Perform<'_, '_> {
    pub(super) fn eval(&mut self, expr: &Expr, scope: ScopeId) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Variable(name) => match self.env.var(scope, name) {
                Some(value) => Ok(value.clone().without_original()),
                None => Err(Diagnostic::error(format!("Undefined variable: \"${name}\"."))
                    .with_code(ErrorCode::E300)
                    .with_label(expr.span, "not defined")
                    .with_line(expr.line)),
            },
            ExprKind::Str { quotes, parts } => {
                let text = self.interpolate_parts(parts, scope)?;
                Ok(Value::Str(SassString::new(text, *quotes)))
            }
            ExprKind::Interpolation {
                before,
                mid,
                after,
                ws_before,
                ws_after,
            } => {
                let style = self.session.options().style();
                let mut text = String::new();
                if let Some(before) = before {
                    let value = self.eval(before, scope)?;
                    text.push_str(&value.to_css(style).map_err(|err| value_error(err, before))?);
                    if *ws_before {
                        text.push(' ');
                    }
                }
                let value = self.eval(mid, scope)?;
                text.push_str(&value.interpolated(style).map_err(|err| value_error(err, mid))?);
                if let Some(after) = after {
                    if *ws_after {
                        text.push(' ');
                    }
                    let value = self.eval(after, scope)?;
                    text.push_str(&value.to_css(style).map_err(|err| value_error(err, after))?);
                }
                Ok(Value::unquoted(text))
            }
            ExprKind::List { items, separator } => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(List::new(values, *separator)))
            }
            ExprKind::Binary { op, left, right } => {
                let left_value = self.eval(left, scope)?;
                let short_circuit = match op {
                    BinaryOp::And => !left_value.is_truthy(),
                    BinaryOp::Or => left_value.is_truthy(),
                    _ => false,
                };
                if short_circuit {
                    return Ok(left_value);
                }
                let right_value = self.eval(right, scope)?;
                operate(*op, &left_value, &right_value).map_err(|err| value_error(err, expr))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                match op {
                    UnaryOp::Plus => value.unary_plus(),
                    UnaryOp::Minus => value.unary_minus(),
                    UnaryOp::Div => value.unary_div(),
                    UnaryOp::Not => Ok(value.not()),
                }
                .map_err(|err| value_error(err, expr))
            }
            ExprKind::Call { name, args } => self.call(name, args, expr, scope),
            ExprKind::Paren(inner) => Ok(self.eval(inner, scope)?.without_original()),
        }
    }

    /// Resolve `#{}` in `interp` to text.
    pub(super) fn interpolate(&mut self, interp: &Interpolation, scope: ScopeId) -> Result<String> {
        self.interpolate_parts(interp.parts(), scope)
    }

    fn interpolate_parts(&mut self, parts: &[InterpPart], scope: ScopeId) -> Result<String> {
        let style = self.session.options().style();
        let mut text = String::new();
        for part in parts {
            match part {
                InterpPart::Text(chunk) => text.push_str(chunk),
                InterpPart::Expr(expr) => {
                    let value = self.eval(expr, scope)?;
                    text.push_str(&value.interpolated(style).map_err(|err| value_error(err, expr))?);
                }
            }
        }
        Ok(text)
    }

    /// Evaluate call arguments in the caller's scope.
    pub(super) fn eval_args(
        &mut self,
        args: &CallArgs,
        scope: ScopeId,
    ) -> Result<(Vec<Value>, Vec<(String, Value)>)> {
        let positional = args
            .positional
            .iter()
            .map(|arg| self.eval(arg, scope))
            .collect::<Result<Vec<_>>>()?;
        let keywords = args
            .keywords
            .iter()
            .map(|(name, arg)| -> Result<(String, Value)> {
                Ok((name.clone(), self.eval(arg, scope)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((positional, keywords))
    }

    /// Call a user function, a built-in, or emit a plain CSS function call,
    /// in that order of preference.
    fn call(&mut self, name: &str, args: &CallArgs, expr: &Expr, scope: ScopeId) -> Result<Value> {
        let (positional, keywords) = self.eval_args(args, scope)?;

        if let Some(function) = self.env.function(scope, name) {
            return self.call_function(&function, positional, keywords, expr);
        }

        if let Some(builtin) = functions::lookup(name) {
            trace!(name; "calling built-in");
            return builtin.invoke(positional, keywords).map_err(|err| match err {
                FnError::Argument(message) => call_error(format!("{message} for `{name}'"), expr),
                FnError::Value(err) => value_error(err, expr),
            });
        }

        if let Some((keyword, _)) = keywords.first() {
            return Err(call_error(
                format!("Function {name} doesn't have an argument named ${keyword}"),
                expr,
            ));
        }
        let style = self.session.options().style();
        let rendered = positional
            .iter()
            .map(|arg| arg.to_css(style))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| value_error(err, expr))?;
        Ok(Value::unquoted(format!("{name}({})", rendered.join(", "))))
    }

    fn call_function(
        &mut self,
        function: &Rc<Callable>,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
        expr: &Expr,
    ) -> Result<Value> {
        self.check_depth(expr.span, expr.line)?;
        trace!(name:% = function.name; "calling function");
        self.env.push_frame(StackFrame {
            kind: CallableKind::Function,
            name: function.name.clone(),
            line: expr.line,
            filename: self.filename.clone(),
        });
        let result = self
            .bind_args(function, positional, keywords, expr.span, expr.line)
            .and_then(|body_scope| {
                // Function bodies hold no output nodes, only comments at most.
                let mut discarded = Vec::new();
                let returned = self.perform_nodes(&function.body, body_scope, &mut discarded);
                self.env.pop_scope(body_scope);
                returned
            });
        self.env.pop_frame();

        match result? {
            Some(value) => Ok(value),
            None => Err(Diagnostic::error(format!(
                "Function {} finished without @return",
                function.name
            ))
            .with_code(ErrorCode::E307)
            .with_label(expr.span, "called here")
            .with_line(expr.line)),
        }
    }
}

fn operate(op: BinaryOp, left: &Value, right: &Value) -> std::result::Result<Value, ValueError> {
    match op {
        BinaryOp::SingleEq => left.single_eq(right),
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }.clone()),
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }.clone()),
        BinaryOp::Eq => Ok(Value::Bool(left.sass_eq(right))),
        BinaryOp::Neq => Ok(Value::Bool(!left.sass_eq(right))),
        BinaryOp::Gt => left.gt(right),
        BinaryOp::Gte => left.gte(right),
        BinaryOp::Lt => left.lt(right),
        BinaryOp::Lte => left.lte(right),
        BinaryOp::Plus => left.plus(right),
        BinaryOp::Minus => left.minus(right),
        BinaryOp::Times => left.times(right),
        BinaryOp::Mod => left.modulo(right),
        BinaryOp::Div => divide(left, right),
    }
}

/// Division of two literal numbers keeps its source text, so `12px/1.5`
/// renders as written.
fn divide(left: &Value, right: &Value) -> std::result::Result<Value, ValueError> {
    let quotient = left.div(right)?;
    if let (Value::Number(a), Value::Number(b), Value::Number(q)) = (left, right, &quotient) {
        if let (Some(x), Some(y)) = (a.original(), b.original()) {
            return Ok(Value::Number(q.clone().with_original(format!("{x}/{y}"))));
        }
    }
    Ok(quotient)
}

#[cfg(test)]
mod tests {
    use sable_core::{style::OutputStyle, value::Number};

    use super::*;

    fn number(value: f64, original: &str) -> Value {
        Value::Number(Number::unitless(value).with_original(original))
    }

    #[test]
    fn test_divide_keeps_literal_text() {
        let result = divide(&number(12.0, "12"), &number(4.0, "4")).expect("divides");
        assert_eq!(result.to_css(OutputStyle::Nested).expect("valid"), "12/4");

        let result = divide(&Value::number(12.0), &number(4.0, "4")).expect("divides");
        assert_eq!(result.to_css(OutputStyle::Nested).expect("valid"), "3");
    }

    #[test]
    fn test_boolean_operators_return_operands() {
        let a = Value::unquoted("a");
        let f = Value::Bool(false);
        assert_eq!(operate(BinaryOp::And, &a, &f).expect("ok"), f);
        assert_eq!(operate(BinaryOp::Or, &f, &a).expect("ok"), a);
        assert_eq!(operate(BinaryOp::Neq, &a, &f).expect("ok"), Value::Bool(true));
    }
}
