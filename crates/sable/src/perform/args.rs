//! Binding call arguments to the parameters of a mixin or function.

use sable_core::value::Value;
use sable_parser::{Diagnostic, ErrorCode, Span};

use crate::environment::{Callable, CallableKind, ScopeId};

use super::{Perform, Result};

fn same_name(a: &str, b: &str) -> bool {
    a.replace('_', "-") == b.replace('_', "-")
}

impl Perform<'_, '_> {
    /// Open the body scope of `callable` with every parameter bound.
    ///
    /// Positional arguments fill parameters in order, keyword arguments fill
    /// the named ones and defaults, evaluated in the new scope, fill the
    /// rest. On success the caller must pop the returned scope.
    pub(super) fn bind_args(
        &mut self,
        callable: &Callable,
        positional: Vec<Value>,
        mut keywords: Vec<(String, Value)>,
        span: Span,
        line: usize,
    ) -> Result<ScopeId> {
        let error = |message: String| {
            Diagnostic::error(message)
                .with_code(ErrorCode::E302)
                .with_label(span, "in this call")
                .with_line(line)
        };
        let title = callable.kind.title();
        let name = &callable.name;
        let params = &callable.params;

        if positional.len() > params.len() {
            let message = match callable.kind {
                CallableKind::Mixin => format!(
                    "Mixin {name} takes {} argument{} but {} {} passed.",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    positional.len(),
                    if positional.len() == 1 { "was" } else { "were" },
                ),
                CallableKind::Function => format!(
                    "Wrong number of arguments ({} for {}) for `{name}'",
                    positional.len(),
                    params.len()
                ),
            };
            return Err(error(message));
        }
        for (keyword, _) in &keywords {
            match params.iter().position(|p| same_name(&p.name, keyword)) {
                None => {
                    return Err(error(format!(
                        "{title} {name} doesn't have an argument named ${keyword}"
                    )));
                }
                Some(index) if index < positional.len() => {
                    return Err(error(format!(
                        "{title} {name} was passed argument ${keyword} both by position and by name."
                    )));
                }
                Some(_) => {}
            }
        }

        let scope = self.env.push_scope(callable.scope);
        let mut positional = positional.into_iter();
        for param in params {
            let value = match positional.next() {
                Some(value) => Some(value),
                None => match keywords.iter().position(|(k, _)| same_name(k, &param.name)) {
                    Some(index) => Some(keywords.swap_remove(index).1),
                    None => match &param.default {
                        Some(default) => match self.eval(default, scope) {
                            Ok(value) => Some(value),
                            Err(diag) => {
                                self.env.pop_scope(scope);
                                return Err(diag);
                            }
                        },
                        None => None,
                    },
                },
            };
            let Some(value) = value else {
                self.env.pop_scope(scope);
                return Err(error(format!(
                    "{title} {name} is missing argument ${}.",
                    param.name
                )));
            };
            self.env.set_local_var(scope, &param.name, value);
        }
        Ok(scope)
    }
}
