//! Lexical scopes and the call stack.
//!
//! Scopes live in an arena owned by [`Environment`] and are addressed by
//! [`ScopeId`]. Each scope links to its parent; lookups walk the chain
//! outward and the first match wins. A scope is dropped when the block that
//! created it finishes, unless a mixin or function defined in it captured
//! it.
//!
//! Variable, mixin and function names treat `_` and `-` as the same
//! character.

use std::{collections::HashMap, rc::Rc, sync::Arc};

use log::trace;

use sable_core::value::Value;
use sable_parser::{Node, Param};

/// Handle of a scope in the [`Environment`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Mixin,
    Function,
}

impl CallableKind {
    /// Capitalized name used at the start of error messages.
    pub fn title(self) -> &'static str {
        match self {
            Self::Mixin => "Mixin",
            Self::Function => "Function",
        }
    }
}

/// A user-defined mixin or function.
#[derive(Debug)]
pub struct Callable {
    pub kind: CallableKind,
    pub name: String,
    pub params: Vec<Param>,
    /// The scope the definition was evaluated in.
    pub scope: ScopeId,
    pub body: Vec<Node>,
}

/// One active mixin or function call.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub kind: CallableKind,
    pub name: String,
    pub line: usize,
    pub filename: Option<Arc<str>>,
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    vars: HashMap<String, Value>,
    mixins: HashMap<String, Rc<Callable>>,
    functions: HashMap<String, Rc<Callable>>,
    captured: bool,
}

/// Scope arena plus the call stack of one compilation.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
    stack: Vec<StackFrame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            stack: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a scope nested in `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    /// Close a scope opened by [`push_scope`](Self::push_scope).
    pub fn pop_scope(&mut self, id: ScopeId) {
        if id.0 == 0 || id.0 + 1 != self.scopes.len() {
            return;
        }
        if !self.scopes[id.0].captured {
            self.scopes.truncate(id.0);
        }
    }

    /// Number of live scopes.
    #[cfg(test)]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn var(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        let name = normalize(name);
        self.find(scope, |s| s.vars.contains_key(&name))
            .and_then(|id| self.scopes[id.0].vars.get(&name))
    }

    /// Assign to the nearest scope that already has the variable, or
    /// declare it in `scope`.
    pub fn set_var(&mut self, scope: ScopeId, name: &str, value: Value) {
        let name = normalize(name);
        let target = self
            .find(scope, |s| s.vars.contains_key(&name))
            .unwrap_or(scope);
        trace!(name:% = name, scope = target.0; "set variable");
        self.scopes[target.0].vars.insert(name, value);
    }

    /// Declare the variable in `scope`, shadowing any outer one.
    pub fn set_local_var(&mut self, scope: ScopeId, name: &str, value: Value) {
        self.scopes[scope.0].vars.insert(normalize(name), value);
    }

    pub fn mixin(&self, scope: ScopeId, name: &str) -> Option<Rc<Callable>> {
        let name = normalize(name);
        self.find(scope, |s| s.mixins.contains_key(&name))
            .and_then(|id| self.scopes[id.0].mixins.get(&name).cloned())
    }

    pub fn function(&self, scope: ScopeId, name: &str) -> Option<Rc<Callable>> {
        let name = normalize(name);
        self.find(scope, |s| s.functions.contains_key(&name))
            .and_then(|id| self.scopes[id.0].functions.get(&name).cloned())
    }

    /// Define a mixin or function in `scope`, keeping the scope alive for
    /// later calls.
    pub fn define(&mut self, scope: ScopeId, callable: Callable) {
        let name = normalize(&callable.name);
        self.capture(callable.scope);
        let slot = &mut self.scopes[scope.0];
        match callable.kind {
            CallableKind::Mixin => slot.mixins.insert(name, Rc::new(callable)),
            CallableKind::Function => slot.functions.insert(name, Rc::new(callable)),
        };
    }

    pub fn push_frame(&mut self, frame: StackFrame) {
        self.stack.push(frame);
    }

    pub fn pop_frame(&mut self) {
        self.stack.pop();
    }

    /// Active calls, outermost first.
    pub fn stack(&self) -> &[StackFrame] {
        &self.stack
    }

    /// The chain of mixins that would loop if `name` were included now.
    ///
    /// Returns the names from the active `name` call to the innermost call,
    /// followed by `name` again.
    pub fn include_cycle(&self, name: &str) -> Option<Vec<String>> {
        let name = normalize(name);
        let start = self
            .stack
            .iter()
            .position(|f| f.kind == CallableKind::Mixin && normalize(&f.name) == name)?;
        let mut cycle: Vec<String> = self.stack[start..]
            .iter()
            .filter(|f| f.kind == CallableKind::Mixin)
            .map(|f| f.name.clone())
            .collect();
        cycle.push(self.stack[start].name.clone());
        Some(cycle)
    }

    fn capture(&mut self, scope: ScopeId) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let slot = &mut self.scopes[id.0];
            if slot.captured {
                break;
            }
            slot.captured = true;
            current = slot.parent;
        }
    }

    fn find(&self, scope: ScopeId, has: impl Fn(&Scope) -> bool) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let slot = &self.scopes[id.0];
            if has(slot) {
                return Some(id);
            }
            current = slot.parent;
        }
        None
    }
}

fn normalize(name: &str) -> String {
    name.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callable(kind: CallableKind, name: &str, scope: ScopeId) -> Callable {
        Callable {
            kind,
            name: name.to_string(),
            params: Vec::new(),
            scope,
            body: Vec::new(),
        }
    }

    fn frame(name: &str) -> StackFrame {
        StackFrame {
            kind: CallableKind::Mixin,
            name: name.to_string(),
            line: 1,
            filename: None,
        }
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut env = Environment::new();
        let global = env.global();
        env.set_var(global, "a", Value::number(1.0));
        let inner = env.push_scope(global);
        assert_eq!(env.var(inner, "a"), Some(&Value::number(1.0)));
        assert_eq!(env.var(inner, "b"), None);
    }

    #[test]
    fn test_set_var_updates_nearest_declaring_scope() {
        let mut env = Environment::new();
        let global = env.global();
        env.set_var(global, "a", Value::number(1.0));
        let inner = env.push_scope(global);
        env.set_var(inner, "a", Value::number(2.0));
        env.set_var(inner, "b", Value::number(3.0));
        env.pop_scope(inner);
        assert_eq!(env.var(global, "a"), Some(&Value::number(2.0)));
        assert_eq!(env.var(global, "b"), None);
    }

    #[test]
    fn test_local_var_shadows() {
        let mut env = Environment::new();
        let global = env.global();
        env.set_var(global, "a", Value::number(1.0));
        let inner = env.push_scope(global);
        env.set_local_var(inner, "a", Value::number(2.0));
        assert_eq!(env.var(inner, "a"), Some(&Value::number(2.0)));
        assert_eq!(env.var(global, "a"), Some(&Value::number(1.0)));
    }

    #[test]
    fn test_underscore_and_dash_are_equivalent() {
        let mut env = Environment::new();
        let global = env.global();
        env.set_var(global, "main_width", Value::number(1.0));
        assert!(env.var(global, "main-width").is_some());
        env.define(global, callable(CallableKind::Mixin, "big-box", global));
        assert!(env.mixin(global, "big_box").is_some());
        assert!(env.function(global, "big_box").is_none());
    }

    #[test]
    fn test_popped_scopes_are_reclaimed_unless_captured() {
        let mut env = Environment::new();
        let global = env.global();
        let inner = env.push_scope(global);
        env.pop_scope(inner);
        assert_eq!(env.scope_count(), 1);

        let inner = env.push_scope(global);
        env.define(inner, callable(CallableKind::Function, "f", inner));
        env.pop_scope(inner);
        assert_eq!(env.scope_count(), 2);
    }

    #[test]
    fn test_include_cycle() {
        let mut env = Environment::new();
        env.push_frame(frame("outer"));
        env.push_frame(frame("a"));
        env.push_frame(frame("b"));
        assert_eq!(
            env.include_cycle("a"),
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
        assert_eq!(env.include_cycle("c"), None);
        env.pop_frame();
        env.pop_frame();
        env.pop_frame();
        assert!(env.stack().is_empty());
    }
}
