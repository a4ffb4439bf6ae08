//! Evaluation of the dynamic tree.
//!
//! [`perform`] walks the tree built by the parser with an [`Environment`]:
//! expressions become values, selectors are interpolated and parsed,
//! control directives are replaced by the children they expand to, mixin
//! and function definitions are recorded and vanish, `@include` splices the
//! mixin body in place and `@import` evaluates the imported file in the
//! current scope. The result is the static-source tree: still nested, with
//! the `@extend` requests attached to their rules.

mod args;
mod expr;

use std::{mem, rc::Rc, sync::Arc};

use log::{debug, info, trace};

use sable_core::value::{Number, Value};
use sable_parser::{
    BacktraceFrame, CallArgs, Diagnostic, ErrorCode, Expr, ImportTarget, Interpolation, Node,
    NodeKind, Param, Span, SyntaxError, parse, parse_selector,
};

use crate::{
    check_nesting::{Parent, check_imported},
    environment::{Callable, CallableKind, Environment, ScopeId, StackFrame},
    importer::{ImportedSource, SourceId},
    session::Session,
    stylesheet::{CssKind, CssNode},
};

type Result<T> = std::result::Result<T, Diagnostic>;

/// Evaluate a parsed stylesheet.
///
/// `entry` identifies the file `root` was read from, when it came from an
/// importer; its own imports are then resolved relative to it first.
///
/// # Errors
///
/// Returns the first evaluation error, with its backtrace filled in.
pub(crate) fn perform(
    root: &Node,
    session: &mut Session<'_>,
    entry: Option<SourceId>,
) -> Result<CssNode> {
    debug!(nodes = root.children.len(); "performing stylesheet");
    let mut perform = Perform {
        session,
        env: Environment::new(),
        file: entry,
        filename: root.filename.clone(),
        parent: Parent::Root,
    };
    let global = perform.env.global();
    let mut children = Vec::new();
    perform.perform_nodes(&root.children, global, &mut children)?;
    Ok(CssNode::new(CssKind::Root, root.line, root.filename.clone()).with_children(children))
}

struct Perform<'s, 'a> {
    session: &'s mut Session<'a>,
    env: Environment,
    /// The file being evaluated, when it came from an importer.
    file: Option<SourceId>,
    /// Filename of the node being evaluated.
    filename: Option<Arc<str>>,
    /// Nearest enclosing node that is not a script directive.
    parent: Parent,
}

impl Perform<'_, '_> {
    // ============================================================================
    // Blocks
    // ============================================================================

    /// Evaluate `nodes` in `scope`, appending their output to `out`.
    ///
    /// Returns the value of the first `@return` reached.
    fn perform_nodes(
        &mut self,
        nodes: &[Node],
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        for node in nodes {
            if let Some(value) = self.perform_node(node, scope, out)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Evaluate `nodes` in a new scope nested in `parent`.
    fn perform_block(
        &mut self,
        nodes: &[Node],
        parent: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        self.in_scope(parent, |this, scope| this.perform_nodes(nodes, scope, out))
    }

    fn in_scope<T>(
        &mut self,
        parent: ScopeId,
        f: impl FnOnce(&mut Self, ScopeId) -> Result<T>,
    ) -> Result<T> {
        let scope = self.env.push_scope(parent);
        let result = f(self, scope);
        self.env.pop_scope(scope);
        result
    }

    /// Evaluate the children of `node` as the children of a new output node.
    fn nested(&mut self, node: &Node, parent: Parent, scope: ScopeId) -> Result<Vec<CssNode>> {
        let saved = mem::replace(&mut self.parent, parent);
        let mut children = Vec::new();
        let result = self.perform_block(&node.children, scope, &mut children);
        self.parent = saved;
        result?;
        Ok(children)
    }

    fn perform_node(
        &mut self,
        node: &Node,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        let saved = mem::replace(&mut self.filename, node.filename.clone());
        let result = self.visit(node, scope, out);
        self.filename = saved;
        result.map_err(|mut diag| {
            diag.modify_backtrace(
                BacktraceFrame::at_line(node.line).with_filename(node.filename.as_deref()),
            );
            diag
        })
    }

    fn visit(&mut self, node: &Node, scope: ScopeId, out: &mut Vec<CssNode>) -> Result<Option<Value>> {
        match &node.kind {
            NodeKind::Root => return self.perform_nodes(&node.children, scope, out),
            NodeKind::Rule { selector } => {
                let text = self.interpolate(selector, scope)?;
                let selector = parse_selector(text.trim(), node.line)
                    .map_err(|diag| diag.with_label(node.span, "invalid selector"))?;
                let children = self.nested(node, Parent::Rule, scope)?;
                out.push(output(CssKind::Rule { selector }, node).with_children(children));
            }
            NodeKind::Prop { name, value } => self.visit_prop(node, name, value.as_ref(), scope, out)?,
            NodeKind::Comment { text, silent } => {
                if !*silent {
                    let text = self.interpolate(text, scope)?;
                    let preserved = text.starts_with("/*!");
                    out.push(output(CssKind::Comment { text, preserved }, node));
                }
            }
            NodeKind::Directive {
                name,
                params,
                has_block,
            } => {
                let params = self.interpolate(params, scope)?.trim().to_string();
                let children = self.nested(node, Parent::Directive, scope)?;
                let kind = CssKind::Directive {
                    name: name.clone(),
                    params,
                    has_block: *has_block,
                };
                out.push(output(kind, node).with_children(children));
            }
            NodeKind::Media { query } => {
                let query = self.interpolate(query, scope)?.trim().to_string();
                let children = self.nested(node, Parent::Media, scope)?;
                out.push(output(CssKind::Media { query }, node).with_children(children));
            }
            NodeKind::Charset { name } => {
                out.push(output(CssKind::Charset { name: name.clone() }, node));
            }
            NodeKind::Import {
                target: ImportTarget::Sass(uri),
            } => self.visit_import(node, uri, scope, out)?,
            NodeKind::Import {
                target: ImportTarget::Css(text),
            } => {
                let uri = self.interpolate(text, scope)?.trim().to_string();
                out.push(output(CssKind::Import { uri }, node));
            }
            NodeKind::Variable {
                name,
                expr,
                guarded,
            } => {
                if *guarded && self.env.var(scope, name).is_some() {
                    trace!(name; "variable already defined, skipping !default");
                } else {
                    let value = self.eval(expr, scope)?;
                    self.env.set_var(scope, name, value);
                }
            }
            NodeKind::MixinDef { name, params } => {
                self.define(CallableKind::Mixin, name, params, node, scope);
            }
            NodeKind::Function { name, params } => {
                self.define(CallableKind::Function, name, params, node, scope);
            }
            NodeKind::MixinInclude { name, args } => self.visit_include(node, name, args, scope, out)?,
            NodeKind::Return { expr } => return self.eval(expr, scope).map(Some),
            NodeKind::Extend { selector } => {
                let text = self.interpolate(selector, scope)?;
                let selector = parse_selector(text.trim(), node.line)
                    .map_err(|diag| diag.with_label(node.span, "invalid selector"))?;
                out.push(output(CssKind::Extend { selector }, node));
            }
            NodeKind::If {
                condition,
                else_branch,
            } => {
                let taken = match condition {
                    Some(expr) => self.eval(expr, scope)?.is_truthy(),
                    None => true,
                };
                if taken {
                    return self.perform_block(&node.children, scope, out);
                }
                if let Some(branch) = else_branch {
                    return self.perform_node(branch, scope, out);
                }
            }
            NodeKind::While { condition } => return self.visit_while(node, condition, scope, out),
            NodeKind::For {
                var,
                from,
                to,
                inclusive,
            } => return self.visit_for(node, var, (from, to), *inclusive, scope, out),
            NodeKind::Each { var, list } => return self.visit_each(node, var, list, scope, out),
            NodeKind::Debug { expr } => {
                let value = self.eval(expr, scope)?;
                if !self.session.options().quiet() {
                    info!(line = node.line; "Line {} DEBUG: {}", node.line, message_text(&value));
                }
            }
            NodeKind::Warn { expr } => {
                let value = self.eval(expr, scope)?;
                let mut diag = Diagnostic::warning(message_text(&value))
                    .with_line(node.line)
                    .with_filename(node.filename.as_deref());
                for frame in self.env.stack().iter().rev() {
                    diag.modify_backtrace(BacktraceFrame::at_line(frame.line).with_mixin(&frame.name));
                    diag.add_backtrace(
                        BacktraceFrame::at_line(frame.line).with_filename(frame.filename.as_deref()),
                    );
                }
                self.session.warn(diag);
            }
        }
        Ok(None)
    }

    // ============================================================================
    // Declarations
    // ============================================================================

    fn visit_prop(
        &mut self,
        node: &Node,
        name: &Interpolation,
        value: Option<&Expr>,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<()> {
        let name = self.interpolate(name, scope)?.trim().to_string();
        let value = match value {
            Some(expr) => {
                let value = self.eval(expr, scope)?;
                value
                    .to_css(self.session.options().style())
                    .map_err(|err| expr::value_error(err, expr))?;
                Some(value)
            }
            None => None,
        };
        let children = self.nested(node, Parent::Prop, scope)?;
        out.push(output(CssKind::Prop { name, value }, node).with_children(children));
        Ok(())
    }

    fn define(
        &mut self,
        kind: CallableKind,
        name: &str,
        params: &[Param],
        node: &Node,
        scope: ScopeId,
    ) {
        trace!(name, kind:? = kind; "defining callable");
        self.env.define(
            scope,
            Callable {
                kind,
                name: name.to_string(),
                params: params.to_vec(),
                scope,
                body: node.children.clone(),
            },
        );
    }

    // ============================================================================
    // Mixins
    // ============================================================================

    fn visit_include(
        &mut self,
        node: &Node,
        name: &str,
        args: &CallArgs,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<()> {
        if let Some(cycle) = self.env.include_cycle(name) {
            return Err(include_loop(name, &cycle).with_label(node.span, "included again here"));
        }
        let Some(mixin) = self.env.mixin(scope, name) else {
            return Err(Diagnostic::error(format!("Undefined mixin '{name}'."))
                .with_code(ErrorCode::E301)
                .with_label(node.span, "not defined")
                .with_line(node.line));
        };
        self.check_depth(node.span, node.line)?;
        trace!(name, line = node.line; "including mixin");

        self.env.push_frame(StackFrame {
            kind: CallableKind::Mixin,
            name: name.to_string(),
            line: node.line,
            filename: node.filename.clone(),
        });
        let result = self.include(&mixin, args, node, scope, out);
        self.env.pop_frame();

        result.map_err(|mut diag| {
            diag.modify_backtrace(BacktraceFrame::at_line(node.line).with_mixin(name));
            diag.add_backtrace(
                BacktraceFrame::at_line(node.line).with_filename(node.filename.as_deref()),
            );
            diag
        })
    }

    fn include(
        &mut self,
        mixin: &Rc<Callable>,
        args: &CallArgs,
        node: &Node,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<()> {
        let (positional, keywords) = self.eval_args(args, scope)?;
        let body_scope = self.bind_args(mixin, positional, keywords, node.span, node.line)?;
        let result = self.perform_nodes(&mixin.body, body_scope, out);
        self.env.pop_scope(body_scope);
        result.map(|_| ())
    }

    fn check_depth(&self, span: Span, line: usize) -> Result<()> {
        let limit = self.session.options().max_call_depth();
        if self.env.stack().len() >= limit {
            return Err(Diagnostic::error(format!(
                "Too many nested mixin and function calls (limit {limit})."
            ))
            .with_code(ErrorCode::E305)
            .with_label(span, "call limit reached here")
            .with_line(line));
        }
        Ok(())
    }

    // ============================================================================
    // Control directives
    // ============================================================================

    fn visit_while(
        &mut self,
        node: &Node,
        condition: &Expr,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        let limit = self.session.options().max_loop_iterations();
        self.in_scope(scope, |this, loop_scope| {
            let mut iterations = 0;
            while this.eval(condition, loop_scope)?.is_truthy() {
                iterations += 1;
                if iterations > limit {
                    return Err(loop_limit("@while", limit, node));
                }
                if let Some(value) = this.perform_nodes(&node.children, loop_scope, out)? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        })
    }

    fn visit_for(
        &mut self,
        node: &Node,
        var: &str,
        (from, to): (&Expr, &Expr),
        inclusive: bool,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        let start = integer(self.eval(from, scope)?, from)?;
        let end = integer(self.eval(to, scope)?, to)?
            .coerce(start.numerator_units(), start.denominator_units())
            .map_err(|err| expr::value_error(err, to))?;

        // Bounds may lie far outside i64, so the size check runs in f64.
        let last = if inclusive { end.value() } else { end.value() - 1.0 };
        let limit = self.session.options().max_loop_iterations();
        if last - start.value() + 1.0 > limit as f64 {
            return Err(loop_limit("@for", limit, node));
        }
        let (first, last) = (start.value() as i64, last as i64);
        trace!(var, first, last; "unrolling @for");

        self.in_scope(scope, |this, loop_scope| {
            for i in first..=last {
                let value = Number::new(
                    i as f64,
                    start.numerator_units().to_vec(),
                    start.denominator_units().to_vec(),
                );
                this.env.set_local_var(loop_scope, var, Value::Number(value));
                if let Some(value) = this.perform_nodes(&node.children, loop_scope, out)? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        })
    }

    fn visit_each(
        &mut self,
        node: &Node,
        var: &str,
        list: &Expr,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<Option<Value>> {
        let items = self.eval(list, scope)?.to_items();
        let limit = self.session.options().max_loop_iterations();
        if items.len() > limit {
            return Err(loop_limit("@each", limit, node));
        }
        self.in_scope(scope, |this, loop_scope| {
            for item in items {
                this.env.set_local_var(loop_scope, var, item);
                if let Some(value) = this.perform_nodes(&node.children, loop_scope, out)? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        })
    }

    // ============================================================================
    // Imports
    // ============================================================================

    fn visit_import(
        &mut self,
        node: &Node,
        uri: &str,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<()> {
        let not_found = || {
            Diagnostic::error(format!("File to import not found or unreadable: {uri}."))
                .with_label(node.span, "imported here")
                .with_line(node.line)
        };
        let (id, source) = match self.session.resolve(uri, self.file.as_ref()) {
            Ok(Some(found)) => found,
            Ok(None) => return Err(not_found().with_code(ErrorCode::E500)),
            Err(err) => {
                return Err(not_found()
                    .with_code(ErrorCode::E503)
                    .with_help(err.to_string()));
            }
        };
        if let Err(cycle) = self.session.enter_import(&id) {
            return Err(import_loop(&cycle)
                .with_label(node.span, "imported again here")
                .with_line(node.line));
        }
        debug!(uri, file:% = id; "importing stylesheet");

        let result = self.perform_imported(&id, &source, scope, out);
        self.session.leave_import();
        result.map_err(|mut diag| {
            diag.add_backtrace(
                BacktraceFrame::at_line(node.line).with_filename(node.filename.as_deref()),
            );
            diag
        })
    }

    fn perform_imported(
        &mut self,
        id: &SourceId,
        source: &ImportedSource,
        scope: ScopeId,
        out: &mut Vec<CssNode>,
    ) -> Result<()> {
        self.session
            .add_source(source.canonical.clone(), source.contents.clone());
        let first = |err: SyntaxError| {
            err.into_diagnostics()
                .into_iter()
                .next()
                .unwrap_or_else(|| Diagnostic::error("Invalid stylesheet."))
        };
        let root = parse(&source.contents, source.syntax, Some(source.canonical.as_str()))
            .map_err(first)?;
        check_imported(&root.children, self.parent).map_err(first)?;

        let saved = mem::replace(&mut self.file, Some(id.clone()));
        let result = self.perform_nodes(&root.children, scope, out);
        self.file = saved;
        result.map(|_| ())
    }
}

fn output(kind: CssKind, node: &Node) -> CssNode {
    CssNode::new(kind, node.line, node.filename.clone())
}

/// Text of a `@debug` or `@warn` message: strings lose their quotes.
fn message_text(value: &Value) -> String {
    match value {
        Value::Str(string) => string.text().to_string(),
        other => other.inspect(),
    }
}

fn integer(value: Value, expr: &Expr) -> Result<Number> {
    match value {
        Value::Number(number) if number.is_int() => Ok(number),
        other => Err(Diagnostic::error(format!("{} is not an integer.", other.inspect()))
            .with_code(ErrorCode::E306)
            .with_label(expr.span, "expected an integer")
            .with_line(expr.line)),
    }
}

fn loop_limit(directive: &str, limit: usize, node: &Node) -> Diagnostic {
    Diagnostic::error(format!(
        "{directive} loop exceeded the limit of {limit} iterations."
    ))
    .with_code(ErrorCode::E305)
    .with_label(node.span, "loop starts here")
    .with_line(node.line)
}

/// `cycle` runs from the first inclusion of `name` to `name` again.
fn include_loop(name: &str, cycle: &[String]) -> Diagnostic {
    let mut message = String::from("An @include loop has been found:");
    if cycle.len() == 2 {
        message.push_str(&format!(" {name} includes itself"));
    } else {
        for pair in cycle.windows(2) {
            message.push_str(&format!("\n    {} includes {}", pair[0], pair[1]));
        }
    }
    Diagnostic::error(message).with_code(ErrorCode::E304)
}

fn import_loop(cycle: &[SourceId]) -> Diagnostic {
    let mut message = String::from("An @import loop has been found:");
    if cycle.len() == 2 {
        message.push_str(&format!(" {} imports itself", cycle[0]));
    } else {
        for pair in cycle.windows(2) {
            message.push_str(&format!("\n    {} imports {}", pair[0], pair[1]));
        }
    }
    Diagnostic::error(message).with_code(ErrorCode::E501)
}
