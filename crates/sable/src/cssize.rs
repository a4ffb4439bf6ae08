//! Flattening of the static-source tree.
//!
//! [`cssize`] turns the nested output of evaluation into the static-CSS
//! tree:
//!
//! - rules nested in rules become siblings, with `&` resolved against the
//!   enclosing selector;
//! - `@media` inside a rule is hoisted above it, wrapping a copy of the
//!   rule, and nested queries are joined with `and`;
//! - nested properties are joined into dashed names;
//! - `@extend` is removed and recorded in an [`Extensions`] table.

use std::sync::Arc;

use log::{debug, trace};

use sable_core::{
    selector::{CommaSequence, SeqMember},
    style::OutputStyle,
};
use sable_parser::{BacktraceFrame, Diagnostic, ErrorCode};

use crate::{
    extend::Extensions,
    stylesheet::{CssKind, CssNode},
};

type Result<T> = std::result::Result<T, Diagnostic>;

/// Flatten `root` for rendering in `style`.
///
/// # Errors
///
/// Fails on a misplaced `&`, an invalid `@extend` or a property without a
/// value.
pub(crate) fn cssize(root: CssNode, style: OutputStyle) -> Result<(CssNode, Extensions)> {
    debug!(style:% = style; "flattening stylesheet");
    let mut cssize = Cssize {
        style,
        extensions: Extensions::new(),
        charset_seen: false,
    };
    let CssNode {
        kind,
        children,
        line,
        filename,
        ..
    } = root;
    let children = cssize.visit_children(children, &Context::Root)?;
    let root = CssNode::new(kind, line, filename).with_children(children);
    Ok((root, cssize.extensions))
}

/// The node a child is flattened under.
enum Context {
    Root,
    Rule {
        selector: CommaSequence,
        line: usize,
        filename: Option<Arc<str>>,
        tabs: usize,
    },
    Prop {
        name: String,
        tabs: usize,
        has_value: bool,
    },
    Media,
    Other,
}

struct Cssize {
    style: OutputStyle,
    extensions: Extensions,
    charset_seen: bool,
}

impl Cssize {
    fn visit_children(&mut self, children: Vec<CssNode>, context: &Context) -> Result<Vec<CssNode>> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let line = child.line;
            let filename = child.filename.clone();
            let flattened = self.visit(child, context).map_err(|mut diag| {
                diag.modify_backtrace(
                    BacktraceFrame::at_line(line).with_filename(filename.as_deref()),
                );
                diag
            })?;
            out.extend(flattened);
        }
        Ok(out)
    }

    fn visit(&mut self, node: CssNode, context: &Context) -> Result<Vec<CssNode>> {
        match &node.kind {
            CssKind::Rule { .. } => self.visit_rule(node, context),
            CssKind::Media { .. } => self.visit_media(node, context),
            CssKind::Prop { .. } => self.visit_prop(node, context),
            CssKind::Extend { .. } => self.visit_extend(node, context),
            CssKind::Charset { .. } => {
                if self.charset_seen {
                    trace!("dropping repeated @charset");
                    return Ok(Vec::new());
                }
                self.charset_seen = true;
                Ok(vec![node])
            }
            CssKind::Directive { .. } => {
                let mut node = node;
                let children = std::mem::take(&mut node.children);
                node.children = self.visit_children(children, &Context::Other)?;
                Ok(vec![node])
            }
            CssKind::Root | CssKind::Comment { .. } | CssKind::Import { .. } => Ok(vec![node]),
        }
    }

    // ============================================================================
    // Rules
    // ============================================================================

    fn visit_rule(&mut self, mut node: CssNode, context: &Context) -> Result<Vec<CssNode>> {
        let CssKind::Rule { selector } = &node.kind else {
            return Ok(vec![node]);
        };
        let parent = match context {
            Context::Rule { selector, .. } => Some(selector),
            _ => None,
        };
        let resolved = selector.resolve_parent_refs(parent).map_err(|err| {
            Diagnostic::error(err.to_string())
                .with_code(ErrorCode::E308)
                .with_line(node.line)
        })?;
        trace!(selector:% = resolved; "resolved rule");

        let rule_context = Context::Rule {
            selector: resolved.clone(),
            line: node.line,
            filename: node.filename.clone(),
            tabs: node.tabs,
        };
        node.kind = CssKind::Rule { selector: resolved };
        let children = std::mem::take(&mut node.children);
        let children = self.visit_children(children, &rule_context)?;

        let (mut rules, props): (Vec<_>, Vec<_>) = children
            .into_iter()
            .partition(|child| child.is_rule() || child.is_media());
        let props: Vec<_> = props
            .into_iter()
            .filter(|child| !(self.style.is_compressed() && child.is_invisible_when_compressed()))
            .collect();

        if !props.is_empty() {
            node.children = props;
            if self.style == OutputStyle::Nested {
                for rule in &mut rules {
                    rule.tabs += 1;
                }
            }
            rules.insert(0, node);
        }
        if !matches!(context, Context::Rule { .. }) {
            if let Some(last) = rules.last_mut() {
                last.group_end = true;
            }
        }
        Ok(rules)
    }

    fn visit_media(&mut self, mut node: CssNode, context: &Context) -> Result<Vec<CssNode>> {
        let children = std::mem::take(&mut node.children);
        if let Context::Rule {
            selector,
            line,
            filename,
            tabs,
        } = context
        {
            let mut wrapper = CssNode::new(
                CssKind::Rule {
                    selector: selector.clone(),
                },
                *line,
                filename.clone(),
            )
            .with_children(children);
            wrapper.tabs = *tabs;
            node.children = self.visit(wrapper, &Context::Media)?;
            // The enclosing rule decides where the group ends.
            if let Some(last) = node.children.last_mut() {
                last.group_end = false;
            }
        } else {
            node.children = self.visit_children(children, &Context::Media)?;
        }

        let CssKind::Media { query } = &node.kind else {
            return Ok(vec![node]);
        };
        let query = query.clone();
        let (mut media, rest): (Vec<_>, Vec<_>) =
            node.children.into_iter().partition(CssNode::is_media);
        node.children = rest;
        for inner in &mut media {
            if let CssKind::Media { query: inner_query } = &mut inner.kind {
                *inner_query = format!("{query} and {inner_query}");
            }
        }

        let mut out = Vec::with_capacity(media.len() + 1);
        if !node.children.is_empty() {
            out.push(node);
        }
        out.extend(media);
        Ok(out)
    }

    // ============================================================================
    // Properties
    // ============================================================================

    fn visit_prop(&mut self, mut node: CssNode, context: &Context) -> Result<Vec<CssNode>> {
        let CssKind::Prop { name, value } = &mut node.kind else {
            return Ok(vec![node]);
        };
        if let Context::Prop {
            name: parent_name,
            tabs,
            has_value,
        } = context
        {
            *name = format!("{parent_name}-{name}");
            if self.style == OutputStyle::Nested {
                node.tabs = tabs + usize::from(*has_value);
            }
        }
        let has_value = value
            .as_ref()
            .is_some_and(|v| v.to_css(self.style).is_ok_and(|text| !text.is_empty()));
        let prop_context = Context::Prop {
            name: name.clone(),
            tabs: node.tabs,
            has_value,
        };

        let children = std::mem::take(&mut node.children);
        let mut result = self.visit_children(children, &prop_context)?;
        if has_value || result.is_empty() {
            if !has_value {
                return Err(Diagnostic::error(format!(
                    "Invalid property: \"{name}: \" (no value)."
                ))
                .with_code(ErrorCode::E306)
                .with_line(node.line));
            }
            result.insert(0, node);
        }
        Ok(result)
    }

    // ============================================================================
    // Extend
    // ============================================================================

    fn visit_extend(&mut self, node: CssNode, context: &Context) -> Result<Vec<CssNode>> {
        let CssKind::Extend { selector } = &node.kind else {
            return Ok(vec![node]);
        };
        let Context::Rule {
            selector: parent, ..
        } = context
        else {
            return Err(
                Diagnostic::error("Extend directives may only be used within rules.")
                    .with_code(ErrorCode::E205)
                    .with_line(node.line),
            );
        };
        let extend_error = |message: String| {
            Diagnostic::error(message)
                .with_code(ErrorCode::E400)
                .with_line(node.line)
        };

        for seq in selector.members() {
            let target = match seq.members() {
                [SeqMember::Compound(compound)] => compound,
                [_] => {
                    return Err(extend_error(format!("Can't extend {seq}: invalid selector")));
                }
                _ => {
                    return Err(extend_error(format!(
                        "Can't extend {seq}: can't extend nested selectors"
                    )));
                }
            };
            for extender in parent.members() {
                if extender.last_compound().is_none() {
                    return Err(extend_error(format!("{extender} can't extend: invalid selector")));
                }
                self.extensions
                    .add(target, extender, node.line, node.filename.clone());
            }
        }
        Ok(Vec::new())
    }
}
