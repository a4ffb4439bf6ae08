//! Structural checks run on the dynamic tree before evaluation.
//!
//! Each child is checked against its nearest enclosing non-script parent:
//! control directives, `@include` and `@import` are transparent, so a
//! property inside an `@if` inside a rule counts as being inside the rule.
//! Every violation is reported, not just the first.

use sable_parser::{
    ImportTarget, Node, NodeKind,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, SyntaxError},
};

/// The kind of node a child is nested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Root,
    Rule,
    Prop,
    Directive,
    Media,
    MixinDef,
    Function,
    /// `@if`, `@while`, `@for` and `@each`.
    Control,
    Include,
    Import,
    Other,
}

impl Parent {
    fn of(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Root => Self::Root,
            NodeKind::Rule { .. } => Self::Rule,
            NodeKind::Prop { .. } => Self::Prop,
            NodeKind::Directive { .. } => Self::Directive,
            NodeKind::Media { .. } => Self::Media,
            NodeKind::MixinDef { .. } => Self::MixinDef,
            NodeKind::Function { .. } => Self::Function,
            NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::For { .. }
            | NodeKind::Each { .. } => Self::Control,
            NodeKind::MixinInclude { .. } => Self::Include,
            NodeKind::Import { .. } => Self::Import,
            _ => Self::Other,
        }
    }

    /// Script nodes do not count as parents of their children.
    fn is_script(self) -> bool {
        matches!(self, Self::Control | Self::Include | Self::Import)
    }
}

/// Check a whole stylesheet.
///
/// # Errors
///
/// Returns every nesting violation found.
pub fn check_nesting(root: &Node) -> Result<(), SyntaxError> {
    check_children(&root.children, Parent::Root, Parent::Root)
}

/// Check the top-level nodes of a stylesheet imported inside `parent`.
///
/// # Errors
///
/// Returns every nesting violation found.
pub fn check_imported(nodes: &[Node], parent: Parent) -> Result<(), SyntaxError> {
    check_children(nodes, parent, Parent::Import)
}

fn check_children(nodes: &[Node], parent: Parent, real_parent: Parent) -> Result<(), SyntaxError> {
    let mut checker = CheckNesting {
        collector: DiagnosticCollector::new(),
    };
    checker.visit_all(nodes, parent, real_parent);
    checker.collector.finish().map(|_| ())
}

struct CheckNesting {
    collector: DiagnosticCollector,
}

impl CheckNesting {
    fn visit_all(&mut self, nodes: &[Node], parent: Parent, real_parent: Parent) {
        for child in nodes {
            if let Some((code, message)) = invalid(parent, real_parent, child) {
                self.collector.emit(
                    Diagnostic::error(message)
                        .with_code(code)
                        .with_label(child.span, format!("{} not allowed here", child.kind.describe()))
                        .with_line(child.line)
                        .with_filename(child.filename.as_deref()),
                );
            }
            self.visit(child, parent);
        }
    }

    fn visit(&mut self, node: &Node, parent: Parent) {
        let own = Parent::of(&node.kind);
        let effective = if own.is_script() { parent } else { own };
        self.visit_all(&node.children, effective, own);
        if let NodeKind::If {
            else_branch: Some(branch),
            ..
        } = &node.kind
        {
            self.visit(branch, parent);
        }
    }
}

fn invalid(parent: Parent, real_parent: Parent, child: &Node) -> Option<(ErrorCode, &'static str)> {
    if parent == Parent::Function && !valid_function_child(&child.kind) {
        return Some((
            ErrorCode::E207,
            "Functions can only contain variable declarations and control directives.",
        ));
    }
    if parent == Parent::Prop && !matches!(child.kind, NodeKind::Prop { .. } | NodeKind::Comment { .. }) {
        return Some((
            ErrorCode::E208,
            "Illegal nesting: Only properties may be nested beneath properties.",
        ));
    }

    match &child.kind {
        NodeKind::Charset { .. } if parent != Parent::Root => Some((
            ErrorCode::E201,
            "@charset may only be used at the root of a document.",
        )),
        NodeKind::Extend { .. } if !matches!(parent, Parent::Rule | Parent::MixinDef) => Some((
            ErrorCode::E205,
            "Extend directives may only be used within rules.",
        )),
        NodeKind::Function { .. } if parent != Parent::Root => Some((
            ErrorCode::E202,
            "Functions may only be defined at the root of a document.",
        )),
        NodeKind::MixinDef { .. } if parent != Parent::Root => Some((
            ErrorCode::E202,
            "Mixins may only be defined at the root of a document.",
        )),
        NodeKind::Import { target } => {
            if matches!(
                real_parent,
                Parent::Control | Parent::MixinDef | Parent::Include
            ) {
                Some((
                    ErrorCode::E206,
                    "Import directives may not be used within control directives or mixins.",
                ))
            } else if parent != Parent::Root && matches!(target, ImportTarget::Css(_)) {
                Some((
                    ErrorCode::E206,
                    "CSS import directives may only be used at the root of a document.",
                ))
            } else {
                None
            }
        }
        NodeKind::Prop { .. }
            if !matches!(
                parent,
                Parent::Rule | Parent::Prop | Parent::MixinDef | Parent::Directive | Parent::Media
            ) =>
        {
            Some((
                ErrorCode::E203,
                "Properties are only allowed within rules, directives, or other properties.",
            ))
        }
        NodeKind::Return { .. } if parent != Parent::Function => Some((
            ErrorCode::E204,
            "@return may only be used within a function.",
        )),
        _ => None,
    }
}

fn valid_function_child(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Comment { .. }
            | NodeKind::Debug { .. }
            | NodeKind::Each { .. }
            | NodeKind::For { .. }
            | NodeKind::If { .. }
            | NodeKind::Return { .. }
            | NodeKind::Variable { .. }
            | NodeKind::Warn { .. }
            | NodeKind::While { .. }
    )
}
