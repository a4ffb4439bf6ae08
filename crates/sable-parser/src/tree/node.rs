//! Statement nodes of the dynamic tree.

use std::sync::Arc;

use crate::{
    span::Span,
    tree::expr::{CallArgs, Expr, Interpolation, Param},
};

/// What an `@import` refers to.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    /// A stylesheet to load and evaluate in place.
    Sass(String),
    /// A plain CSS import emitted as-is, such as `url(foo.css)` or
    /// `"foo.css" screen`.
    Css(Interpolation),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Rule {
        selector: Interpolation,
    },
    /// A property declaration. `value` is `None` for a namespace property
    /// such as `font: { family: x }`.
    Prop {
        name: Interpolation,
        value: Option<Expr>,
    },
    Comment {
        /// The full comment including its delimiters.
        text: Interpolation,
        /// `//` comments, dropped from the output.
        silent: bool,
    },
    /// An `@` rule the compiler does not interpret.
    Directive {
        /// The name without `@`.
        name: String,
        params: Interpolation,
        has_block: bool,
    },
    Media {
        query: Interpolation,
    },
    Charset {
        name: String,
    },
    Import {
        target: ImportTarget,
    },
    Variable {
        name: String,
        expr: Expr,
        /// `!default`: only assign when undefined.
        guarded: bool,
    },
    MixinDef {
        name: String,
        params: Vec<Param>,
    },
    MixinInclude {
        name: String,
        args: CallArgs,
    },
    Function {
        name: String,
        params: Vec<Param>,
    },
    Return {
        expr: Expr,
    },
    Extend {
        selector: Interpolation,
    },
    /// `@if`. A `condition` of `None` is a bare `@else`.
    If {
        condition: Option<Expr>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Expr,
    },
    For {
        var: String,
        from: Expr,
        to: Expr,
        /// `through` rather than `to`.
        inclusive: bool,
    },
    Each {
        var: String,
        list: Expr,
    },
    Debug {
        expr: Expr,
    },
    Warn {
        expr: Expr,
    },
}

impl NodeKind {
    /// A short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Rule { .. } => "rule",
            NodeKind::Prop { .. } => "property",
            NodeKind::Comment { .. } => "comment",
            NodeKind::Directive { .. } => "directive",
            NodeKind::Media { .. } => "@media",
            NodeKind::Charset { .. } => "@charset",
            NodeKind::Import { .. } => "@import",
            NodeKind::Variable { .. } => "variable declaration",
            NodeKind::MixinDef { .. } => "@mixin",
            NodeKind::MixinInclude { .. } => "@include",
            NodeKind::Function { .. } => "@function",
            NodeKind::Return { .. } => "@return",
            NodeKind::Extend { .. } => "@extend",
            NodeKind::If { .. } => "@if",
            NodeKind::While { .. } => "@while",
            NodeKind::For { .. } => "@for",
            NodeKind::Each { .. } => "@each",
            NodeKind::Debug { .. } => "@debug",
            NodeKind::Warn { .. } => "@warn",
        }
    }
}

/// A node of the dynamic tree produced by either front-end.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub line: usize,
    pub span: Span,
    pub filename: Option<Arc<str>>,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, span: Span) -> Self {
        Self {
            kind,
            children: Vec::new(),
            line,
            span,
            filename: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Whether the node opened a block, even an empty one.
    pub fn has_block(&self) -> bool {
        match &self.kind {
            NodeKind::Directive { has_block, .. } => *has_block,
            NodeKind::Comment { .. }
            | NodeKind::Charset { .. }
            | NodeKind::Import { .. }
            | NodeKind::Variable { .. }
            | NodeKind::MixinInclude { .. }
            | NodeKind::Return { .. }
            | NodeKind::Extend { .. }
            | NodeKind::Debug { .. }
            | NodeKind::Warn { .. } => false,
            NodeKind::Prop { .. } => !self.children.is_empty(),
            _ => true,
        }
    }

    /// Set the filename on this node and all its descendants.
    pub fn set_filename(&mut self, filename: Option<Arc<str>>) {
        if let NodeKind::If {
            else_branch: Some(branch),
            ..
        } = &mut self.kind
        {
            branch.set_filename(filename.clone());
        }
        for child in &mut self.children {
            child.set_filename(filename.clone());
        }
        self.filename = filename;
    }

    /// Attach an `@else` branch to the end of this `@if` chain.
    ///
    /// Returns the branch back if this node is not an `@if`, or if the chain
    /// already ends in a bare `@else`.
    pub fn add_else(&mut self, branch: Node) -> Result<(), Node> {
        match &mut self.kind {
            NodeKind::If {
                else_branch: Some(next),
                ..
            } => next.add_else(branch),
            NodeKind::If {
                condition: Some(_),
                else_branch,
            } => {
                *else_branch = Some(Box::new(branch));
                Ok(())
            }
            _ => Err(branch),
        }
    }
}
