//! The static trees produced by evaluation.
//!
//! Evaluation turns the dynamic tree into a static-source tree: every
//! expression is a [`Value`], every selector a parsed [`CommaSequence`], and
//! control flow, definitions and variables are gone, but rules are still
//! nested. Flattening turns that into a [`Stylesheet`]: rules at the top (or
//! directly inside `@media` and other directives), nested properties joined
//! into dashed names, and `@extend` removed.

use std::sync::Arc;

use sable_core::{selector::CommaSequence, value::Value};

#[derive(Debug, Clone)]
pub enum CssKind {
    Root,
    Rule {
        selector: CommaSequence,
    },
    /// A declaration. `value` is `None` for a property that only groups
    /// nested properties.
    Prop {
        name: String,
        value: Option<Value>,
    },
    Comment {
        /// The full comment including `/*` and `*/`.
        text: String,
        /// `/*!` comments, kept even in compressed output.
        preserved: bool,
    },
    Directive {
        /// The name without `@`.
        name: String,
        params: String,
        has_block: bool,
    },
    Media {
        query: String,
    },
    Charset {
        name: String,
    },
    /// A plain CSS `@import`.
    Import {
        uri: String,
    },
    /// Only present before flattening.
    Extend {
        selector: CommaSequence,
    },
}

/// A node of the static trees.
#[derive(Debug, Clone)]
pub struct CssNode {
    pub kind: CssKind,
    pub children: Vec<CssNode>,
    pub line: usize,
    pub filename: Option<Arc<str>>,
    /// Extra indentation levels in nested output.
    pub tabs: usize,
    /// Last rule of a group; followed by a blank line when rendered.
    pub group_end: bool,
}

impl CssNode {
    pub fn new(kind: CssKind, line: usize, filename: Option<Arc<str>>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            line,
            filename,
            tabs: 0,
            group_end: false,
        }
    }

    pub fn with_children(mut self, children: Vec<CssNode>) -> Self {
        self.children = children;
        self
    }

    /// Whether the node is left out of output rendered in `compressed`
    /// style.
    pub fn is_invisible_when_compressed(&self) -> bool {
        matches!(self.kind, CssKind::Comment { preserved: false, .. })
    }

    pub fn is_rule(&self) -> bool {
        matches!(self.kind, CssKind::Rule { .. })
    }

    pub fn is_prop(&self) -> bool {
        matches!(self.kind, CssKind::Prop { .. })
    }

    pub fn is_media(&self) -> bool {
        matches!(self.kind, CssKind::Media { .. })
    }
}

/// A flattened stylesheet, ready to render.
///
/// Render it with [`Stylesheet::to_css`] or convert it back to source with
/// [`Stylesheet::to_source`].
#[derive(Debug, Clone)]
pub struct Stylesheet {
    root: CssNode,
}

impl Stylesheet {
    pub(crate) fn new(root: CssNode) -> Self {
        Self { root }
    }

    /// The top-level nodes.
    pub fn nodes(&self) -> &[CssNode] {
        &self.root.children
    }

    pub(crate) fn root(&self) -> &CssNode {
        &self.root
    }
}
