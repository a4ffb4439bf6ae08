//! Applying `@extend` to the flattened stylesheet.
//!
//! Flattening records every `@extend` in an [`Extensions`] table instead of
//! emitting it. Once the whole tree is flat, every rule's selector is run
//! through [`CommaSequence::do_extend`] against that table. Requests that
//! matched no selector anywhere are reported as warnings.
//!
//! [`CommaSequence::do_extend`]: sable_core::selector::CommaSequence::do_extend

use std::{collections::HashSet, sync::Arc};

use log::{debug, trace};

use sable_core::{
    selector::{ExtendMap, Sequence, SimpleSequence},
    style::OutputStyle,
};
use sable_parser::{Diagnostic, ErrorCode};

use crate::{
    session::Session,
    stylesheet::{CssKind, CssNode},
};

#[derive(Debug)]
struct Request {
    index: usize,
    extender: String,
    target: String,
    line: usize,
    filename: Option<Arc<str>>,
}

/// The `@extend` requests of one stylesheet.
#[derive(Debug, Default)]
pub(crate) struct Extensions {
    map: ExtendMap,
    requests: Vec<Request>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Record that `extender` extends every selector containing `target`.
    pub fn add(
        &mut self,
        target: &SimpleSequence,
        extender: &Sequence,
        line: usize,
        filename: Option<Arc<str>>,
    ) {
        let Some(index) = self.map.insert(target.members(), extender.clone()) else {
            return;
        };
        trace!(
            target:% = target.to_css(OutputStyle::Nested),
            extender:% = extender;
            "recorded extend"
        );
        self.requests.push(Request {
            index,
            extender: extender.to_string(),
            target: target.to_css(OutputStyle::Nested),
            line,
            filename,
        });
    }

    /// Extend the selector of every rule under `root`.
    pub fn apply(&self, root: &mut CssNode, session: &mut Session<'_>) {
        if self.is_empty() {
            return;
        }
        debug!(extends = self.requests.len(); "applying extends");
        let mut matched = HashSet::new();
        self.extend_node(root, &mut matched);

        for request in self.requests.iter().filter(|r| !matched.contains(&r.index)) {
            session.warn(
                Diagnostic::warning(format!(
                    "\"{}\" failed to @extend \"{}\". The selector \"{}\" was not found.",
                    request.extender, request.target, request.target
                ))
                .with_code(ErrorCode::E401)
                .with_line(request.line)
                .with_filename(request.filename.as_deref()),
            );
        }
    }

    fn extend_node(&self, node: &mut CssNode, matched: &mut HashSet<usize>) {
        if let CssKind::Rule { selector } = &mut node.kind {
            let extended = selector.do_extend(&self.map, matched);
            if extended != *selector {
                trace!(from:% = selector, to:% = extended; "extended selector");
            }
            *selector = extended;
        }
        for child in &mut node.children {
            self.extend_node(child, matched);
        }
    }
}
