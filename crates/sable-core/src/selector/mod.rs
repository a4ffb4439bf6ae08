//! Selector model.
//!
//! A [`CommaSequence`] is an "or" of [`Sequence`]s. A sequence alternates
//! compound selectors ([`SimpleSequence`]) with explicit combinators; two
//! adjacent compounds are joined by the descendant combinator. A compound is
//! an optional base (element, universal or `&`) plus a set of other
//! [`Simple`] selectors whose order does not affect equality.

mod extend;
mod unify;

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

use indexmap::IndexSet;

use crate::{error::SelectorError, style::OutputStyle};

pub use extend::{ExtendMap, lcs, paths};

/// Whether a pseudo selector uses one colon or two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoKind {
    Class,
    Element,
}

/// A single simple selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Simple {
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `name` or `ns|name`
    Element {
        name: String,
        namespace: Option<String>,
    },
    /// `*` or `ns|*`
    Universal { namespace: Option<String> },
    /// `&`
    Parent,
    /// `[ns|name op value]`
    Attribute {
        name: String,
        namespace: Option<String>,
        op: Option<String>,
        value: Option<String>,
    },
    /// `:name`, `::name` or `:name(arg)`
    Pseudo {
        kind: PseudoKind,
        name: String,
        arg: Option<String>,
    },
    /// A pseudo class whose argument is a selector, such as `:not(.a)`.
    SelectorPseudoClass {
        name: String,
        selector: CommaSequence,
    },
}

impl Simple {
    /// Whether this selector belongs in the base slot of a compound.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            Self::Element { .. } | Self::Universal { .. } | Self::Parent
        )
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self, Self::Pseudo { .. } | Self::SelectorPseudoClass { .. })
    }

    pub fn is_pseudo_element(&self) -> bool {
        matches!(
            self,
            Self::Pseudo {
                kind: PseudoKind::Element,
                ..
            }
        )
    }

    pub fn to_css(&self, style: OutputStyle) -> String {
        match self {
            Self::Class(name) => format!(".{name}"),
            Self::Id(name) => format!("#{name}"),
            Self::Element { name, namespace } => with_namespace(namespace.as_deref(), name),
            Self::Universal { namespace } => with_namespace(namespace.as_deref(), "*"),
            Self::Parent => "&".to_string(),
            Self::Attribute {
                name,
                namespace,
                op,
                value,
            } => {
                let mut out = format!("[{}", with_namespace(namespace.as_deref(), name));
                if let (Some(op), Some(value)) = (op, value) {
                    out.push_str(op);
                    out.push_str(value);
                }
                out.push(']');
                out
            }
            Self::Pseudo { kind, name, arg } => {
                let colons = match kind {
                    PseudoKind::Class => ":",
                    PseudoKind::Element => "::",
                };
                match arg {
                    Some(arg) => format!("{colons}{name}({arg})"),
                    None => format!("{colons}{name}"),
                }
            }
            Self::SelectorPseudoClass { name, selector } => {
                format!(":{name}({})", selector.to_css(style))
            }
        }
    }
}

fn with_namespace(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}|{name}"),
        None => name.to_string(),
    }
}

impl fmt::Display for Simple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(OutputStyle::Nested))
    }
}

/// A compound selector: an optional base plus an unordered set of simples.
#[derive(Debug, Clone, Default)]
pub struct SimpleSequence {
    base: Option<Simple>,
    rest: IndexSet<Simple>,
}

impl SimpleSequence {
    /// Build a compound from simples in source order.
    ///
    /// The first base selector found fills the base slot.
    pub fn new(members: impl IntoIterator<Item = Simple>) -> Self {
        let mut sequence = Self::default();
        for simple in members {
            if simple.is_base() && sequence.base.is_none() && sequence.rest.is_empty() {
                sequence.base = Some(simple);
            } else {
                sequence.rest.insert(simple);
            }
        }
        sequence
    }

    pub fn base(&self) -> Option<&Simple> {
        self.base.as_ref()
    }

    pub fn rest(&self) -> &IndexSet<Simple> {
        &self.rest
    }

    /// Base followed by the other simples, in insertion order.
    pub fn members(&self) -> Vec<Simple> {
        self.base.iter().chain(&self.rest).cloned().collect()
    }

    pub fn has_parent_ref(&self) -> bool {
        matches!(self.base, Some(Simple::Parent))
    }

    /// Whether every element matched by `other` is matched by `self`.
    pub fn is_superselector(&self, other: &SimpleSequence) -> bool {
        (self.base.is_none() || self.base == other.base) && self.rest.is_subset(&other.rest)
    }

    pub fn to_css(&self, style: OutputStyle) -> String {
        self.base
            .iter()
            .chain(&self.rest)
            .map(|simple| simple.to_css(style))
            .collect()
    }

    /// Replace a leading `&` with the parent sequence.
    fn resolve_parent_refs(&self, parent: &Sequence) -> Result<Vec<SeqMember>, SelectorError> {
        if !self.has_parent_ref() {
            return Ok(vec![SeqMember::Compound(self.clone())]);
        }
        if self.rest.is_empty() {
            return Ok(parent.members.clone());
        }
        let Some((SeqMember::Compound(last), init)) = parent.members.split_last() else {
            return Err(SelectorError::InvalidParent(
                parent.to_css(OutputStyle::Nested),
            ));
        };
        let merged = SimpleSequence::new(last.members().into_iter().chain(self.rest.iter().cloned()));
        let mut members = init.to_vec();
        members.push(SeqMember::Compound(merged));
        Ok(members)
    }
}

impl PartialEq for SimpleSequence {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.rest == other.rest
    }
}

impl Eq for SimpleSequence {}

impl Hash for SimpleSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        let combined = self.rest.iter().fold(0u64, |acc, simple| {
            let mut hasher = DefaultHasher::new();
            simple.hash(&mut hasher);
            acc ^ hasher.finish()
        });
        combined.hash(state);
        self.rest.len().hash(state);
    }
}

impl fmt::Display for SimpleSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(OutputStyle::Nested))
    }
}

/// An explicit combinator between compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    FollowingSibling,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => ">",
            Self::NextSibling => "+",
            Self::FollowingSibling => "~",
        }
    }
}

/// One element of a [`Sequence`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeqMember {
    Compound(SimpleSequence),
    Combinator(Combinator),
}

impl SeqMember {
    pub fn as_compound(&self) -> Option<&SimpleSequence> {
        match self {
            Self::Compound(compound) => Some(compound),
            Self::Combinator(_) => None,
        }
    }

    pub fn as_combinator(&self) -> Option<Combinator> {
        match self {
            Self::Combinator(combinator) => Some(*combinator),
            Self::Compound(_) => None,
        }
    }
}

/// A complex selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Sequence {
    members: Vec<SeqMember>,
}

impl Sequence {
    pub fn new(members: Vec<SeqMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[SeqMember] {
        &self.members
    }

    pub fn has_parent_ref(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.as_compound().is_some_and(SimpleSequence::has_parent_ref))
    }

    /// The final compound, if the sequence does not end in a combinator.
    pub fn last_compound(&self) -> Option<&SimpleSequence> {
        self.members.last().and_then(SeqMember::as_compound)
    }

    /// Whether this single-compound sequence is a superselector of `compound`.
    pub fn is_superselector(&self, compound: &SimpleSequence) -> bool {
        match self.members.as_slice() {
            [SeqMember::Compound(only)] => only.is_superselector(compound),
            _ => false,
        }
    }

    /// Substitute `parent` for every `&`, or prefix it as a descendant when
    /// the sequence has no `&`.
    pub fn resolve_parent_refs(&self, parent: &Sequence) -> Result<Sequence, SelectorError> {
        let mut resolved = Vec::new();
        if !self.has_parent_ref() {
            resolved.extend(parent.members.iter().cloned());
            resolved.extend(self.members.iter().cloned());
            return Ok(Sequence::new(resolved));
        }
        for member in &self.members {
            match member {
                SeqMember::Compound(compound) => {
                    resolved.extend(compound.resolve_parent_refs(parent)?);
                }
                SeqMember::Combinator(_) => resolved.push(member.clone()),
            }
        }
        Ok(Sequence::new(resolved))
    }

    pub fn to_css(&self, style: OutputStyle) -> String {
        let mut out = String::new();
        for (i, member) in self.members.iter().enumerate() {
            match member {
                SeqMember::Compound(compound) => {
                    let after_combinator = i > 0
                        && self.members[i - 1].as_combinator().is_some();
                    if i > 0 && !(after_combinator && style.is_compressed()) {
                        out.push(' ');
                    }
                    out.push_str(&compound.to_css(style));
                }
                SeqMember::Combinator(combinator) => {
                    if i > 0 && !style.is_compressed() {
                        out.push(' ');
                    }
                    out.push_str(combinator.as_str());
                }
            }
        }
        out
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(OutputStyle::Nested))
    }
}

/// A selector list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CommaSequence {
    members: Vec<Sequence>,
}

impl CommaSequence {
    pub fn new(members: Vec<Sequence>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Sequence] {
        &self.members
    }

    pub fn has_parent_ref(&self) -> bool {
        self.members.iter().any(Sequence::has_parent_ref)
    }

    /// Resolve `&` against the enclosing rule's selector.
    ///
    /// Each parent branch is combined with each child branch, parent-major.
    ///
    /// # Errors
    ///
    /// Fails when `&` appears without a parent, or when the parent ends in a
    /// combinator and `&` carries a suffix.
    pub fn resolve_parent_refs(
        &self,
        parent: Option<&CommaSequence>,
    ) -> Result<CommaSequence, SelectorError> {
        let Some(parent) = parent else {
            if self.has_parent_ref() {
                return Err(SelectorError::ParentAtBaseLevel);
            }
            return Ok(self.clone());
        };
        let mut members = Vec::with_capacity(parent.members.len() * self.members.len());
        for parent_seq in &parent.members {
            for seq in &self.members {
                members.push(seq.resolve_parent_refs(parent_seq)?);
            }
        }
        Ok(CommaSequence::new(members))
    }

    pub fn to_css(&self, style: OutputStyle) -> String {
        self.members
            .iter()
            .map(|seq| seq.to_css(style))
            .collect::<Vec<_>>()
            .join(style.comma_separator())
    }
}

impl fmt::Display for CommaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(OutputStyle::Nested))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn class(name: &str) -> Simple {
        Simple::Class(name.to_string())
    }

    pub fn element(name: &str) -> Simple {
        Simple::Element {
            name: name.to_string(),
            namespace: None,
        }
    }

    pub fn compound(members: Vec<Simple>) -> SeqMember {
        SeqMember::Compound(SimpleSequence::new(members))
    }

    pub fn seq(members: Vec<SeqMember>) -> Sequence {
        Sequence::new(members)
    }
}

#[cfg(test)]
mod tests {
    use super::{test_support::*, *};

    #[test]
    fn test_compound_equality_ignores_order() {
        let a = SimpleSequence::new(vec![class("a"), class("b")]);
        let b = SimpleSequence::new(vec![class("b"), class("a")]);
        assert_eq!(a, b);

        let mut hasher_a = DefaultHasher::new();
        a.hash(&mut hasher_a);
        let mut hasher_b = DefaultHasher::new();
        b.hash(&mut hasher_b);
        assert_eq!(hasher_a.finish(), hasher_b.finish());
    }

    #[test]
    fn test_render_sequence() {
        let selector = seq(vec![
            compound(vec![element("a"), class("x")]),
            SeqMember::Combinator(Combinator::Child),
            compound(vec![class("b")]),
            compound(vec![Simple::Id("c".to_string())]),
        ]);
        assert_eq!(selector.to_css(OutputStyle::Nested), "a.x > .b #c");
        assert_eq!(selector.to_css(OutputStyle::Compressed), "a.x>.b #c");
    }

    #[test]
    fn test_resolve_parent_as_descendant() {
        let parent = CommaSequence::new(vec![
            seq(vec![compound(vec![class("a")])]),
            seq(vec![compound(vec![class("b")])]),
        ]);
        let child = CommaSequence::new(vec![seq(vec![compound(vec![class("c")])])]);
        let resolved = child.resolve_parent_refs(Some(&parent)).unwrap();
        assert_eq!(resolved.to_css(OutputStyle::Nested), ".a .c, .b .c");
    }

    #[test]
    fn test_resolve_parent_suffix() {
        let parent = CommaSequence::new(vec![seq(vec![
            compound(vec![class("a")]),
            compound(vec![element("p")]),
        ])]);
        let child = CommaSequence::new(vec![seq(vec![compound(vec![
            Simple::Parent,
            Simple::Pseudo {
                kind: PseudoKind::Class,
                name: "hover".to_string(),
                arg: None,
            },
        ])])]);
        let resolved = child.resolve_parent_refs(Some(&parent)).unwrap();
        assert_eq!(resolved.to_css(OutputStyle::Nested), ".a p:hover");
    }

    #[test]
    fn test_parent_at_base_level() {
        let child = CommaSequence::new(vec![seq(vec![compound(vec![Simple::Parent])])]);
        assert_eq!(
            child.resolve_parent_refs(None),
            Err(SelectorError::ParentAtBaseLevel)
        );
    }

    #[test]
    fn test_superselector() {
        let general = SimpleSequence::new(vec![class("a")]);
        let specific = SimpleSequence::new(vec![element("p"), class("a"), class("b")]);
        assert!(general.is_superselector(&specific));
        assert!(!specific.is_superselector(&general));
    }
}
