//! The brace-delimited front-end.

use log::debug;

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    scanner::Scanner,
    span::{LineIndex, Span},
    stmt::{self, at_statement_end},
    tree::{Node, NodeKind},
};

use sable_core::style::Syntax;

const NESTED_PROPERTY_SPACE: &str = "Invalid CSS: a space is required between a property and its definition when it has other properties nested beneath it.";

pub(crate) struct ScssParser<'src> {
    s: Scanner<'src>,
}

impl<'src> ScssParser<'src> {
    pub fn new(src: &'src str, lines: &'src LineIndex) -> Self {
        Self {
            s: Scanner::new(src, lines, 0, src.len()),
        }
    }

    pub fn parse(mut self) -> Result<Node> {
        let children = self.block_contents()?;
        self.s.skip_whitespace();
        if !self.s.is_done() {
            return Err(self.s.expected("selector or at-rule"));
        }
        debug!(statements = children.len(); "parsed brace-syntax stylesheet");
        Ok(Node::new(NodeKind::Root, 1, Span::new(0..self.s.pos())).with_children(children))
    }

    /// Statements up to a `}` or the end of input.
    fn block_contents(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        self.comments(&mut nodes)?;
        loop {
            let children = self.block_child()?;
            let has_block = children.last().is_some_and(Node::has_block);
            nodes.extend(children);
            self.s.skip_whitespace_and_silent_comments();
            if !(self.s.eat(";") || has_block) {
                break;
            }
            self.comments(&mut nodes)?;
        }
        Ok(nodes)
    }

    /// Turn comments between statements into nodes.
    fn comments(&mut self, nodes: &mut Vec<Node>) -> Result<()> {
        loop {
            self.s.skip_whitespace();
            if self.s.starts_with("/*") {
                nodes.push(stmt::loud_comment(&mut self.s)?);
            } else if self.s.starts_with("//") {
                nodes.push(stmt::silent_comment(&mut self.s));
            } else {
                return Ok(());
            }
        }
    }

    /// `{ statements }`, returning the statements.
    fn block(&mut self) -> Result<Vec<Node>> {
        self.s.skip_whitespace();
        if !self.s.eat("{") {
            return Err(self.s.expected("\"{\""));
        }
        let children = self.block_contents()?;
        self.s.skip_whitespace();
        if !self.s.eat("}") {
            return Err(self.s.expected("\"}\""));
        }
        Ok(children)
    }

    fn block_child(&mut self) -> Result<Vec<Node>> {
        self.s.skip_whitespace();
        match self.s.peek_char() {
            None | Some('}' | ';') => Ok(Vec::new()),
            Some('$') => Ok(vec![stmt::variable(&mut self.s, Syntax::Scss)?]),
            Some('@') => self.directive(),
            Some(_) => self.declaration_or_ruleset().map(|node| vec![node]),
        }
    }

    fn directive(&mut self) -> Result<Vec<Node>> {
        let mut nodes = stmt::directive(&mut self.s)?;
        let Some(node) = nodes.last_mut() else {
            return Ok(nodes);
        };
        match &node.kind {
            NodeKind::Directive { .. } => {
                self.s.skip_whitespace();
                if self.s.starts_with("{") {
                    node.children = self.block()?;
                    if let NodeKind::Directive { has_block, .. } = &mut node.kind {
                        *has_block = true;
                    }
                }
            }
            NodeKind::Media { .. }
            | NodeKind::MixinDef { .. }
            | NodeKind::Function { .. }
            | NodeKind::While { .. }
            | NodeKind::For { .. }
            | NodeKind::Each { .. } => node.children = self.block()?,
            NodeKind::If { .. } => {
                node.children = self.block()?;
                self.else_chain(node)?;
            }
            _ => {}
        }
        if let Some(node) = nodes.last_mut() {
            node.span = Span::new(node.span.start()..self.s.pos());
        }
        Ok(nodes)
    }

    /// Attach any `@else` blocks that follow an `@if`.
    fn else_chain(&mut self, node: &mut Node) -> Result<()> {
        loop {
            let before = self.s.pos();
            self.s.skip_whitespace_and_silent_comments();
            let start = self.s.pos();
            let line = self.s.line();
            if !(self.s.eat("@") && self.s.eat_keyword("else")) {
                self.s.set_pos(before);
                return Ok(());
            }
            let mut branch = stmt::else_header(&mut self.s, start, line)?;
            branch.children = self.block()?;
            if let Err(branch) = node.add_else(branch) {
                return Err(Diagnostic::error("@else must come after @if.")
                    .with_code(ErrorCode::E106)
                    .with_line(branch.line)
                    .with_label(branch.span, "misplaced @else"));
            }
        }
    }

    /// A declaration, or a ruleset if the text does not parse as one.
    fn declaration_or_ruleset(&mut self) -> Result<Node> {
        let start = self.s.pos();
        let mut prefer_declaration_error = false;
        let declaration_err = match self.declaration(&mut prefer_declaration_error) {
            Ok(node) => return Ok(node),
            Err(err) => err,
        };
        self.s.set_pos(start);
        match self.ruleset() {
            Ok(node) => Ok(node),
            Err(_) if prefer_declaration_error => Err(declaration_err),
            Err(err) => Err(err),
        }
    }

    /// `name: value`, optionally followed by a block of nested properties.
    ///
    /// Sets `prefer_error` once the text can no longer be a selector, so
    /// `color: ;` reports a missing value rather than a missing `{`.
    fn declaration(&mut self, prefer_error: &mut bool) -> Result<Node> {
        let start = self.s.pos();
        let line = self.s.line();
        let Some(name) = stmt::property_name(&mut self.s)? else {
            return Err(self.s.expected("property name"));
        };
        self.s.skip_whitespace();
        if !self.s.eat(":") {
            return Err(self.s.expected("\":\""));
        }
        let space = self.s.peek_char().is_some_and(char::is_whitespace);
        *prefer_error = space || !self.s.peek_char().is_some_and(crate::scanner::is_name_start);

        let value = stmt::property_value(&mut self.s)?;
        self.s.skip_whitespace();
        let children = if self.s.starts_with("{") {
            if !space {
                return Err(self.s.error(ErrorCode::E105, NESTED_PROPERTY_SPACE));
            }
            self.block()?
        } else if value.is_none() {
            return Err(self.s.expected("expression (e.g. 1px, bold)"));
        } else if !(self.s.starts_with(";") || self.s.starts_with("}")) {
            return Err(self.s.expected("\";\""));
        } else {
            Vec::new()
        };
        Ok(
            Node::new(NodeKind::Prop { name, value }, line, self.s.span_from(start))
                .with_children(children),
        )
    }

    fn ruleset(&mut self) -> Result<Node> {
        let start = self.s.pos();
        let line = self.s.line();
        let selector = stmt::interpolated_text(&mut self.s, at_statement_end)?.trimmed();
        if selector.is_empty() {
            return Err(self.s.expected("selector"));
        }
        if !self.s.starts_with("{") {
            return Err(self.s.expected("\"{\""));
        }
        let children = self.block()?;
        Ok(
            Node::new(NodeKind::Rule { selector }, line, self.s.span_from(start))
                .with_children(children),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Node {
        let lines = LineIndex::new(src);
        ScssParser::new(src, &lines).parse().expect("parses")
    }

    fn parse_err(src: &str) -> Diagnostic {
        let lines = LineIndex::new(src);
        ScssParser::new(src, &lines)
            .parse()
            .expect_err("should fail")
    }

    #[test]
    fn test_rule_with_declarations() {
        let root = parse("a { color: red; b: c }");
        let rule = &root.children[0];
        assert!(matches!(rule.kind, NodeKind::Rule { .. }));
        assert_eq!(rule.children.len(), 2);
    }

    #[test]
    fn test_pseudo_selector_falls_back_to_ruleset() {
        let root = parse("a { b:hover { color: red } }");
        let inner = &root.children[0].children[0];
        let NodeKind::Rule { selector } = &inner.kind else {
            panic!("expected nested rule, got {:?}", inner.kind);
        };
        assert_eq!(selector.as_plain(), Some("b:hover"));
    }

    #[test]
    fn test_nested_properties() {
        let root = parse("a { font: 12px { family: serif; } }");
        let prop = &root.children[0].children[0];
        let NodeKind::Prop { value, .. } = &prop.kind else {
            panic!("expected property");
        };
        assert!(value.is_some());
        assert_eq!(prop.children.len(), 1);
    }

    #[test]
    fn test_missing_value_reports_property_error() {
        let err = parse_err("a { color: ; }");
        assert!(
            err.message().contains("expected expression (e.g. 1px, bold)"),
            "{}",
            err.message()
        );
    }

    #[test]
    fn test_missing_brace() {
        let err = parse_err("a { color: red; b }");
        assert_eq!(
            err.message(),
            "Invalid CSS after \"a { color: red; b \": expected \"{\", was \"}\""
        );
    }

    #[test]
    fn test_if_else_chain() {
        let root = parse("@if $a { x: y } @else if $b { x: z } @else { x: w }");
        assert_eq!(root.children.len(), 1);
        let NodeKind::If {
            else_branch: Some(branch),
            ..
        } = &root.children[0].kind
        else {
            panic!("expected @if with @else");
        };
        assert!(matches!(
            branch.kind,
            NodeKind::If {
                condition: Some(_),
                else_branch: Some(_)
            }
        ));
    }

    #[test]
    fn test_comments_become_nodes() {
        let root = parse("/* loud */\n// silent\na { }");
        assert!(matches!(
            root.children[0].kind,
            NodeKind::Comment { silent: false, .. }
        ));
        assert!(matches!(
            root.children[1].kind,
            NodeKind::Comment { silent: true, .. }
        ));
    }

    #[test]
    fn test_unknown_directive_with_block() {
        let root = parse("@font-face { font-family: x; }");
        let node = &root.children[0];
        assert!(node.has_block());
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn test_lines() {
        let root = parse("a {\n  color: red;\n}\n\nb { }");
        assert_eq!(root.children[0].line, 1);
        assert_eq!(root.children[0].children[0].line, 2);
        assert_eq!(root.children[1].line, 5);
    }
}
