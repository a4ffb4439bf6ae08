//! The indentation-sensitive front-end.
//!
//! The source is first split into logical lines with a nesting depth
//! (tabulation), then the lines are arranged into a tree by depth, and
//! finally each line is parsed on its own with the shared statement
//! parsers, bounded to the line's text.

use log::debug;

use sable_core::style::Syntax;

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    scanner::Scanner,
    span::{LineIndex, Span},
    stmt,
    tree::{Interpolation, Node, NodeKind},
};

/// One logical line: a physical line plus any selector continuation lines
/// joined to it.
#[derive(Debug)]
struct Line {
    start: usize,
    end: usize,
    indent: usize,
    tabs: usize,
    line: usize,
    /// Body lines of a comment, with the comment's indentation removed.
    comment_body: Vec<String>,
    children: Vec<Line>,
}

impl Line {
    fn is_comment(&self, src: &str) -> bool {
        let text = &src[self.start..self.end];
        text.starts_with("//") || text.starts_with("/*")
    }
}

pub(crate) struct SassParser<'src> {
    src: &'src str,
    lines: &'src LineIndex,
}

impl<'src> SassParser<'src> {
    pub fn new(src: &'src str, lines: &'src LineIndex) -> Self {
        Self { src, lines }
    }

    pub fn parse(self) -> Result<Node> {
        let flat = self.tabulate()?;
        let mut iter = flat.into_iter().peekable();
        let tree = build_tree(&mut iter, 0)?;
        let children = self.nodes(tree)?;
        debug!(statements = children.len(); "parsed indented stylesheet");
        Ok(Node::new(NodeKind::Root, 1, Span::new(0..self.src.len())).with_children(children))
    }

    fn tabulate(&self) -> Result<Vec<Line>> {
        let mut out: Vec<Line> = Vec::new();
        let mut unit: Option<&str> = None;
        let mut offset = 0;
        for (index, raw) in self.src.split('\n').enumerate() {
            let line_start = offset;
            offset += raw.len() + 1;
            let line_no = index + 1;
            let text = raw.trim_end();
            let content = text.trim_start();
            if content.is_empty() {
                continue;
            }
            let indent = &text[..text.len() - content.len()];

            if let Some(last) = out.last_mut() {
                if last.is_comment(self.src) && indent.len() > last.indent {
                    last.comment_body.push(text[last.indent.min(indent.len())..].to_string());
                    continue;
                }
                if !last.is_comment(self.src) && self.src[last.start..last.end].ends_with(',') {
                    last.end = line_start + text.len();
                    continue;
                }
            }

            let tabs = if indent.is_empty() {
                0
            } else {
                if out.is_empty() {
                    return Err(tabulation_error(
                        "Indenting at the beginning of the document is illegal.",
                        line_no,
                    ));
                }
                if indent.contains(' ') && indent.contains('\t') {
                    return Err(tabulation_error(
                        "Indentation can't use both tabs and spaces.",
                        line_no,
                    )
                    .with_code(ErrorCode::E103));
                }
                let unit = *unit.get_or_insert(indent);
                if indent.as_bytes()[0] != unit.as_bytes()[0] || indent.len() % unit.len() != 0 {
                    return Err(tabulation_error(
                        &format!(
                            "Inconsistent indentation: {} used for indentation, but the rest of the document was indented using {}.",
                            human_indentation(indent, true),
                            human_indentation(unit, false)
                        ),
                        line_no,
                    ));
                }
                indent.len() / unit.len()
            };
            out.push(Line {
                start: line_start + indent.len(),
                end: line_start + text.len(),
                indent: indent.len(),
                tabs,
                line: line_no,
                comment_body: Vec::new(),
                children: Vec::new(),
            });
        }
        Ok(out)
    }

    fn nodes(&self, lines: Vec<Line>) -> Result<Vec<Node>> {
        let mut out: Vec<Node> = Vec::new();
        for line in lines {
            let mut s = self.scanner(&line);
            if s.eat("@") && s.eat_keyword("else") {
                let mut branch = stmt::else_header(&mut s, line.start, line.line)?;
                expect_line_end(&mut s)?;
                branch.children = self.nodes(line.children)?;
                let misplaced = match out.last_mut() {
                    Some(prev) => prev.add_else(branch).err(),
                    None => Some(branch),
                };
                if let Some(branch) = misplaced {
                    return Err(Diagnostic::error("@else must come after @if.")
                        .with_code(ErrorCode::E106)
                        .with_line(branch.line)
                        .with_label(branch.span, "misplaced @else"));
                }
                continue;
            }
            out.extend(self.line_nodes(line)?);
        }
        Ok(out)
    }

    fn scanner(&self, line: &Line) -> Scanner<'src> {
        Scanner::new(self.src, self.lines, line.start, line.end)
    }

    fn line_nodes(&self, line: Line) -> Result<Vec<Node>> {
        let mut s = self.scanner(&line);
        let first = s.peek_char();
        let second = s.peek_nth(1);
        let mut nodes = match (first, second) {
            (Some('/'), Some('/' | '*')) => return Ok(vec![self.comment(&line)]),
            (Some('$'), _) => {
                let node = stmt::variable(&mut s, Syntax::Indented)?;
                expect_line_end(&mut s)?;
                vec![node]
            }
            (Some('@'), _) => {
                let nodes = stmt::directive(&mut s)?;
                expect_line_end(&mut s)?;
                nodes
            }
            (Some('='), _) => {
                s.bump();
                s.skip_whitespace();
                let kind = stmt::mixin_definition(&mut s)?;
                expect_line_end(&mut s)?;
                vec![Node::new(kind, line.line, s.span_from(line.start))]
            }
            (Some('+'), Some(c)) if !c.is_whitespace() => {
                s.bump();
                let kind = stmt::mixin_include(&mut s)?;
                expect_line_end(&mut s)?;
                vec![Node::new(kind, line.line, s.span_from(line.start))]
            }
            (Some(':'), Some(c)) if c != ':' => {
                s.bump();
                vec![self.property(&mut s, &line)?]
            }
            (Some('\\'), _) => {
                s.bump();
                vec![self.rule(&mut s, &line)?]
            }
            _ => vec![self.property_or_rule(&mut s, &line)?],
        };

        let children = self.nodes(line.children)?;
        if let Some(node) = nodes.last_mut() {
            if let NodeKind::Directive { has_block, .. } = &mut node.kind {
                *has_block = !children.is_empty();
            }
            node.children = children;
        }
        Ok(nodes)
    }

    fn property_or_rule(&self, s: &mut Scanner<'src>, line: &Line) -> Result<Node> {
        let mut probe = s.clone();
        if stmt::property_name(&mut probe)?.is_some() {
            probe.skip_whitespace();
            let after_colon = probe.eat(":") && probe.peek_char().is_none_or(char::is_whitespace);
            if after_colon {
                return self.property(s, line);
            }
        }
        self.rule(s, line)
    }

    /// `name: value` or the legacy `:name value`, with the scanner at the
    /// name.
    fn property(&self, s: &mut Scanner<'src>, line: &Line) -> Result<Node> {
        let Some(name) = stmt::property_name(s)? else {
            return Err(s.expected("property name"));
        };
        s.skip_whitespace();
        // The legacy form has no colon after the name.
        if !s.eat(":") {
            s.eat("=");
        }
        let value = stmt::property_value(s)?;
        expect_line_end(s)?;
        if value.is_none() && line.children.is_empty() {
            return Err(Diagnostic::error(format!(
                "Invalid property: \"{}\" (no value).",
                &self.src[line.start..line.end]
            ))
            .with_code(ErrorCode::E105)
            .with_line(line.line)
            .with_label(Span::new(line.start..line.end), "property without a value"));
        }
        Ok(Node::new(
            NodeKind::Prop { name, value },
            line.line,
            Span::new(line.start..line.end),
        ))
    }

    fn rule(&self, s: &mut Scanner<'src>, line: &Line) -> Result<Node> {
        let selector = stmt::interpolated_text(s, |_| false)?.trimmed();
        if selector.is_empty() {
            return Err(s.expected("selector"));
        }
        Ok(Node::new(
            NodeKind::Rule { selector },
            line.line,
            Span::new(line.start..line.end),
        ))
    }

    fn comment(&self, line: &Line) -> Node {
        let text = &self.src[line.start..line.end];
        let silent = text.starts_with("//");
        let mut body = text[2..].to_string();
        let common = line
            .comment_body
            .iter()
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        for extra in &line.comment_body {
            body.push('\n');
            body.push_str(&extra[common.min(extra.len())..]);
        }
        let formatted = format_comment(&body, silent);
        let text = if silent {
            Interpolation::plain(formatted)
        } else {
            stmt::interpolate_detached(&formatted)
                .unwrap_or_else(|_| Interpolation::plain(formatted.clone()))
        };
        Node::new(
            NodeKind::Comment { text, silent },
            line.line,
            Span::new(line.start..line.end),
        )
    }
}

/// Arrange flat lines into a tree by depth.
fn build_tree(
    lines: &mut std::iter::Peekable<std::vec::IntoIter<Line>>,
    base: usize,
) -> Result<Vec<Line>> {
    let mut nodes: Vec<Line> = Vec::new();
    while let Some(next) = lines.peek() {
        if next.tabs < base {
            break;
        }
        if next.tabs > base {
            if next.tabs > base + 1 || nodes.is_empty() {
                return Err(tabulation_error(
                    &format!(
                        "The line was indented {} levels deeper than the previous line.",
                        next.tabs - base
                    ),
                    next.line,
                ));
            }
            let children = build_tree(lines, base + 1)?;
            if let Some(parent) = nodes.last_mut() {
                parent.children = children;
            }
            continue;
        }
        if let Some(line) = lines.next() {
            nodes.push(line);
        }
    }
    Ok(nodes)
}

fn expect_line_end(s: &mut Scanner<'_>) -> Result<()> {
    s.skip_whitespace_and_silent_comments();
    if s.is_done() {
        Ok(())
    } else {
        Err(s.expected("end of line"))
    }
}

fn tabulation_error(message: &str, line: usize) -> Diagnostic {
    Diagnostic::error(message)
        .with_code(ErrorCode::E102)
        .with_line(line)
}

/// `2 spaces were`, `1 tab`, or the literal indentation when it is mixed.
fn human_indentation(indent: &str, was: bool) -> String {
    let noun = if !indent.contains('\t') {
        "space"
    } else if !indent.contains(' ') {
        "tab"
    } else {
        return format!("{indent:?}{}", if was { " was" } else { "" });
    };
    let singular = indent.len() == 1;
    let verb = match (was, singular) {
        (false, _) => "",
        (true, true) => " was",
        (true, false) => " were",
    };
    format!(
        "{} {noun}{}{verb}",
        indent.len(),
        if singular { "" } else { "s" }
    )
}

/// Normalize an indented comment into `/* a\n * b */` or `//a\n//b`.
fn format_comment(body: &str, silent: bool) -> String {
    let mut content: Vec<String> = body.split('\n').map(str::to_string).collect();
    let removed_first = content.first().is_some_and(|l| l.trim().is_empty());
    if removed_first {
        content.remove(0);
    }
    if content.is_empty() {
        return if silent { "//" } else { "/* */" }.to_string();
    }
    if let Some(last) = content.last_mut() {
        let trimmed = last.trim_end_matches(' ');
        if let Some(stripped) = trimmed.strip_suffix("*/") {
            *last = stripped.strip_suffix(' ').unwrap_or(stripped).to_string();
        }
    }
    for line in &mut content {
        *line = match line.strip_prefix('*') {
            Some(rest) => rest.to_string(),
            None if line.is_empty() => String::new(),
            None => format!(" {line}"),
        };
    }
    if !removed_first {
        if let Some(first) = content.first_mut() {
            if let Some(rest) = first.strip_prefix(' ') {
                *first = rest.to_string();
            }
        }
    }
    if silent {
        format!("//{}", content.join("\n//"))
    } else {
        format!("/*{} */", content.join("\n *"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Node {
        let lines = LineIndex::new(src);
        SassParser::new(src, &lines).parse().expect("parses")
    }

    fn parse_err(src: &str) -> Diagnostic {
        let lines = LineIndex::new(src);
        SassParser::new(src, &lines)
            .parse()
            .expect_err("should fail")
    }

    #[test]
    fn test_nesting_by_indentation() {
        let root = parse("a\n  color: red\n  b\n    x: y\nc\n  z: w\n");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children.len(), 2);
        assert_eq!(root.children[0].children[1].children.len(), 1);
    }

    #[test]
    fn test_property_versus_pseudo_selector() {
        let root = parse("a\n  b:hover\n    c: d\n");
        let inner = &root.children[0].children[0];
        assert!(matches!(inner.kind, NodeKind::Rule { .. }));
        assert!(matches!(inner.children[0].kind, NodeKind::Prop { .. }));
    }

    #[test]
    fn test_legacy_property_syntax() {
        let root = parse("a\n  :color red\n");
        assert!(matches!(
            root.children[0].children[0].kind,
            NodeKind::Prop { value: Some(_), .. }
        ));
    }

    #[test]
    fn test_mixin_shorthands() {
        let root = parse("=m($a)\n  b: $a\na\n  +m(1px)\n");
        assert!(matches!(root.children[0].kind, NodeKind::MixinDef { .. }));
        assert!(matches!(
            root.children[1].children[0].kind,
            NodeKind::MixinInclude { .. }
        ));
    }

    #[test]
    fn test_selector_continuation() {
        let root = parse("a,\nb\n  c: d\n");
        let NodeKind::Rule { selector } = &root.children[0].kind else {
            panic!("expected rule");
        };
        assert_eq!(selector.as_plain(), Some("a,\nb"));
        assert_eq!(root.children[0].children.len(), 1);
    }

    #[test]
    fn test_else_attaches_to_if() {
        let root = parse("@if $a\n  b: c\n@else\n  b: d\n");
        assert_eq!(root.children.len(), 1);
        assert!(matches!(
            root.children[0].kind,
            NodeKind::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_misplaced_else() {
        let err = parse_err("a\n  b: c\n@else\n  b: d\n");
        assert_eq!(err.code(), Some(ErrorCode::E106));
    }

    #[test]
    fn test_indented_start_is_illegal() {
        let err = parse_err("  a\n    b: c\n");
        assert_eq!(
            err.message(),
            "Indenting at the beginning of the document is illegal."
        );
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_mixed_indentation() {
        let err = parse_err("a\n \tb: c\n");
        assert_eq!(err.message(), "Indentation can't use both tabs and spaces.");
        assert_eq!(err.code(), Some(ErrorCode::E103));
    }

    #[test]
    fn test_inconsistent_indentation() {
        let err = parse_err("a\n  b: c\n  d\n     e: f\n");
        assert_eq!(
            err.message(),
            "Inconsistent indentation: 5 spaces were used for indentation, but the rest of the document was indented using 2 spaces."
        );
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_indented_too_deep() {
        let err = parse_err("a\n  b: c\n      d: e\n");
        assert_eq!(
            err.message(),
            "The line was indented 2 levels deeper than the previous line."
        );
    }

    #[test]
    fn test_property_without_value() {
        let err = parse_err("a\n  b:\n");
        assert_eq!(err.message(), "Invalid property: \"b:\" (no value).");
    }

    #[test]
    fn test_comment_body() {
        let root = parse("/* first\n   second\na\n  b: c\n");
        let NodeKind::Comment { text, silent } = &root.children[0].kind else {
            panic!("expected comment");
        };
        assert!(!silent);
        assert_eq!(text.as_plain(), Some("/* first\n * second */"));
        assert!(matches!(root.children[1].kind, NodeKind::Rule { .. }));
    }

    #[test]
    fn test_format_comment() {
        assert_eq!(format_comment(" a */", false), "/* a */");
        assert_eq!(format_comment(" a\nb", true), "// a\n// b");
        assert_eq!(format_comment("", false), "/* */");
    }

    #[test]
    fn test_human_indentation() {
        assert_eq!(human_indentation("  ", false), "2 spaces");
        assert_eq!(human_indentation("\t", true), "1 tab was");
    }
}
