//! Conversion of a flattened stylesheet back to source text.
//!
//! The output of [`Stylesheet::to_source`] compiles to the same
//! declarations as the stylesheet it came from. It is meant for format
//! conversion tooling, so it is laid out for reading rather than for
//! reproducing the original source.

use sable_core::style::{OutputStyle, Syntax};

use crate::stylesheet::{CssKind, CssNode, Stylesheet};

impl Stylesheet {
    /// Render the stylesheet as source in `syntax`.
    pub fn to_source(&self, syntax: Syntax) -> String {
        let convert = Convert { syntax };
        let blocks: Vec<String> = self
            .nodes()
            .iter()
            .map(|node| convert.visit(node, 0))
            .filter(|block| !block.is_empty())
            .collect();
        blocks.join("\n")
    }
}

struct Convert {
    syntax: Syntax,
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

impl Convert {
    fn is_sass(&self) -> bool {
        self.syntax == Syntax::Indented
    }

    /// A statement that takes no block.
    fn statement(&self, depth: usize, text: &str) -> String {
        let semi = if self.is_sass() { "" } else { ";" };
        format!("{}{text}{semi}\n", indent(depth))
    }

    fn block(&self, depth: usize, head: &str, children: &[CssNode]) -> String {
        let mut out = indent(depth);
        out.push_str(head);
        out.push_str(if self.is_sass() { "\n" } else { " {\n" });
        for child in children {
            out.push_str(&self.visit(child, depth + 1));
        }
        if !self.is_sass() {
            out.push_str(&indent(depth));
            out.push_str("}\n");
        }
        out
    }

    fn visit(&self, node: &CssNode, depth: usize) -> String {
        match &node.kind {
            CssKind::Rule { selector } => {
                let mut selector = selector.to_css(OutputStyle::Nested);
                if self.is_sass() && selector.starts_with(':') {
                    selector.insert(0, '\\');
                }
                self.block(depth, &selector, &node.children)
            }
            CssKind::Prop { name, value } => match value {
                Some(value) => {
                    let value = value
                        .to_css(OutputStyle::Nested)
                        .unwrap_or_else(|_| value.inspect());
                    self.statement(depth, &format!("{name}: {value}"))
                }
                None => String::new(),
            },
            CssKind::Comment { text, .. } => self.visit_comment(text, depth),
            CssKind::Directive {
                name,
                params,
                has_block,
            } => {
                let head = if params.is_empty() {
                    format!("@{name}")
                } else {
                    format!("@{name} {params}")
                };
                if *has_block && !(self.is_sass() && node.children.is_empty()) {
                    self.block(depth, &head, &node.children)
                } else {
                    self.statement(depth, &head)
                }
            }
            CssKind::Media { query } => {
                self.block(depth, &format!("@media {query}"), &node.children)
            }
            CssKind::Charset { name } => self.statement(depth, &format!("@charset \"{name}\"")),
            CssKind::Import { uri } => self.statement(depth, &format!("@import {uri}")),
            CssKind::Root | CssKind::Extend { .. } => String::new(),
        }
    }

    /// Continuation lines of a comment are indented under its first line,
    /// which is how the indented syntax marks a comment's extent.
    fn visit_comment(&self, text: &str, depth: usize) -> String {
        let spaces = indent(depth);
        let mut lines = text.lines();
        let mut out = String::new();
        if let Some(first) = lines.next() {
            out.push_str(&spaces);
            out.push_str(first.trim_start());
            out.push('\n');
        }
        for line in lines {
            out.push_str(&spaces);
            out.push_str(if self.is_sass() { "  " } else { " " });
            out.push_str(line.trim_start());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use sable_core::value::Value;
    use sable_parser::parse_selector;

    use super::*;

    fn rule(selector: &str, props: &[(&str, &str)]) -> CssNode {
        let selector = parse_selector(selector, 1).expect("valid selector");
        let children = props
            .iter()
            .map(|(name, value)| {
                CssNode::new(
                    CssKind::Prop {
                        name: name.to_string(),
                        value: Some(Value::unquoted(*value)),
                    },
                    1,
                    None,
                )
            })
            .collect();
        CssNode::new(CssKind::Rule { selector }, 1, None).with_children(children)
    }

    fn sheet(children: Vec<CssNode>) -> Stylesheet {
        Stylesheet::new(CssNode::new(CssKind::Root, 1, None).with_children(children))
    }

    #[test]
    fn test_scss_output() {
        let sheet = sheet(vec![
            rule(".a", &[("color", "red")]),
            rule(".b .c", &[("margin", "0 auto")]),
        ]);
        assert_eq!(
            sheet.to_source(Syntax::Scss),
            ".a {\n  color: red;\n}\n\n.b .c {\n  margin: 0 auto;\n}\n"
        );
    }

    #[test]
    fn test_sass_output() {
        let media = CssNode::new(
            CssKind::Media {
                query: "print".to_string(),
            },
            1,
            None,
        )
        .with_children(vec![rule(":hover", &[("x", "1")])]);
        let sheet = sheet(vec![media]);
        assert_eq!(
            sheet.to_source(Syntax::Indented),
            "@media print\n  \\:hover\n    x: 1\n"
        );
    }

    #[test]
    fn test_comment_continuation_lines() {
        let comment = CssNode::new(
            CssKind::Comment {
                text: "/* a\n * b */".to_string(),
                preserved: false,
            },
            1,
            None,
        );
        let sheet = sheet(vec![comment]);
        assert_eq!(sheet.to_source(Syntax::Indented), "/* a\n  * b */\n");
        assert_eq!(sheet.to_source(Syntax::Scss), "/* a\n * b */\n");
    }
}
