//! Rendering of the static-CSS tree to text.

use log::debug;

use sable_core::style::OutputStyle;

use crate::stylesheet::{CssKind, CssNode, Stylesheet};

impl Stylesheet {
    /// Render the stylesheet as CSS in `style`.
    ///
    /// With `line_comments`, every rule is preceded by a `/* line N, file */`
    /// comment naming where it was defined. Compressed output never carries
    /// them.
    pub fn to_css(&self, style: OutputStyle, line_comments: bool) -> String {
        let css = ToCss {
            style,
            line_comments,
            tabs: 0,
        }
        .visit_root(self.root());
        debug!(style:% = style, bytes = css.len(); "rendered css");
        css
    }
}

struct ToCss {
    style: OutputStyle,
    line_comments: bool,
    tabs: usize,
}

fn indent(tabs: usize) -> String {
    "  ".repeat(tabs)
}

/// Charsets are only written when the output needs one.
fn is_visible(style: OutputStyle, node: &CssNode) -> bool {
    match &node.kind {
        CssKind::Charset { .. } => false,
        CssKind::Comment { preserved, .. } => !style.is_compressed() || *preserved,
        _ => true,
    }
}

impl ToCss {
    fn visit_root(&mut self, root: &CssNode) -> String {
        let mut out = String::new();
        let style = self.style;
        for child in root.children.iter().filter(|c| is_visible(style, c)) {
            out.push_str(&self.visit(child));
            if !self.style.is_compressed() {
                out.push('\n');
            }
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if out.is_empty() {
            return out;
        }
        out.push('\n');

        if !out.is_ascii() {
            let charset = root
                .children
                .iter()
                .find_map(|c| match &c.kind {
                    CssKind::Charset { name } => Some(name.as_str()),
                    _ => None,
                })
                .unwrap_or("UTF-8");
            let separator = if self.style.is_compressed() { "" } else { "\n" };
            out.insert_str(0, &format!("@charset \"{charset}\";{separator}"));
        }
        out
    }

    /// Indentation a node adds on top of its position, which only nested
    /// output shows.
    fn node_tabs(&self, node: &CssNode) -> usize {
        if self.style == OutputStyle::Nested {
            node.tabs
        } else {
            0
        }
    }

    fn with_tabs<T>(&mut self, tabs: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.tabs, tabs);
        let result = f(self);
        self.tabs = saved;
        result
    }

    fn visit(&mut self, node: &CssNode) -> String {
        match &node.kind {
            CssKind::Rule { .. } => {
                let tabs = self.tabs + self.node_tabs(node);
                self.with_tabs(tabs, |this| this.visit_rule(node))
            }
            CssKind::Prop { .. } => self.visit_prop(node),
            CssKind::Comment { text, preserved } => self.visit_comment(text, *preserved),
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
                self.visit_directive(&head, *has_block, &node.children)
            }
            CssKind::Media { query } => {
                let tabs = self.tabs + self.node_tabs(node);
                let head = format!("@media {query}");
                let mut out =
                    self.with_tabs(tabs, |this| this.visit_directive(&head, true, &node.children));
                if !self.style.is_compressed() && !node.group_end && out.ends_with('\n') {
                    out.pop();
                }
                out
            }
            CssKind::Charset { name } => format!("@charset \"{name}\";"),
            CssKind::Import { uri } => format!("@import {uri};"),
            CssKind::Root | CssKind::Extend { .. } => String::new(),
        }
    }

    // ============================================================================
    // Rules
    // ============================================================================

    fn visit_rule(&mut self, node: &CssNode) -> String {
        let CssKind::Rule { selector } = &node.kind else {
            return String::new();
        };
        let old_spaces = indent(self.tabs);
        let selector = format!("{old_spaces}{}", selector.to_css(self.style));

        let mut out = String::new();
        if self.line_comments && !self.style.is_compressed() {
            out.push_str(&format!("{old_spaces}/* line {}", node.line));
            if let Some(filename) = &node.filename {
                out.push_str(&format!(", {filename}"));
            }
            out.push_str(" */\n");
        }

        let children: Vec<&CssNode> =
            node.children.iter().filter(|c| is_visible(self.style, c)).collect();
        let group_end = if node.group_end { "\n" } else { "" };
        match self.style {
            OutputStyle::Compact => {
                let props = self.with_tabs(0, |this| this.join(&children, " "));
                out.push_str(&format!("{selector} {{ {props} }}{group_end}"));
            }
            OutputStyle::Compressed => {
                let props = self.with_tabs(0, |this| this.join(&children, ";"));
                out.push_str(&format!("{selector}{{{props}}}"));
            }
            OutputStyle::Nested | OutputStyle::Expanded => {
                let props = self.with_tabs(self.tabs + 1, |this| this.join(&children, "\n"));
                let end = if self.style == OutputStyle::Expanded {
                    format!("\n{old_spaces}")
                } else {
                    " ".to_string()
                };
                out.push_str(&format!("{selector} {{\n{props}{end}}}{group_end}"));
            }
        }
        out
    }

    fn join(&mut self, nodes: &[&CssNode], separator: &str) -> String {
        nodes
            .iter()
            .map(|node| self.visit(node))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn visit_prop(&mut self, node: &CssNode) -> String {
        let CssKind::Prop {
            name,
            value: Some(value),
        } = &node.kind
        else {
            return String::new();
        };
        let value = value.to_css(self.style).unwrap_or_else(|_| value.inspect());
        let spaces = indent(self.tabs + self.node_tabs(node));
        if self.style.is_compressed() {
            format!("{spaces}{name}:{value}")
        } else {
            format!("{spaces}{name}: {value};")
        }
    }

    // ============================================================================
    // Comments and directives
    // ============================================================================

    fn visit_comment(&self, text: &str, preserved: bool) -> String {
        let leading = text.len() - text.trim_start_matches(' ').len();
        let spaces = indent(self.tabs.saturating_sub(leading));
        let content = text
            .split('\n')
            .map(|line| format!("{spaces}{line}"))
            .collect::<Vec<_>>()
            .join("\n");
        if matches!(self.style, OutputStyle::Compact | OutputStyle::Compressed) && !preserved {
            collapse_comment(&content)
        } else {
            content
        }
    }

    fn visit_directive(&mut self, head: &str, has_block: bool, children: &[CssNode]) -> String {
        if !has_block {
            return format!("{head};");
        }
        if children.is_empty() {
            return format!("{head} {{}}");
        }
        let mut out = match self.style {
            OutputStyle::Compressed => format!("{head}{{"),
            OutputStyle::Compact => format!("{}{head} {{ ", indent(self.tabs)),
            _ => format!("{}{head} {{\n", indent(self.tabs)),
        };

        let mut was_prop = false;
        let mut first = true;
        let style = self.style;
        for child in children.iter().filter(|c| is_visible(style, c)) {
            match self.style {
                OutputStyle::Compact => {
                    if child.is_prop() {
                        let tabs = if first || was_prop { 0 } else { self.tabs + 1 };
                        let rendered = self.with_tabs(tabs, |this| this.visit(child));
                        out.push_str(&rendered);
                        out.push(' ');
                    } else {
                        if was_prop {
                            out.pop();
                            out.push('\n');
                        }
                        let rendered = self.with_tabs(self.tabs + 1, |this| this.visit(child));
                        let rendered = if first { rendered.trim_start() } else { &rendered };
                        out.push_str(rendered.trim_end());
                        out.push('\n');
                    }
                    was_prop = child.is_prop();
                    first = false;
                }
                OutputStyle::Compressed => {
                    if was_prop {
                        out.push(';');
                    }
                    let rendered = self.with_tabs(0, |this| this.visit(child));
                    out.push_str(&rendered);
                    was_prop = child.is_prop();
                }
                OutputStyle::Nested | OutputStyle::Expanded => {
                    let rendered = self.with_tabs(self.tabs + 1, |this| this.visit(child));
                    out.push_str(&rendered);
                    out.push('\n');
                }
            }
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        match self.style {
            OutputStyle::Compressed => out.push('}'),
            OutputStyle::Expanded => out.push_str("\n}\n"),
            _ => out.push_str(" }\n"),
        }
        out
    }
}

/// Fold a multi-line comment onto one line: a newline, the indentation
/// after it and a leading `*` that does not close the comment become one
/// space.
fn collapse_comment(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = rest.find('\n') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let indented = after.trim_start_matches(' ');
        if indented.len() == after.len() {
            out.push('\n');
            rest = after;
            continue;
        }
        out.push(' ');
        rest = indented;
        if let Some(star) = rest.strip_prefix('*') {
            let spaced = star.trim_start_matches(' ');
            if !spaced.starts_with('/') {
                rest = spaced;
            }
        }
    }
    out.push_str(rest);
    out
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

    fn sheet(mut children: Vec<CssNode>) -> Stylesheet {
        if let Some(last) = children.last_mut() {
            last.group_end = true;
        }
        Stylesheet::new(CssNode::new(CssKind::Root, 1, None).with_children(children))
    }

    #[test]
    fn test_styles() {
        let sheet = sheet(vec![rule(".a, .b", &[("color", "red"), ("margin", "0")])]);
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, false),
            ".a, .b {\n  color: red;\n  margin: 0; }\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Expanded, false),
            ".a, .b {\n  color: red;\n  margin: 0;\n}\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Compact, false),
            ".a, .b { color: red; margin: 0; }\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Compressed, false),
            ".a,.b{color:red;margin:0}\n"
        );
    }

    #[test]
    fn test_nested_tabs_and_groups() {
        let parent = rule(".a", &[("x", "1")]);
        let mut child = rule(".a .b", &[("y", "2")]);
        child.tabs = 1;
        child.group_end = true;
        let other = rule(".c", &[("z", "3")]);
        let sheet = sheet(vec![parent, child, other]);
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, false),
            ".a {\n  x: 1; }\n  .a .b {\n    y: 2; }\n\n.c {\n  z: 3; }\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Expanded, false),
            ".a {\n  x: 1;\n}\n.a .b {\n  y: 2;\n}\n\n.c {\n  z: 3;\n}\n"
        );
    }

    #[test]
    fn test_line_comments() {
        let mut node = rule(".a", &[("x", "1")]);
        node.line = 4;
        node.filename = Some("main.scss".into());
        let sheet = sheet(vec![node]);
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, true),
            "/* line 4, main.scss */\n.a {\n  x: 1; }\n"
        );
        assert_eq!(sheet.to_css(OutputStyle::Compressed, true), ".a{x:1}\n");
    }

    #[test]
    fn test_media() {
        let media = CssNode::new(
            CssKind::Media {
                query: "print".to_string(),
            },
            1,
            None,
        )
        .with_children(vec![rule(".a", &[("x", "1")])]);
        let sheet = sheet(vec![media]);
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, false),
            "@media print {\n  .a {\n    x: 1; } }\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Compressed, false),
            "@media print{.a{x:1}}\n"
        );
    }

    #[test]
    fn test_comments_in_compressed_output() {
        let comment = |text: &str, preserved| {
            CssNode::new(
                CssKind::Comment {
                    text: text.to_string(),
                    preserved,
                },
                1,
                None,
            )
        };
        let sheet = sheet(vec![
            comment("/* dropped */", false),
            comment("/*! kept */", true),
            rule(".a", &[("x", "1")]),
        ]);
        assert_eq!(
            sheet.to_css(OutputStyle::Compressed, false),
            "/*! kept */.a{x:1}\n"
        );
    }

    #[test]
    fn test_hidden_children_are_skipped() {
        let dropped = CssNode::new(
            CssKind::Comment {
                text: "/* dropped */".to_string(),
                preserved: false,
            },
            1,
            None,
        );
        let media = CssNode::new(
            CssKind::Media {
                query: "print".to_string(),
            },
            1,
            None,
        )
        .with_children(vec![dropped, rule(".a", &[("x", "1")])]);
        let charset = CssNode::new(
            CssKind::Charset {
                name: "UTF-8".to_string(),
            },
            1,
            None,
        );
        let sheet = sheet(vec![charset, media]);
        assert_eq!(
            sheet.to_css(OutputStyle::Compressed, false),
            "@media print{.a{x:1}}\n"
        );
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, false),
            "@media print {\n  /* dropped */\n  .a {\n    x: 1; } }\n"
        );
    }

    #[test]
    fn test_collapse_comment() {
        assert_eq!(collapse_comment("/* a\n * b\n */"), "/* a b */");
        assert_eq!(collapse_comment("/* a\nb */"), "/* a\nb */");
    }

    #[test]
    fn test_non_ascii_output_gets_charset() {
        let sheet = sheet(vec![rule(".a", &[("content", "\"é\"")])]);
        assert_eq!(
            sheet.to_css(OutputStyle::Nested, false),
            "@charset \"UTF-8\";\n.a {\n  content: \"é\"; }\n"
        );
    }

    #[test]
    fn test_empty_stylesheet_renders_nothing() {
        assert_eq!(sheet(Vec::new()).to_css(OutputStyle::Nested, false), "");
    }
}
