//! Statement pieces shared by the brace and indented front-ends.
//!
//! Both front-ends hand the text of a statement to these functions through
//! a [`Scanner`]. The brace front-end scans the whole document; the
//! indented front-end bounds the scanner to one logical line, so the same
//! code stops at the end of the line there and at `;`, `{` or `}` here.

use log::trace;

use sable_core::style::Syntax;

use crate::{
    error::{ErrorCode, Result},
    scanner::{Scanner, block_comment, ident, name},
    script::ScriptParser,
    span::LineIndex,
    tree::{Expr, ImportTarget, InterpPart, Interpolation, Node, NodeKind},
};

/// Stop at the end of a brace-syntax statement.
pub(crate) fn at_statement_end(rest: &str) -> bool {
    rest.starts_with(['{', ';', '}'])
}

/// Read text that may contain `#{}` until `stop` matches.
///
/// Quoted strings and escapes are copied whole, so a `{` or `;` inside
/// `[title="a;b"]` does not end the text.
pub(crate) fn interpolated_text(
    s: &mut Scanner<'_>,
    stop: impl Fn(&str) -> bool,
) -> Result<Interpolation> {
    let mut text = Interpolation::new();
    while !s.is_done() {
        if s.eat("#{") {
            text.push_expr(interpolated_expr(s)?);
            continue;
        }
        if stop(s.rest()) {
            break;
        }
        match s.peek_char() {
            Some('\\') => {
                let start = s.pos();
                s.bump();
                s.bump();
                text.push_text(&s.src()[start..s.pos()]);
            }
            Some(quote @ ('"' | '\'')) => quoted_interpolation(s, quote, &mut text)?,
            Some(c) => {
                s.bump();
                text.push_text(c.to_string());
            }
            None => break,
        }
    }
    Ok(text)
}

/// Read all remaining text, treating only `#{` as special.
pub(crate) fn interpolated_raw(s: &mut Scanner<'_>) -> Result<Interpolation> {
    let mut text = Interpolation::new();
    while !s.is_done() {
        if s.eat("#{") {
            text.push_expr(interpolated_expr(s)?);
            continue;
        }
        let start = s.pos();
        while !s.is_done() && !s.starts_with("#{") {
            s.bump();
        }
        text.push_text(&s.src()[start..s.pos()]);
    }
    Ok(text)
}

fn quoted_interpolation(s: &mut Scanner<'_>, quote: char, text: &mut Interpolation) -> Result<()> {
    s.bump();
    text.push_text(quote.to_string());
    loop {
        if s.eat("#{") {
            text.push_expr(interpolated_expr(s)?);
            continue;
        }
        match s.bump() {
            None | Some('\n') => {
                return Err(s.error(ErrorCode::E001, "Unterminated string."));
            }
            Some('\\') => {
                text.push_text("\\");
                if let Some(c) = s.bump() {
                    text.push_text(c.to_string());
                }
            }
            Some(c) => {
                text.push_text(c.to_string());
                if c == quote {
                    return Ok(());
                }
            }
        }
    }
}

/// Parse the body of a `#{` the caller consumed.
pub(crate) fn interpolated_expr(s: &mut Scanner<'_>) -> Result<Expr> {
    let mut parser = ScriptParser::new(s.src(), s.lines(), s.pos(), s.limit());
    let expr = parser.parse_interpolated()?;
    s.set_pos(parser.position());
    Ok(expr)
}

pub(crate) fn expr(s: &mut Scanner<'_>) -> Result<Expr> {
    let mut parser = ScriptParser::new(s.src(), s.lines(), s.pos(), s.limit());
    let expr = parser.parse()?;
    s.set_pos(parser.position());
    Ok(expr)
}

fn expr_until(s: &mut Scanner<'_>, words: &'static [&'static str]) -> Result<Expr> {
    let mut parser =
        ScriptParser::new(s.src(), s.lines(), s.pos(), s.limit()).with_stop_at(words);
    let expr = parser.parse()?;
    s.set_pos(parser.position());
    Ok(expr)
}

/// A quoted string. Returns the raw text including quotes.
pub(crate) fn quoted_string<'src>(s: &mut Scanner<'src>) -> Result<&'src str> {
    let start = s.pos();
    let Some(quote @ ('"' | '\'')) = s.peek_char() else {
        return Err(s.expected("string"));
    };
    s.bump();
    loop {
        match s.bump() {
            None | Some('\n') => return Err(s.error(ErrorCode::E001, "Unterminated string.")),
            Some('\\') => {
                s.bump();
            }
            Some(c) if c == quote => break,
            Some(_) => {}
        }
    }
    Ok(&s.src()[start..s.pos()])
}

fn unquote(raw: &str) -> &str {
    raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default()
}

/// `$name: value [!default]`. The indented syntax also accepts `=`.
pub(crate) fn variable(s: &mut Scanner<'_>, syntax: Syntax) -> Result<Node> {
    let start = s.pos();
    let line = s.line();
    s.eat("$");
    let Some(var) = s.scan(name) else {
        return Err(s.expected("variable name"));
    };
    let var = var.to_string();
    s.skip_whitespace();
    if !(s.eat(":") || (syntax == Syntax::Indented && s.eat("="))) {
        return Err(s.expected("\":\""));
    }
    let value = expr(s)?;
    s.skip_whitespace();
    let guarded = s.eat_keyword("!default");
    Ok(Node::new(
        NodeKind::Variable {
            name: var,
            expr: value,
            guarded,
        },
        line,
        s.span_from(start),
    ))
}

/// A property name: an identifier with optional `#{}` segments and an
/// optional `*` hack prefix.
pub(crate) fn property_name(s: &mut Scanner<'_>) -> Result<Option<Interpolation>> {
    let mut prop = Interpolation::new();
    if s.eat("*") {
        prop.push_text("*");
    }
    if s.eat("#{") {
        prop.push_expr(interpolated_expr(s)?);
    } else if let Some(first) = s.scan(ident) {
        prop.push_text(first);
    } else {
        return Ok(None);
    }
    loop {
        if s.eat("#{") {
            prop.push_expr(interpolated_expr(s)?);
        } else if let Some(more) = s.scan(name) {
            prop.push_text(more);
        } else {
            return Ok(Some(prop));
        }
    }
}

/// The value after a property's colon, if there is one before the end of
/// the statement.
pub(crate) fn property_value(s: &mut Scanner<'_>) -> Result<Option<Expr>> {
    let mut probe = s.clone();
    probe.skip_whitespace();
    if probe.is_done() || at_statement_end(probe.rest()) {
        return Ok(None);
    }
    expr(s).map(Some)
}

/// An `@` rule up to, but not including, its block.
///
/// `@import` may produce several nodes. `@else` is not handled here: each
/// front-end attaches it to the preceding `@if`.
pub(crate) fn directive(s: &mut Scanner<'_>) -> Result<Vec<Node>> {
    let start = s.pos();
    let line = s.line();
    s.eat("@");
    let Some(directive) = s.scan(ident) else {
        return Err(s.expected("identifier"));
    };
    let directive = directive.to_string();
    trace!(directive:% = directive, line = line; "directive");
    s.skip_whitespace();

    let kind = match directive.as_str() {
        "mixin" => mixin_definition(s)?,
        "function" => {
            let name = definition_name(s)?;
            let params = params(s, true)?;
            NodeKind::Function { name, params }
        }
        "include" => mixin_include(s)?,
        "return" => NodeKind::Return { expr: expr(s)? },
        "debug" => NodeKind::Debug { expr: expr(s)? },
        "warn" => NodeKind::Warn { expr: expr(s)? },
        "if" => NodeKind::If {
            condition: Some(expr(s)?),
            else_branch: None,
        },
        "else" => {
            s.set_pos(start);
            return Err(s.error(ErrorCode::E106, "@else must come after @if."));
        }
        "while" => NodeKind::While {
            condition: expr(s)?,
        },
        "for" => for_header(s)?,
        "each" => {
            let var = loop_variable(s)?;
            s.skip_whitespace();
            if !s.eat_keyword("in") {
                return Err(s.expected("\"in\""));
            }
            NodeKind::Each {
                var,
                list: expr(s)?,
            }
        }
        "extend" => {
            let selector = interpolated_text(s, at_statement_end)?.trimmed();
            if selector.is_empty() {
                return Err(s.expected("selector"));
            }
            NodeKind::Extend { selector }
        }
        "media" => NodeKind::Media {
            query: interpolated_text(s, at_statement_end)?.trimmed(),
        },
        "charset" => {
            let raw = quoted_string(s)?;
            NodeKind::Charset {
                name: unquote(raw).to_string(),
            }
        }
        "import" => return imports(s),
        _ => NodeKind::Directive {
            name: directive,
            params: interpolated_text(s, at_statement_end)?.trimmed(),
            has_block: false,
        },
    };
    Ok(vec![Node::new(kind, line, s.span_from(start))])
}

/// `@else` or `@else if cond`, with the scanner past `@else`.
pub(crate) fn else_header(s: &mut Scanner<'_>, start: usize, line: usize) -> Result<Node> {
    s.skip_whitespace();
    let condition = if s.eat_keyword("if") {
        Some(expr(s)?)
    } else {
        None
    };
    Ok(Node::new(
        NodeKind::If {
            condition,
            else_branch: None,
        },
        line,
        s.span_from(start),
    ))
}

/// `name(params)` after `@mixin` or the indented `=`.
pub(crate) fn mixin_definition(s: &mut Scanner<'_>) -> Result<NodeKind> {
    let name = definition_name(s)?;
    let params = params(s, false)?;
    Ok(NodeKind::MixinDef { name, params })
}

/// `name(args)` after `@include` or the indented `+`.
pub(crate) fn mixin_include(s: &mut Scanner<'_>) -> Result<NodeKind> {
    let name = definition_name(s)?;
    let mut parser = ScriptParser::new(s.src(), s.lines(), s.pos(), s.limit());
    let args = parser.parse_include_args()?;
    s.set_pos(parser.position());
    Ok(NodeKind::MixinInclude { name, args })
}

fn definition_name(s: &mut Scanner<'_>) -> Result<String> {
    match s.scan(ident) {
        Some(name) => Ok(name.to_string()),
        None => Err(s.expected("identifier")),
    }
}

fn params(s: &mut Scanner<'_>, require_parens: bool) -> Result<Vec<crate::tree::Param>> {
    let mut parser = ScriptParser::new(s.src(), s.lines(), s.pos(), s.limit());
    let params = parser.parse_definition_params(require_parens)?;
    s.set_pos(parser.position());
    Ok(params)
}

fn loop_variable(s: &mut Scanner<'_>) -> Result<String> {
    if !s.eat("$") {
        return Err(s.expected("variable (e.g. $foo)"));
    }
    match s.scan(name) {
        Some(var) => Ok(var.to_string()),
        None => Err(s.expected("variable (e.g. $foo)")),
    }
}

fn for_header(s: &mut Scanner<'_>) -> Result<NodeKind> {
    let var = loop_variable(s)?;
    s.skip_whitespace();
    if !s.eat_keyword("from") {
        return Err(s.expected("\"from\""));
    }
    let from = expr_until(s, &["to", "through"])?;
    s.skip_whitespace();
    let inclusive = if s.eat_keyword("through") {
        true
    } else if s.eat_keyword("to") {
        false
    } else {
        return Err(s.expected("\"to\" or \"through\""));
    };
    let to = expr(s)?;
    Ok(NodeKind::For {
        var,
        from,
        to,
        inclusive,
    })
}

fn imports(s: &mut Scanner<'_>) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    loop {
        s.skip_whitespace();
        let start = s.pos();
        let line = s.line();
        let (raw, path, is_url) = if matches!(s.peek_char(), Some('"' | '\'')) {
            let raw = quoted_string(s)?;
            (raw, unquote(raw), false)
        } else if s.rest().get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) {
            let Some(close) = s.rest().find(')') else {
                return Err(s.expected("\")\""));
            };
            let raw = &s.rest()[..=close];
            s.set_pos(s.pos() + close + 1);
            (raw, raw[4..close].trim(), true)
        } else {
            return Err(s.expected("string or url()"));
        };
        s.skip_whitespace();
        let media_start = s.pos();
        while !s.is_done() && !s.rest().starts_with([',', ';', '{', '}']) {
            s.bump();
        }
        let media = s.src()[media_start..s.pos()].trim();

        let target = if is_url
            || path.starts_with("http://")
            || path.starts_with("https://")
            || !media.is_empty()
        {
            ImportTarget::Css(Interpolation::plain(format!("{raw} {media}").trim_end()))
        } else if path.ends_with(".css") {
            ImportTarget::Css(Interpolation::plain(format!("url({path})")))
        } else {
            ImportTarget::Sass(path.to_string())
        };
        nodes.push(Node::new(
            NodeKind::Import { target },
            line,
            s.span_from(start),
        ));
        s.skip_whitespace();
        if !s.eat(",") {
            return Ok(nodes);
        }
    }
}

/// A `/* */` comment in the brace syntax. Lines after the first lose the
/// indentation the comment itself started at.
pub(crate) fn loud_comment(s: &mut Scanner<'_>) -> Result<Node> {
    let start = s.pos();
    let line = s.line();
    let column = start - s.lines().line_start(line).unwrap_or(start);
    if s.scan(block_comment).is_none() {
        return Err(s.error(ErrorCode::E004, "Unterminated comment."));
    }
    let mut body = Scanner::new(s.src(), s.lines(), start, s.pos());
    let text = dedent(interpolated_raw(&mut body)?, column);
    Ok(Node::new(
        NodeKind::Comment {
            text,
            silent: false,
        },
        line,
        s.span_from(start),
    ))
}

/// A `//` comment in the brace syntax, up to the end of its line.
pub(crate) fn silent_comment(s: &mut Scanner<'_>) -> Node {
    let start = s.pos();
    let line = s.line();
    while !s.is_done() && !s.starts_with("\n") {
        s.bump();
    }
    let text = s.src()[start..s.pos()].trim_end().to_string();
    Node::new(
        NodeKind::Comment {
            text: Interpolation::plain(text),
            silent: true,
        },
        line,
        s.span_from(start),
    )
}

fn dedent(text: Interpolation, column: usize) -> Interpolation {
    if column == 0 {
        return text;
    }
    let mut out = Interpolation::new();
    for part in text.parts().iter().cloned() {
        match part {
            InterpPart::Text(chunk) => {
                let mut lines = chunk.split('\n');
                let mut fixed = lines.next().unwrap_or_default().to_string();
                for line in lines {
                    fixed.push('\n');
                    let indent = line
                        .chars()
                        .take(column)
                        .take_while(|c| *c == ' ' || *c == '\t')
                        .count();
                    fixed.push_str(&line[indent..]);
                }
                out.push_text(fixed);
            }
            InterpPart::Expr(expr) => out.push_expr(expr),
        }
    }
    out
}

/// Parse `#{}` in text that does not come straight from the source, such
/// as a comment the indented syntax reassembled from several lines.
pub(crate) fn interpolate_detached(text: &str) -> Result<Interpolation> {
    let lines = LineIndex::new(text);
    let mut s = Scanner::new(text, &lines, 0, text.len());
    interpolated_raw(&mut s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ExprKind;

    fn with_scanner<T>(src: &str, f: impl FnOnce(&mut Scanner<'_>) -> T) -> T {
        let lines = LineIndex::new(src);
        let mut s = Scanner::new(src, &lines, 0, src.len());
        f(&mut s)
    }

    #[test]
    fn test_interpolated_text_stops_outside_strings() {
        let (text, rest) = with_scanner("a[title=\"x{y\"] b { }", |s| {
            let text = interpolated_text(s, at_statement_end).expect("parses");
            (text, s.rest().to_string())
        });
        assert_eq!(text.as_plain(), Some("a[title=\"x{y\"] b "));
        assert_eq!(rest, "{ }");
    }

    #[test]
    fn test_interpolated_text_with_expression() {
        let text = with_scanner(".a-#{$b} { }", |s| {
            interpolated_text(s, at_statement_end).expect("parses")
        });
        assert_eq!(text.parts().len(), 3);
        assert!(matches!(
            &text.parts()[1],
            InterpPart::Expr(Expr {
                kind: ExprKind::Variable(_),
                ..
            })
        ));
    }

    #[test]
    fn test_variable_with_default() {
        let node = with_scanner("$a: 1px !default;", |s| {
            variable(s, Syntax::Scss).expect("parses")
        });
        let NodeKind::Variable { name, guarded, .. } = node.kind else {
            panic!("expected variable");
        };
        assert_eq!(name, "a");
        assert!(guarded);
    }

    #[test]
    fn test_for_header() {
        let nodes = with_scanner("@for $i from 1 through $n {", |s| {
            directive(s).expect("parses")
        });
        let NodeKind::For { var, inclusive, .. } = &nodes[0].kind else {
            panic!("expected @for");
        };
        assert_eq!(var, "i");
        assert!(inclusive);
    }

    #[test]
    fn test_imports() {
        let nodes = with_scanner(
            "@import \"a\", \"b.css\", url(c.css), \"d\" screen;",
            |s| directive(s).expect("parses"),
        );
        let targets: Vec<String> = nodes
            .iter()
            .map(|n| match &n.kind {
                NodeKind::Import {
                    target: ImportTarget::Sass(path),
                } => format!("sass:{path}"),
                NodeKind::Import {
                    target: ImportTarget::Css(text),
                } => format!("css:{}", text.as_plain().unwrap_or_default()),
                _ => String::new(),
            })
            .collect();
        assert_eq!(
            targets,
            [
                "sass:a",
                "css:url(b.css)",
                "css:url(c.css)",
                "css:\"d\" screen"
            ]
        );
    }

    #[test]
    fn test_stray_else_fails() {
        let err = with_scanner("@else { }", |s| directive(s).expect_err("should fail"));
        assert_eq!(err.code(), Some(ErrorCode::E106));
    }

    #[test]
    fn test_unknown_directive_keeps_params() {
        let nodes = with_scanner("@font-feature-values Font One {", |s| {
            directive(s).expect("parses")
        });
        let NodeKind::Directive { name, params, .. } = &nodes[0].kind else {
            panic!("expected directive");
        };
        assert_eq!(name, "font-feature-values");
        assert_eq!(params.as_plain(), Some("Font One"));
    }

    #[test]
    fn test_loud_comment_dedents_continuation_lines() {
        let src = "a {\n  /* one\n     two */\n}";
        let lines = LineIndex::new(src);
        let mut s = Scanner::new(src, &lines, 6, src.len());
        let node = loud_comment(&mut s).expect("parses");
        let NodeKind::Comment { text, silent } = node.kind else {
            panic!("expected comment");
        };
        assert!(!silent);
        assert_eq!(text.as_plain(), Some("/* one\n   two */"));
    }
}
