//! Static selector parser.
//!
//! Parses selector text whose interpolation has already been resolved into
//! the selector model from `sable_core`. Comments count as whitespace.

use winnow::{
    Parser,
    combinator::{alt, opt, repeat},
    error::{ContextError, ErrMode},
    token::{any, none_of, one_of, take_until, take_while},
};

use sable_core::selector::{
    CommaSequence, Combinator, PseudoKind, SeqMember, Sequence, Simple, SimpleSequence,
};

use crate::{
    error::{Diagnostic, ErrorCode},
    scanner::{PResult, ident, invalid_css, name},
};

/// Pseudo classes whose argument is itself a selector list.
const SELECTOR_PSEUDO_CLASSES: &[&str] = &["not", "matches", "any", "-moz-any", "-webkit-any"];

/// Parse a complete selector list.
///
/// `line` is the source line the text came from, used in the diagnostic.
pub fn parse_selector(text: &str, line: usize) -> Result<CommaSequence, Diagnostic> {
    let mut input = text;
    let parsed = selector_list(&mut input);
    let rest = input.trim_start();
    match parsed {
        Ok(selector) if rest.is_empty() => Ok(selector),
        _ => {
            let pos = text.len() - rest.len();
            Err(Diagnostic::error(invalid_css(text, pos, text.len(), "selector"))
                .with_code(ErrorCode::E104)
                .with_line(line))
        }
    }
}

fn fail<O>() -> PResult<O> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Whitespace and `/* */` comments. Returns whether anything was skipped.
fn ws(input: &mut &str) -> PResult<bool> {
    let before = input.len();
    repeat::<_, _, (), _, _>(
        0..,
        alt((
            take_while(1.., char::is_whitespace).void(),
            ("/*", take_until(0.., "*/"), "*/").void(),
        )),
    )
    .parse_next(input)?;
    Ok(input.len() < before)
}

fn selector_list(input: &mut &str) -> PResult<CommaSequence> {
    let mut members = vec![sequence(input)?];
    loop {
        let saved = *input;
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            *input = saved;
            return Ok(CommaSequence::new(members));
        }
        members.push(sequence(input)?);
    }
}

fn sequence(input: &mut &str) -> PResult<Sequence> {
    let mut members = Vec::new();
    loop {
        let saved = *input;
        let spaced = ws(input)?;
        if let Some(combinator) = opt(combinator).parse_next(input)? {
            members.push(SeqMember::Combinator(combinator));
            continue;
        }
        // A compound directly after another one, as in `&-b`, is not a
        // descendant.
        if !spaced && matches!(members.last(), Some(SeqMember::Compound(_))) {
            *input = saved;
            break;
        }
        match opt(compound).parse_next(input)? {
            Some(compound) => members.push(SeqMember::Compound(compound)),
            None => {
                *input = saved;
                break;
            }
        }
    }
    if members.is_empty() {
        return fail();
    }
    Ok(Sequence::new(members))
}

fn combinator(input: &mut &str) -> PResult<Combinator> {
    alt((
        '>'.value(Combinator::Child),
        '+'.value(Combinator::NextSibling),
        '~'.value(Combinator::FollowingSibling),
    ))
    .parse_next(input)
}

fn compound(input: &mut &str) -> PResult<SimpleSequence> {
    let mut members: Vec<Simple> = opt(base).parse_next(input)?.into_iter().collect();
    while let Some(simple) = opt(qualifier).parse_next(input)? {
        members.push(simple);
    }
    if members.is_empty() {
        return fail();
    }
    Ok(SimpleSequence::new(members))
}

/// `&`, a keyframe percentage, an element or a universal selector.
fn base(input: &mut &str) -> PResult<Simple> {
    alt((
        '&'.value(Simple::Parent),
        percentage.map(|p| Simple::Element {
            name: p.to_string(),
            namespace: None,
        }),
        qualified_element,
    ))
    .parse_next(input)
}

fn percentage<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
        '%',
    )
        .take()
        .parse_next(input)
}

/// `name`, `*`, `ns|name`, `*|*` or `|name`.
fn qualified_element(input: &mut &str) -> PResult<Simple> {
    let first = opt(alt((ident, "*"))).parse_next(input)?;
    let namespace = if input.starts_with('|') && !input.starts_with("|=") {
        '|'.parse_next(input)?;
        Some(first.unwrap_or_default().to_string())
    } else {
        None
    };
    let name = match namespace {
        Some(_) => alt((ident, "*")).parse_next(input)?,
        None => match first {
            Some(first) => first,
            None => return fail(),
        },
    };
    Ok(if name == "*" {
        Simple::Universal { namespace }
    } else {
        Simple::Element {
            name: name.to_string(),
            namespace,
        }
    })
}

fn qualifier(input: &mut &str) -> PResult<Simple> {
    alt((
        ('.', ident).map(|(_, n)| Simple::Class(String::from(n))),
        ('#', name).map(|(_, n)| Simple::Id(String::from(n))),
        attribute,
        pseudo,
    ))
    .parse_next(input)
}

fn attribute(input: &mut &str) -> PResult<Simple> {
    '['.parse_next(input)?;
    ws(input)?;
    let Simple::Element { name, namespace } = qualified_element(input)? else {
        return fail();
    };
    ws(input)?;
    let op = opt(alt(("=", "~=", "|=", "^=", "$=", "*="))).parse_next(input)?;
    let value = match op {
        Some(_) => {
            ws(input)?;
            let value = alt((quoted, ident)).parse_next(input)?;
            ws(input)?;
            Some(value.to_string())
        }
        None => None,
    };
    ']'.parse_next(input)?;
    Ok(Simple::Attribute {
        name,
        namespace,
        op: op.map(str::to_string),
        value,
    })
}

fn quoted<'i>(input: &mut &'i str) -> PResult<&'i str> {
    let start = *input;
    let mut quote = one_of(['"', '\'']).parse_next(input)?;
    repeat::<_, _, (), _, _>(
        0..,
        alt((('\\', any).void(), none_of([quote, '\\', '\n']).void())),
    )
    .parse_next(input)?;
    quote.parse_next(input)?;
    Ok(&start[..start.len() - input.len()])
}

fn pseudo(input: &mut &str) -> PResult<Simple> {
    let kind = alt(("::".value(PseudoKind::Element), ":".value(PseudoKind::Class)))
        .parse_next(input)?;
    let name = ident.parse_next(input)?.to_string();
    if opt('(').parse_next(input)?.is_none() {
        return Ok(Simple::Pseudo {
            kind,
            name,
            arg: None,
        });
    }
    if kind == PseudoKind::Class
        && SELECTOR_PSEUDO_CLASSES.contains(&name.to_ascii_lowercase().as_str())
    {
        let saved = *input;
        let nested = (selector_list, ws, ')').parse_next(input);
        if let Ok((selector, _, _)) = nested {
            return Ok(Simple::SelectorPseudoClass { name, selector });
        }
        *input = saved;
    }
    let arg = balanced(input)?;
    ')'.parse_next(input)?;
    Ok(Simple::Pseudo {
        kind,
        name,
        arg: Some(arg.trim().to_string()),
    })
}

/// Text up to the `)` that closes an already consumed `(`.
fn balanced<'i>(input: &mut &'i str) -> PResult<&'i str> {
    let start = *input;
    let mut depth = 0usize;
    loop {
        if input.starts_with(['"', '\'']) {
            let before = *input;
            if quoted(input).is_err() {
                *input = before;
                return fail();
            }
            continue;
        }
        match input.chars().next() {
            None => return fail(),
            Some(')') if depth == 0 => break,
            Some(c) => {
                match c {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                *input = &input[c.len_utf8()..];
            }
        }
    }
    Ok(&start[..start.len() - input.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(text: &str) -> String {
        parse_selector(text, 1).expect("parses").to_string()
    }

    #[test]
    fn test_round_trips_common_selectors() {
        for text in [
            "a",
            ".a.b",
            "#x .y",
            "a > b + c ~ d",
            "ul li:first-child",
            "a:hover, b::before",
            "svg|circle",
            "*|*",
            "input[type=\"text\"]",
            "a[href^=http]",
            "li:nth-child(2n + 1)",
            "&.active",
            "> .child",
        ] {
            assert_eq!(css(text), text, "round trip of {text:?}");
        }
    }

    #[test]
    fn test_whitespace_and_comments_are_normalized() {
        assert_eq!(css("  a   /* x */ b ,\n c  "), "a b, c");
        assert_eq!(css("a>b"), "a > b");
    }

    #[test]
    fn test_keyframe_percentages() {
        assert_eq!(css("0%, 50.5%, to"), "0%, 50.5%, to");
    }

    #[test]
    fn test_selector_pseudo_class() {
        let selector = parse_selector(":not(.a, .b)", 1).expect("parses");
        let SeqMember::Compound(compound) = &selector.members()[0].members()[0] else {
            panic!("expected compound");
        };
        assert!(matches!(
            compound.members()[0],
            Simple::SelectorPseudoClass { .. }
        ));
    }

    #[test]
    fn test_pseudo_with_raw_argument() {
        let selector = parse_selector("p:lang(en)", 1).expect("parses");
        assert_eq!(selector.to_string(), "p:lang(en)");
    }

    #[test]
    fn test_invalid_selector() {
        let err = parse_selector("a { b", 3).expect_err("should fail");
        assert_eq!(err.code(), Some(ErrorCode::E104));
        assert_eq!(err.line(), Some(3));
        assert_eq!(
            err.message(),
            "Invalid CSS after \"a \": expected selector, was \"{ b\""
        );
    }

    #[test]
    fn test_adjacent_compounds_fail() {
        for text in ["&-b", "&b", ".a > &-b"] {
            let err = parse_selector(text, 1).expect_err(text);
            assert_eq!(err.code(), Some(ErrorCode::E104));
        }
        assert_eq!(parse_selector("a>b", 1).expect("parses").to_string(), "a > b");
        assert_eq!(parse_selector("&.b", 1).expect("parses").to_string(), "&.b");
    }

    #[test]
    fn test_trailing_comma_fails() {
        assert!(parse_selector("a,", 1).is_err());
    }
}
