//! Character-level scanning shared by the lexer and both front-ends.
//!
//! Small token recognizers are winnow parsers over `&str`; [`Scanner`]
//! drives them from a byte position inside the full source so every
//! consumer reports offsets and lines against the same text.

use winnow::{
    Parser,
    combinator::{alt, opt, repeat},
    error::{ContextError, ErrMode},
    token::{any, one_of, take_till, take_until, take_while},
};

use crate::{
    error::{Diagnostic, ErrorCode},
    span::{LineIndex, Span},
};

pub(crate) type PResult<O> = Result<O, ErrMode<ContextError>>;

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// `\` followed by any character.
pub(crate) fn escape(input: &mut &str) -> PResult<()> {
    ('\\', any).void().parse_next(input)
}

/// A CSS identifier: `-?(namestart|escape)(namechar|escape)*`.
pub(crate) fn ident<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (
        opt('-'),
        alt((one_of(is_name_start).void(), escape)),
        repeat::<_, _, (), _, _>(0.., alt((take_while(1.., is_name_char).void(), escape))),
    )
        .take()
        .parse_next(input)
}

/// One or more name characters, used after `$` and for `%` placeholders.
pub(crate) fn name<'i>(input: &mut &'i str) -> PResult<&'i str> {
    repeat::<_, _, (), _, _>(1.., alt((take_while(1.., is_name_char).void(), escape)))
        .take()
        .parse_next(input)
}

/// A complete `/* ... */` comment.
pub(crate) fn block_comment<'i>(input: &mut &'i str) -> PResult<&'i str> {
    ("/*", take_until(0.., "*/"), "*/").take().parse_next(input)
}

/// A `//` comment, up to but excluding the newline.
pub(crate) fn line_comment<'i>(input: &mut &'i str) -> PResult<&'i str> {
    ("//", take_till(0.., ['\n', '\r'])).take().parse_next(input)
}

/// The digits and unit of a number: `(\d*\.\d+|\d+)([a-zA-Z%]+)?`.
pub(crate) fn number_literal<'i>(input: &mut &'i str) -> PResult<(&'i str, &'i str)> {
    let digits = alt((
        (
            take_while(0.., |c: char| c.is_ascii_digit()),
            '.',
            take_while(1.., |c: char| c.is_ascii_digit()),
        )
            .take(),
        take_while(1.., |c: char| c.is_ascii_digit()),
    ));
    (
        digits,
        take_while(0.., |c: char| c.is_ascii_alphabetic() || c == '%'),
    )
        .parse_next(input)
}

/// `#rgb` or `#rrggbb`, not followed by another name character.
pub(crate) fn hex_color<'i>(input: &mut &'i str) -> PResult<&'i str> {
    ('#', take_while(3..=6, |c: char| c.is_ascii_hexdigit()))
        .take()
        .verify(|text: &str| text.len() == 4 || text.len() == 7)
        .parse_next(input)
        .and_then(|text| {
            if input.starts_with(is_name_char) {
                Err(ErrMode::Backtrack(ContextError::new()))
            } else {
                Ok(text)
            }
        })
}

/// A unicode range such as `U+0025-00FF` or `u+4??`.
pub(crate) fn unicode_range<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (
        one_of(['u', 'U']),
        '+',
        take_while(1..=6, |c: char| c.is_ascii_hexdigit() || c == '?'),
        opt(('-', take_while(1..=6, |c: char| c.is_ascii_hexdigit()))),
    )
        .take()
        .parse_next(input)
}

/// Run `parser` at the start of `rest`, returning its output and the
/// number of bytes it consumed.
pub(crate) fn scan_prefix<'i, O>(
    rest: &'i str,
    mut parser: impl Parser<&'i str, O, ErrMode<ContextError>>,
) -> Option<(O, usize)> {
    let mut input = rest;
    let output = parser.parse_next(&mut input).ok()?;
    Some((output, rest.len() - input.len()))
}

/// The `Invalid CSS after "...": expected X, was "..."` message.
pub(crate) fn invalid_css(src: &str, pos: usize, limit: usize, expected: &str) -> String {
    let pos = pos.min(limit).min(src.len());
    let before = &src[..pos];
    let before = before.trim_end_matches([' ', '\t']);
    let before = if before.ends_with('\n') {
        before.trim_end()
    } else {
        &src[..pos]
    };
    let before = before.rsplit('\n').next().unwrap_or_default();
    let after = abbreviate_end(before);

    let rest = &src[pos..limit.min(src.len())];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let rest = if trimmed.starts_with(['\n', '\r']) {
        rest.trim_start()
    } else {
        rest
    };
    let was = rest.split(['\n', '\r']).next().unwrap_or_default();
    let was = abbreviate_start(was);

    format!("Invalid CSS after \"{after}\": expected {expected}, was \"{was}\"")
}

fn abbreviate_end(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > 18 {
        format!("...{}", chars[chars.len() - 15..].iter().collect::<String>())
    } else {
        text.to_string()
    }
}

fn abbreviate_start(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > 18 {
        format!("{}...", chars[..15].iter().collect::<String>())
    } else {
        text.to_string()
    }
}

/// A cursor over a region of the source.
#[derive(Debug, Clone)]
pub(crate) struct Scanner<'src> {
    src: &'src str,
    lines: &'src LineIndex,
    pos: usize,
    limit: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str, lines: &'src LineIndex, start: usize, limit: usize) -> Self {
        Self {
            src,
            lines,
            pos: start,
            limit: limit.min(src.len()),
        }
    }

    pub fn src(&self) -> &'src str {
        self.src
    }

    pub fn lines(&self) -> &'src LineIndex {
        self.lines
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.limit);
    }

    pub fn rest(&self) -> &'src str {
        &self.src[self.pos..self.limit]
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.limit
    }

    pub fn line(&self) -> usize {
        self.lines.line(self.pos)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn starts_with(&self, text: &str) -> bool {
        self.rest().starts_with(text)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `text` if the input starts with it.
    pub fn eat(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    /// Consume `word` case-insensitively if it is not followed by a name character.
    pub fn eat_keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        let matches = rest.len() >= word.len()
            && rest.is_char_boundary(word.len())
            && rest[..word.len()].eq_ignore_ascii_case(word)
            && !rest[word.len()..].starts_with(is_name_char);
        if matches {
            self.pos += word.len();
        }
        matches
    }

    /// Run a recognizer at the cursor, consuming what it matched.
    pub fn scan<O>(&mut self, parser: impl Parser<&'src str, O, ErrMode<ContextError>>) -> Option<O> {
        let (output, len) = scan_prefix(self.rest(), parser)?;
        self.pos += len;
        Some(output)
    }

    /// Skip spaces, tabs and newlines. Returns whether anything was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        let len = self.rest().len() - self.rest().trim_start().len();
        self.pos += len;
        self.pos > start
    }

    /// Skip whitespace and silent `//` comments, stopping at `/*`.
    pub fn skip_whitespace_and_silent_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.scan(line_comment).is_none() {
                break;
            }
        }
    }

    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start..self.pos)
    }

    /// An "expected X" parse error at the cursor.
    pub fn expected(&self, what: &str) -> Diagnostic {
        expected_at(self.src, self.lines, self.pos, self.limit, what)
    }

    /// A parse error with a custom message at the cursor.
    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> Diagnostic {
        let end = self.peek_char().map_or(self.pos, |c| self.pos + c.len_utf8());
        Diagnostic::error(message)
            .with_code(code)
            .with_line(self.line())
            .with_label(Span::new(self.pos..end), code.description())
    }
}

/// An "expected X" parse error at `pos`.
pub(crate) fn expected_at(
    src: &str,
    lines: &LineIndex,
    pos: usize,
    limit: usize,
    what: &str,
) -> Diagnostic {
    let end = src[pos.min(src.len())..]
        .chars()
        .next()
        .map_or(pos, |c| pos + c.len_utf8());
    let code = if pos >= limit {
        ErrorCode::E101
    } else {
        ErrorCode::E100
    };
    Diagnostic::error(invalid_css(src, pos, limit, what))
        .with_code(code)
        .with_line(lines.line(pos.min(src.len())))
        .with_label(Span::new(pos..end), format!("expected {what}"))
}
