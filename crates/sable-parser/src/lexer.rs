//! Lexical analyzer for SassScript.
//!
//! The lexer produces one [`Token`] at a time from a byte range of the
//! source, with a single token of lookahead. Interpolation is re-entrant:
//! `#{` inside plain script, a quoted string or a raw special function
//! pushes a [`Frame`], and the matching `}` pops it and resumes whatever
//! was being lexed before. No second lexer is ever created.

use log::trace;

use sable_core::value::{Color, Number, QuoteKind};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    scanner::{
        self, block_comment, hex_color, ident, is_name_char, line_comment,
        number_literal, scan_prefix, unicode_range,
    },
    span::{LineIndex, Span},
    tokens::{Op, Token, TokenKind},
};

/// What a `}` returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// `#{` in plain SassScript.
    Plain,
    /// `#{` inside a string opened with this quote character.
    Quoted(char),
    /// `#{` inside a raw special function, at this parenthesis depth.
    Special { depth: usize },
}

/// A token that was lexed ahead of time, with the state to restore if it
/// is given back.
#[derive(Debug, Clone)]
struct Peeked {
    token: Token,
    pos_before: usize,
    stack_before: Vec<Frame>,
    after_interpolation_before: bool,
}

/// Names lexed as raw text up to their matching `)`.
const RAW_FUNCTIONS: &[&str] = &["calc", "expression", "element"];

pub struct Lexer<'src> {
    src: &'src str,
    lines: &'src LineIndex,
    pos: usize,
    limit: usize,
    stack: Vec<Frame>,
    peeked: Option<Peeked>,
    after_interpolation: bool,
}

impl<'src> Lexer<'src> {
    /// Create a lexer over `src[start..limit]`.
    pub fn new(src: &'src str, lines: &'src LineIndex, start: usize, limit: usize) -> Self {
        let limit = limit.min(src.len());
        Self {
            src,
            lines,
            pos: start.min(limit),
            limit,
            stack: Vec::new(),
            peeked: None,
            after_interpolation: false,
        }
    }

    pub fn src(&self) -> &'src str {
        self.src
    }

    pub fn lines(&self) -> &'src LineIndex {
        self.lines
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The offset of the first unconsumed character.
    ///
    /// A peeked token counts as unconsumed.
    pub fn position(&self) -> usize {
        self.peeked.as_ref().map_or(self.pos, |p| p.pos_before)
    }

    /// Whether the last consumed token closed a `#{}` in plain script.
    pub fn after_interpolation(&self) -> bool {
        match &self.peeked {
            Some(peeked) => peeked.after_interpolation_before,
            None => self.after_interpolation,
        }
    }

    /// Whether whitespace surrounds the current position.
    pub fn whitespace_after(&self) -> bool {
        if let Some(peeked) = &self.peeked {
            return peeked.token.whitespace_before;
        }
        self.src[self.pos..].starts_with(char::is_whitespace)
            || self.src[..self.pos].ends_with(char::is_whitespace)
    }

    /// Treat the input as following a `#{` the caller already consumed, so
    /// the next top-level `}` lexes as [`TokenKind::EndInterpolation`].
    pub fn enter_interpolation(&mut self) {
        self.unpeek();
        self.stack.push(Frame::Plain);
    }

    pub fn peek(&mut self) -> Result<&Token> {
        let peeked = match self.peeked.take() {
            Some(peeked) => peeked,
            None => {
                let pos_before = self.pos;
                let stack_before = self.stack.clone();
                let after_interpolation_before = self.after_interpolation;
                Peeked {
                    token: self.lex()?,
                    pos_before,
                    stack_before,
                    after_interpolation_before,
                }
            }
        };
        Ok(&self.peeked.insert(peeked).token)
    }

    pub fn next(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(peeked) => Ok(peeked.token),
            None => self.lex(),
        }
    }

    /// Give back a peeked token, restoring the lexer to the state before it.
    pub fn unpeek(&mut self) {
        if let Some(peeked) = self.peeked.take() {
            self.pos = peeked.pos_before;
            self.stack = peeked.stack_before;
            self.after_interpolation = peeked.after_interpolation_before;
        }
    }

    /// Whether only whitespace and comments remain.
    pub fn is_done(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_eof())
    }

    fn rest(&self) -> &'src str {
        &self.src[self.pos..self.limit]
    }

    fn lex(&mut self) -> Result<Token> {
        self.skip_whitespace()?;
        let start = self.pos;
        let whitespace_before = self.src[..start].ends_with(char::is_whitespace);
        let kind = self.lex_kind(start, whitespace_before)?;
        self.after_interpolation = kind == TokenKind::EndInterpolation;
        let token = Token {
            kind,
            span: Span::new(start..self.pos),
            line: self.lines.line(start),
            whitespace_before,
        };
        trace!(token:% = token.kind, offset = start; "lexed token");
        Ok(token)
    }

    fn lex_kind(&mut self, start: usize, whitespace_before: bool) -> Result<TokenKind> {
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(TokenKind::Eof);
        };
        let next = rest[c.len_utf8()..].chars().next();

        match c {
            '$' => {
                let (name, len) = scan_prefix(&rest[1..], scanner::name)
                    .ok_or_else(|| self.unexpected_char(start))?;
                self.pos += 1 + len;
                return Ok(TokenKind::Variable(name.to_string()));
            }
            '"' | '\'' => {
                self.pos += 1;
                return self.string_body(c, true);
            }
            '#' if next == Some('{') => {
                self.pos += 2;
                self.stack.push(Frame::Plain);
                return Ok(TokenKind::BeginInterpolation);
            }
            '#' => {
                if let Some((text, len)) = scan_prefix(rest, hex_color) {
                    let color = Color::from_hex(text).ok_or_else(|| self.unexpected_char(start))?;
                    self.pos += len;
                    return Ok(TokenKind::Color(color));
                }
                return Err(self.unexpected_char(start));
            }
            '}' => return self.close_brace(),
            _ => {}
        }

        if let Some(kind) = self.number(rest, whitespace_before) {
            return Ok(kind);
        }
        if let Some(kind) = self.bool(rest) {
            return Ok(kind);
        }
        if let Some((text, len)) = scan_prefix(rest, unicode_range) {
            self.pos += len;
            return Ok(TokenKind::Str {
                text: text.to_string(),
                quotes: QuoteKind::Unquoted,
            });
        }
        if let Some(prefix_len) = self.special_function_prefix(rest) {
            let prefix = rest[..prefix_len].to_string();
            self.pos += prefix_len;
            return self.special_body(prefix, 1, true);
        }
        if c == '!' {
            if next == Some('=') {
                self.pos += 2;
                return Ok(TokenKind::Op(Op::Neq));
            }
            let after_bang = rest[1..].trim_start();
            if let Some((flag, len)) = scan_prefix(after_bang, ident) {
                self.pos += rest.len() - after_bang.len() + len;
                return Ok(TokenKind::Flag(flag.to_ascii_lowercase()));
            }
            return Err(self.unexpected_char(start));
        }
        if let Some(kind) = self.ident_op(rest) {
            return Ok(kind);
        }
        if let Some((name, len)) = scan_prefix(rest, ident) {
            self.pos += len;
            if self.rest().starts_with('(') {
                self.pos += 1;
                return Ok(TokenKind::Function(name.to_string()));
            }
            return Ok(TokenKind::Ident(name.to_string()));
        }
        if let Some(op) = self.op(rest) {
            self.pos += op.as_str().len();
            return Ok(TokenKind::Op(op));
        }
        Err(self.unexpected_char(start))
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("/*") {
                match scan_prefix(trimmed, block_comment) {
                    Some((_, len)) => self.pos += len,
                    None => {
                        return Err(Diagnostic::error("Unterminated comment.")
                            .with_code(ErrorCode::E004)
                            .with_line(self.lines.line(self.pos))
                            .with_label(Span::new(self.pos..self.limit), "comment starts here"));
                    }
                }
            } else if let Some((_, len)) = scan_prefix(trimmed, line_comment) {
                self.pos += len;
            } else {
                return Ok(());
            }
        }
    }

    fn close_brace(&mut self) -> Result<TokenKind> {
        self.pos += 1;
        match self.stack.pop() {
            None => Ok(TokenKind::Op(Op::RBrace)),
            Some(Frame::Plain) => Ok(TokenKind::EndInterpolation),
            Some(Frame::Quoted(quote)) => self.string_body(quote, false),
            Some(Frame::Special { depth }) => self.special_body(String::new(), depth, false),
        }
    }

    /// Lex string text after an opening quote (`first`) or after the `}` of
    /// an interpolation inside the string.
    fn string_body(&mut self, quote: char, first: bool) -> Result<TokenKind> {
        let start = self.pos;
        let mut text = String::new();
        let mut chars = self.rest().char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) if escaped == quote || escaped == '#' => text.push(escaped),
                    Some((_, '\n')) => {}
                    Some((_, escaped)) => {
                        text.push('\\');
                        text.push(escaped);
                    }
                    None => break,
                },
                '#' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    self.pos = start + i + 2;
                    self.stack.push(Frame::Quoted(quote));
                    return Ok(if first {
                        TokenKind::StrStart {
                            text,
                            quotes: QuoteKind::Quoted,
                        }
                    } else {
                        TokenKind::StrMid(text)
                    });
                }
                '\n' | '\r' => break,
                c if c == quote => {
                    self.pos = start + i + 1;
                    return Ok(if first {
                        TokenKind::Str {
                            text,
                            quotes: QuoteKind::Quoted,
                        }
                    } else {
                        TokenKind::StrEnd(text)
                    });
                }
                c => text.push(c),
            }
        }
        let open = if first { start - 1 } else { start };
        Err(Diagnostic::error("Unterminated string.")
            .with_code(ErrorCode::E001)
            .with_line(self.lines.line(open))
            .with_label(Span::new(open..self.limit), "string starts here")
            .with_help(format!("add a closing `{quote}`")))
    }

    /// Lex raw special-function text up to the `)` that closes it.
    fn special_body(&mut self, mut text: String, mut depth: usize, first: bool) -> Result<TokenKind> {
        let start = self.pos;
        let mut chars = self.rest().char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        text.push(')');
                        self.pos = start + i + 1;
                        return Ok(if first {
                            TokenKind::Str {
                                text,
                                quotes: QuoteKind::Unquoted,
                            }
                        } else {
                            TokenKind::StrEnd(text)
                        });
                    }
                }
                '#' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    self.pos = start + i + 2;
                    self.stack.push(Frame::Special { depth });
                    return Ok(if first {
                        TokenKind::StrStart {
                            text,
                            quotes: QuoteKind::Unquoted,
                        }
                    } else {
                        TokenKind::StrMid(text)
                    });
                }
                _ => {}
            }
            text.push(c);
        }
        Err(Diagnostic::error("Unterminated function call: expected \")\".")
            .with_code(ErrorCode::E101)
            .with_line(self.lines.line(start))
            .with_label(Span::new(start..self.limit), "opened here"))
    }

    /// Numbers, including a leading `-` when it cannot be an operator.
    ///
    /// A `-` directly before digits is part of the number only when
    /// whitespace precedes it, so `1 -2` is a list while `1-2` and `(-2)`
    /// use the minus operator.
    fn number(&mut self, rest: &str, whitespace_before: bool) -> Option<TokenKind> {
        let (negative, body) = match rest.strip_prefix('-') {
            Some(body) if whitespace_before => (true, body),
            Some(_) => return None,
            None => (false, rest),
        };
        let ((digits, unit), len) = scan_prefix(body, number_literal)?;
        let value: f64 = digits.parse().ok()?;
        let value = if negative { -value } else { value };
        let number = if unit.is_empty() {
            Number::unitless(value)
        } else {
            Number::with_unit(value, unit)
        };
        let original = number.inspect();
        self.pos += len + usize::from(negative);
        Some(TokenKind::Number(number.with_original(original)))
    }

    fn bool(&mut self, rest: &str) -> Option<TokenKind> {
        for (word, value) in [("true", true), ("false", false)] {
            if rest.starts_with(word) && !rest[word.len()..].starts_with(is_name_char) {
                self.pos += word.len();
                return Some(TokenKind::Bool(value));
            }
        }
        None
    }

    fn ident_op(&mut self, rest: &str) -> Option<TokenKind> {
        for (word, op) in [("and", Op::And), ("or", Op::Or), ("not", Op::Not)] {
            let Some(after) = rest.strip_prefix(word) else {
                continue;
            };
            if !after.is_empty() && !after.starts_with(is_name_char) {
                self.pos += word.len();
                return Some(TokenKind::Op(op));
            }
        }
        None
    }

    /// The length of a raw special-function prefix such as `calc(` at the
    /// start of `rest`, if there is one.
    fn special_function_prefix(&self, rest: &str) -> Option<usize> {
        if rest.len() >= 7 && rest.is_char_boundary(7) && rest[..7].eq_ignore_ascii_case("progid:")
        {
            let name_len = rest[7..]
                .find(|c: char| !(c.is_ascii_alphabetic() || c == '.'))
                .unwrap_or(rest.len() - 7);
            let end = 7 + name_len;
            return rest[end..].starts_with('(').then_some(end + 1);
        }

        let (name, len) = scan_prefix(rest, ident)?;
        if !rest[len..].starts_with('(') {
            return None;
        }
        let lower = name.to_ascii_lowercase();
        if lower == "url" {
            return is_raw_url(&rest[len + 1..]).then_some(len + 1);
        }
        let bare = match lower.strip_prefix('-') {
            Some(prefixed) => prefixed.split_once('-').map_or("", |(_, name)| name),
            None => lower.as_str(),
        };
        if RAW_FUNCTIONS.contains(&lower.as_str()) || bare == "calc" {
            return Some(len + 1);
        }
        None
    }

    fn op(&self, rest: &str) -> Option<Op> {
        const TWO: &[(&str, Op)] = &[("==", Op::Eq), (">=", Op::Gte), ("<=", Op::Lte)];
        for (text, op) in TWO {
            if rest.starts_with(text) {
                return Some(*op);
            }
        }
        let op = match rest.chars().next()? {
            '+' => Op::Plus,
            '-' => Op::Minus,
            '*' => Op::Times,
            '/' => Op::Div,
            '%' => Op::Mod,
            '=' => Op::SingleEq,
            ':' => Op::Colon,
            '(' => Op::LParen,
            ')' => Op::RParen,
            ',' => Op::Comma,
            '>' => Op::Gt,
            '<' => Op::Lt,
            ';' => Op::Semicolon,
            '{' => Op::LBrace,
            _ => return None,
        };
        Some(op)
    }

    fn unexpected_char(&self, start: usize) -> Diagnostic {
        let c = self.src[start..].chars().next().unwrap_or(' ');
        Diagnostic::error(format!(
            "Syntax error in '{}' at character {}.",
            self.src[..self.limit]
                .get(self.line_start(start)..)
                .unwrap_or_default()
                .lines()
                .next()
                .unwrap_or_default()
                .trim(),
            start - self.line_start(start) + 1
        ))
        .with_code(ErrorCode::E002)
        .with_line(self.lines.line(start))
        .with_label(Span::new(start..start + c.len_utf8()), "unexpected character")
    }

    fn line_start(&self, offset: usize) -> usize {
        self.lines
            .line_start(self.lines.line(offset))
            .unwrap_or_default()
    }
}

/// Whether the text after `url(` is a bare URL: URL characters up to the
/// closing `)`, optionally followed by whitespace, or up to a `#{`.
fn is_raw_url(after_paren: &str) -> bool {
    let body = after_paren.trim_start();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ')' => return true,
            '#' if chars.peek() == Some(&'{') => return true,
            '\\' => {
                chars.next();
            }
            c if c.is_whitespace() => {
                return chars.find(|c| !c.is_whitespace()) == Some(')');
            }
            c if is_url_char(c) => {}
            _ => return false,
        }
    }
    false
}

fn is_url_char(c: char) -> bool {
    matches!(c, '#' | '%' | '&' | '*'..='~') || !c.is_ascii()
}
