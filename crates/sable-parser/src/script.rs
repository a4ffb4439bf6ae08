//! SassScript expression parser.
//!
//! A precedence-climbing parser over [`Lexer`] tokens. From loosest to
//! tightest the levels are: comma lists, `=` (kept for IE filters),
//! interpolation, space lists, the binary operators by
//! [`BinaryOp::precedence`], unary operators and primaries.
//!
//! An operator directly adjacent to `#{}` is not an operator at all: it
//! becomes literal text of an [`ExprKind::Interpolation`], so `#{$a}/#{$b}`
//! stays `a/b` and `1-#{$x}` stays `1-x`.

use log::trace;

use sable_core::value::{Color, ListSeparator, SassString, Value};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    lexer::Lexer,
    scanner::expected_at,
    span::{LineIndex, Span},
    tokens::{Op, Token, TokenKind},
    tree::{BinaryOp, CallArgs, Expr, ExprKind, InterpPart, Param, UnaryOp},
};

const EXPRESSION: &str = "expression (e.g. 1px, bold)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Comma,
    Equals,
    Space,
    Binary(u8),
}

pub struct ScriptParser<'src> {
    lexer: Lexer<'src>,
    in_parens: bool,
    stop_at: &'static [&'static str],
}

impl<'src> ScriptParser<'src> {
    /// Create a parser over `src[start..limit]`.
    pub fn new(src: &'src str, lines: &'src LineIndex, start: usize, limit: usize) -> Self {
        Self {
            lexer: Lexer::new(src, lines, start, limit),
            in_parens: false,
            stop_at: &[],
        }
    }

    /// Treat these identifiers as the end of the expression, as `to` and
    /// `through` end the first bound of an `@for`.
    pub fn with_stop_at(mut self, words: &'static [&'static str]) -> Self {
        self.stop_at = words;
        self
    }

    /// The offset of the first character not consumed by the parser.
    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    /// Parse a required expression.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.assert_level(Level::Comma)?;
        self.lexer.unpeek();
        Ok(expr)
    }

    /// Parse the body of a `#{...}` whose opening the caller consumed,
    /// including the closing `}`.
    pub fn parse_interpolated(&mut self) -> Result<Expr> {
        self.lexer.enter_interpolation();
        self.interpolated_body()
    }

    /// Parse the optional parenthesized arguments of an `@include`.
    pub fn parse_include_args(&mut self) -> Result<CallArgs> {
        if !self.eat_op(Op::LParen)? {
            self.lexer.unpeek();
            return Ok(CallArgs::default());
        }
        let args = self.call_args(Level::Space)?;
        self.expect_op(Op::RParen, "\")\"")?;
        self.lexer.unpeek();
        Ok(args)
    }

    /// Parse the parameter list of a `@mixin` or `@function` definition.
    pub fn parse_definition_params(&mut self, require_parens: bool) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        if !self.eat_op(Op::LParen)? {
            if require_parens {
                return Err(self.expected("\"(\""));
            }
            self.lexer.unpeek();
            return Ok(params);
        }
        if !self.eat_op(Op::RParen)? {
            loop {
                let token = self.lexer.next()?;
                let TokenKind::Variable(name) = token.kind else {
                    return Err(self.expected_at_token(&token, "variable (e.g. $foo)"));
                };
                let default = if self.eat_op(Op::Colon)? || self.eat_op(Op::SingleEq)? {
                    let value = self.space()?;
                    Some(self.require(value)?)
                } else {
                    if params.iter().any(|p| p.default.is_some()) {
                        return Err(self
                            .error(
                                ErrorCode::E302,
                                format!(
                                    "Required argument ${name} must come before any optional arguments."
                                ),
                                token.span,
                            )
                            .with_line(token.line));
                    }
                    None
                };
                params.push(Param { name, default });
                if !self.eat_op(Op::Comma)? {
                    break;
                }
            }
            self.expect_op(Op::RParen, "\")\"")?;
        }
        self.lexer.unpeek();
        Ok(params)
    }

    /// Fail unless only whitespace and comments remain.
    pub fn expect_done(&mut self, what: &str) -> Result<()> {
        if self.lexer.is_done()? {
            self.lexer.unpeek();
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn parse_level(&mut self, level: Level) -> Result<Option<Expr>> {
        match level {
            Level::Comma => self.comma(),
            Level::Equals => self.equals(),
            Level::Space => self.space(),
            Level::Binary(min) => self.binary(min),
        }
    }

    fn assert_level(&mut self, level: Level) -> Result<Expr> {
        let expr = self.parse_level(level)?;
        self.require(expr)
    }

    fn require(&mut self, expr: Option<Expr>) -> Result<Expr> {
        match expr {
            Some(expr) => Ok(expr),
            None => Err(self.expected(EXPRESSION)),
        }
    }

    fn comma(&mut self) -> Result<Option<Expr>> {
        if let Some(interp) = self.try_ops_after_interp(Level::Comma)? {
            return Ok(Some(interp));
        }
        let Some(first) = self.equals()? else {
            return Ok(None);
        };
        let mut items = vec![first];
        while self.peek_op(Op::Comma)? {
            let comma = self.lexer.next()?;
            if self.at_interpolation()? {
                let prev = list_or_single(items, ListSeparator::Comma);
                return self.op_before_interp(&comma, Some(prev)).map(Some);
            }
            items.push(self.assert_level(Level::Equals)?);
        }
        Ok(Some(list_or_single(items, ListSeparator::Comma)))
    }

    fn equals(&mut self) -> Result<Option<Expr>> {
        if let Some(interp) = self.try_ops_after_interp(Level::Equals)? {
            return Ok(Some(interp));
        }
        let Some(mut expr) = self.interpolation()? else {
            return Ok(None);
        };
        while self.peek_op(Op::SingleEq)? {
            let eq = self.lexer.next()?;
            if self.at_interpolation()? {
                return self.op_before_interp(&eq, Some(expr)).map(Some);
            }
            let right = self.interpolation()?;
            let right = self.require(right)?;
            expr = binary(BinaryOp::SingleEq, expr, right);
        }
        Ok(Some(expr))
    }

    fn interpolation(&mut self) -> Result<Option<Expr>> {
        let first = self.space()?;
        if !self.at_interpolation()? {
            return Ok(first);
        }
        let expr = self.interpolation_step(first)?;
        self.interpolation_chain(expr).map(Some)
    }

    /// Consume `#{mid}` and the space list after it.
    fn interpolation_step(&mut self, before: Option<Expr>) -> Result<Expr> {
        let open = self.lexer.next()?;
        let mid = self.interpolated_body()?;
        let ws_after = self.lexer.whitespace_after();
        let after = self.space()?;
        let start = before.as_ref().map_or(open.span, |b| b.span);
        let end = after.as_ref().map_or(mid.span, |a| a.span);
        Ok(Expr::new(
            ExprKind::Interpolation {
                before: before.map(Box::new),
                mid: Box::new(mid),
                after: after.map(Box::new),
                ws_before: open.whitespace_before,
                ws_after,
            },
            open.line,
            start.union(end),
        ))
    }

    fn interpolation_chain(&mut self, mut expr: Expr) -> Result<Expr> {
        while self.at_interpolation()? {
            expr = self.interpolation_step(Some(expr))?;
        }
        Ok(expr)
    }

    fn interpolated_body(&mut self) -> Result<Expr> {
        let expr = self.assert_level(Level::Comma)?;
        let close = self.lexer.next()?;
        if close.kind != TokenKind::EndInterpolation {
            return Err(self.expected_at_token(&close, "\"}\""));
        }
        Ok(expr)
    }

    /// An operator written right after `#{}` is literal text.
    fn try_ops_after_interp(&mut self, level: Level) -> Result<Option<Expr>> {
        if !self.lexer.after_interpolation() {
            return Ok(None);
        }
        let operand_level = match (level, self.lexer.peek()?.kind.clone()) {
            (Level::Comma, TokenKind::Op(Op::Comma)) => Level::Comma,
            (Level::Equals, TokenKind::Op(Op::SingleEq)) => Level::Equals,
            (Level::Binary(min), TokenKind::Op(op)) => match binary_op(op) {
                Some(op) if op.precedence() >= min => Level::Binary(op.precedence()),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        let op = self.lexer.next()?;
        if self.at_interpolation()? {
            return self.op_before_interp(&op, None).map(Some);
        }
        let ws_after = self.lexer.whitespace_after();
        let after = self.assert_level(operand_level)?;
        let span = op.span.union(after.span);
        Ok(Some(Expr::new(
            ExprKind::Interpolation {
                before: None,
                mid: Box::new(op_text(&op)),
                after: Some(Box::new(after)),
                ws_before: false,
                ws_after,
            },
            op.line,
            span,
        )))
    }

    /// An operator written right before `#{}` is literal text.
    fn op_before_interp(&mut self, op: &Token, prev: Option<Expr>) -> Result<Expr> {
        trace!(op:% = op; "operator before interpolation");
        let span = prev.as_ref().map_or(op.span, |p| p.span.union(op.span));
        let interp = Expr::new(
            ExprKind::Interpolation {
                before: prev.map(Box::new),
                mid: Box::new(op_text(op)),
                after: None,
                ws_before: op.whitespace_before,
                ws_after: false,
            },
            op.line,
            span,
        );
        self.interpolation_chain(interp)
    }

    fn space(&mut self) -> Result<Option<Expr>> {
        let Some(first) = self.binary(1)? else {
            return Ok(None);
        };
        let mut items = vec![first];
        while let Some(expr) = self.binary(1)? {
            items.push(expr);
        }
        Ok(Some(list_or_single(items, ListSeparator::Space)))
    }

    fn binary(&mut self, min: u8) -> Result<Option<Expr>> {
        if let Some(interp) = self.try_ops_after_interp(Level::Binary(min))? {
            return Ok(Some(interp));
        }
        let Some(mut left) = self.unary()? else {
            return Ok(None);
        };
        loop {
            let op = match &self.lexer.peek()?.kind {
                TokenKind::Op(op) => binary_op(*op),
                _ => None,
            };
            let Some(op) = op.filter(|op| op.precedence() >= min) else {
                break;
            };
            let token = self.lexer.next()?;
            if self.at_interpolation()? {
                return self.op_before_interp(&token, Some(left)).map(Some);
            }
            let right = self.binary(op.precedence() + 1)?;
            let right = self.require(right)?;
            left = binary(op, left, right);
        }
        Ok(Some(left))
    }

    fn unary(&mut self) -> Result<Option<Expr>> {
        let op = match &self.lexer.peek()?.kind {
            TokenKind::Op(Op::Plus) => UnaryOp::Plus,
            TokenKind::Op(Op::Minus) => UnaryOp::Minus,
            TokenKind::Op(Op::Div) => UnaryOp::Div,
            TokenKind::Op(Op::Not) => UnaryOp::Not,
            _ => return self.primary(),
        };
        let token = self.lexer.next()?;
        if self.at_interpolation()? {
            return self.op_before_interp(&token, None).map(Some);
        }
        let operand = self.unary()?;
        let operand = self.require(operand)?;
        let span = token.span.union(operand.span);
        Ok(Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            token.line,
            span,
        )))
    }

    fn primary(&mut self) -> Result<Option<Expr>> {
        let kind = self.lexer.peek()?.kind.clone();
        let expr = match kind {
            TokenKind::Function(name) => {
                let token = self.lexer.next()?;
                let args = self.call_args(Level::Equals)?;
                let close = self.expect_op(Op::RParen, "\")\"")?;
                Expr::new(
                    ExprKind::Call { name, args },
                    token.line,
                    token.span.union(close.span),
                )
            }
            TokenKind::Str { text, quotes } => {
                let token = self.lexer.next()?;
                Expr::literal(
                    Value::Str(SassString::new(text, quotes)),
                    token.line,
                    token.span,
                )
            }
            TokenKind::StrStart { text, quotes } => {
                let token = self.lexer.next()?;
                let (parts, end) = self.string_parts(text)?;
                Expr::new(
                    ExprKind::Str { quotes, parts },
                    token.line,
                    token.span.union(end),
                )
            }
            TokenKind::Op(Op::LParen) => self.paren()?,
            TokenKind::Variable(name) => {
                let token = self.lexer.next()?;
                Expr::new(ExprKind::Variable(name), token.line, token.span)
            }
            TokenKind::Number(number) => {
                let token = self.lexer.next()?;
                let number = if self.in_parens {
                    number.without_original()
                } else {
                    number
                };
                Expr::literal(Value::Number(number), token.line, token.span)
            }
            TokenKind::Color(color) => {
                let token = self.lexer.next()?;
                Expr::literal(Value::Color(color), token.line, token.span)
            }
            TokenKind::Bool(value) => {
                let token = self.lexer.next()?;
                Expr::literal(Value::Bool(value), token.line, token.span)
            }
            TokenKind::Ident(name) => {
                if self.stop_at.iter().any(|w| w.eq_ignore_ascii_case(&name)) {
                    return Ok(None);
                }
                let token = self.lexer.next()?;
                let value = match Color::named(&name) {
                    Some(color) => Value::Color(color),
                    None => Value::unquoted(name),
                };
                Expr::literal(value, token.line, token.span)
            }
            TokenKind::Flag(flag) if flag == "important" => {
                let token = self.lexer.next()?;
                Expr::literal(Value::unquoted("!important"), token.line, token.span)
            }
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    fn paren(&mut self) -> Result<Expr> {
        let open = self.lexer.next()?;
        let was_in_parens = std::mem::replace(&mut self.in_parens, true);
        let inner = self.comma();
        self.in_parens = was_in_parens;
        let inner = inner?;
        let close = self.expect_op(Op::RParen, "\")\"")?;
        let span = open.span.union(close.span);
        let kind = match inner {
            Some(inner) => ExprKind::Paren(Box::new(inner)),
            None => ExprKind::List {
                items: Vec::new(),
                separator: ListSeparator::Space,
            },
        };
        Ok(Expr::new(kind, open.line, span))
    }

    /// The parts of a quoted string after its [`TokenKind::StrStart`].
    fn string_parts(&mut self, first: String) -> Result<(Vec<InterpPart>, Span)> {
        let mut parts = Vec::new();
        if !first.is_empty() {
            parts.push(InterpPart::Text(first));
        }
        loop {
            parts.push(InterpPart::Expr(self.assert_level(Level::Comma)?));
            let token = self.lexer.next()?;
            let text = match token.kind {
                TokenKind::StrMid(text) => text,
                TokenKind::StrEnd(text) => {
                    if !text.is_empty() {
                        parts.push(InterpPart::Text(text));
                    }
                    return Ok((parts, token.span));
                }
                _ => return Err(self.expected_at_token(&token, "\"}\"")),
            };
            if !text.is_empty() {
                parts.push(InterpPart::Text(text));
            }
        }
    }

    fn call_args(&mut self, level: Level) -> Result<CallArgs> {
        let mut args = CallArgs::default();
        if self.peek_op(Op::RParen)? {
            return Ok(args);
        }
        loop {
            let expr = self.assert_level(level)?;
            if self.peek_op(Op::Colon)? {
                let ExprKind::Variable(name) = &expr.kind else {
                    return Err(self.expected("comma"));
                };
                let name = name.clone();
                self.lexer.next()?;
                let value = self.assert_level(level)?;
                let key = name.replace('_', "-");
                if args.keywords.iter().any(|(n, _)| n.replace('_', "-") == key) {
                    return Err(self
                        .error(
                            ErrorCode::E302,
                            format!("Keyword argument \"${name}\" passed more than once"),
                            expr.span,
                        )
                        .with_line(expr.line));
                }
                args.keywords.push((name, value));
            } else if !args.keywords.is_empty() {
                return Err(self
                    .error(
                        ErrorCode::E302,
                        "Positional arguments must come before keyword arguments.",
                        expr.span,
                    )
                    .with_line(expr.line));
            } else {
                args.positional.push(expr);
            }
            if !self.eat_op(Op::Comma)? {
                return Ok(args);
            }
        }
    }

    fn at_interpolation(&mut self) -> Result<bool> {
        Ok(self.lexer.peek()?.kind == TokenKind::BeginInterpolation)
    }

    fn peek_op(&mut self, op: Op) -> Result<bool> {
        Ok(self.lexer.peek()?.is_op(op))
    }

    fn eat_op(&mut self, op: Op) -> Result<bool> {
        if self.peek_op(op)? {
            self.lexer.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_op(&mut self, op: Op, what: &str) -> Result<Token> {
        let token = self.lexer.next()?;
        if token.is_op(op) {
            Ok(token)
        } else {
            Err(self.expected_at_token(&token, what))
        }
    }

    /// An "Invalid CSS" error at the next token.
    fn expected(&mut self, what: &str) -> Diagnostic {
        let pos = self.lexer.peek().map(|token| token.span.start());
        let pos = pos.unwrap_or_else(|_| self.lexer.position());
        self.lexer.unpeek();
        expected_at(self.lexer.src(), self.lexer.lines(), pos, self.lexer.limit(), what)
    }

    fn expected_at_token(&self, token: &Token, what: &str) -> Diagnostic {
        let pos = if token.is_eof() {
            self.lexer.limit()
        } else {
            token.span.start()
        };
        expected_at(self.lexer.src(), self.lexer.lines(), pos, self.lexer.limit(), what)
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> Diagnostic {
        let message = message.into();
        Diagnostic::error(message.clone())
            .with_code(code)
            .with_label(span, message)
    }
}

fn binary_op(op: Op) -> Option<BinaryOp> {
    Some(match op {
        Op::Or => BinaryOp::Or,
        Op::And => BinaryOp::And,
        Op::Eq => BinaryOp::Eq,
        Op::Neq => BinaryOp::Neq,
        Op::Gt => BinaryOp::Gt,
        Op::Gte => BinaryOp::Gte,
        Op::Lt => BinaryOp::Lt,
        Op::Lte => BinaryOp::Lte,
        Op::Plus => BinaryOp::Plus,
        Op::Minus => BinaryOp::Minus,
        Op::Times => BinaryOp::Times,
        Op::Div => BinaryOp::Div,
        Op::Mod => BinaryOp::Mod,
        _ => return None,
    })
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.union(right.span);
    let line = left.line;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        line,
        span,
    )
}

fn op_text(op: &Token) -> Expr {
    Expr::literal(Value::unquoted(op.to_string()), op.line, op.span)
}

fn list_or_single(mut items: Vec<Expr>, separator: ListSeparator) -> Expr {
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return item;
        }
    }
    let line = items.first().map_or(1, |e| e.line);
    let span = match (items.first(), items.last()) {
        (Some(first), Some(last)) => first.span.union(last.span),
        _ => Span::default(),
    };
    Expr::new(ExprKind::List { items, separator }, line, span)
}

/// Convenience for callers holding a whole expression source.
pub(crate) fn parse_all(src: &str, lines: &LineIndex) -> Result<Expr> {
    let mut parser = ScriptParser::new(src, lines, 0, src.len());
    let expr = parser.parse()?;
    parser.expect_done(EXPRESSION)?;
    Ok(expr)
}
