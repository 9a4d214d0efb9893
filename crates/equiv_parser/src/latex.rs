//! LaTeX-style markup to expression trees.
//!
//! Hybrid approach: a nom tokenizer producing spanned tokens, then a
//! recursive descent parser that records a source span for every node it
//! builds.
//!
//! # Example
//! ```
//! use equiv_ast::Context;
//! use equiv_parser::parse_latex;
//!
//! let mut ctx = Context::new();
//! let id = parse_latex(&mut ctx, "\\frac{1}{2}x").unwrap();
//! assert_eq!(ctx.display(id).to_string(), "1/2 x");
//! ```

use crate::{MarkupParser, ParseError, ParserVersion};
use equiv_ast::{BinaryOp, Context, Delimiter, Expr, ExprId, Span, UnaryOp};
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize},
    sequence::pair,
    IResult,
};
use num_bigint::BigInt;
use num_rational::BigRational;

/// Function names recognised without a backslash. Longest names first so
/// that a word is split greedily (`arctanx` is `arctan x`).
const BARE_FUNCTIONS: &[&str] = &[
    "arcsin", "arccos", "arctan", "arctg", "cosec", "sinh", "cosh", "tanh", "sin", "cos",
    "tan", "cot", "sec", "csc", "ctg", "exp", "log", "abs", "tg", "ln",
];

/// Backslash commands that denote a function.
const FUNCTION_COMMANDS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "arcsin", "arccos",
    "arctan", "ln", "log", "exp", "tg", "ctg", "cosec", "arctg",
];

// ============================================================================
// Token Definition
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(String),
    Letter(char),
    /// Named constant or unknown command (`\pi`, `\alpha`).
    Symbol(String),
    Function(String),

    Plus,
    Minus,
    Times,
    Divide,
    Caret,
    Underscore,
    Comma,
    Pipe,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// `\{`
    LSet,
    /// `\}`
    RSet,

    Frac,
    Sqrt,
    Left,
    Right,
    OperatorName,
    Text,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number '{}'", n),
            Token::Letter(c) => format!("'{}'", c),
            Token::Symbol(s) => format!("'\\{}'", s),
            Token::Function(f) => format!("function '{}'", f),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Times => "multiplication sign".into(),
            Token::Divide => "division sign".into(),
            Token::Caret => "'^'".into(),
            Token::Underscore => "'_'".into(),
            Token::Comma => "','".into(),
            Token::Pipe => "'|'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LSet => "'\\{'".into(),
            Token::RSet => "'\\}'".into(),
            Token::Frac => "'\\frac'".into(),
            Token::Sqrt => "'\\sqrt'".into(),
            Token::Left => "'\\left'".into(),
            Token::Right => "'\\right'".into(),
            Token::OperatorName => "'\\operatorname'".into(),
            Token::Text => "'\\text'".into(),
        }
    }

    fn is_closing(&self) -> bool {
        matches!(
            self,
            Token::RParen | Token::RBracket | Token::RBrace | Token::RSet | Token::Right
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

// ============================================================================
// Tokenizer (using nom)
// ============================================================================

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn command_token(cmd: &str) -> Option<Token> {
    let token = match cmd {
        "frac" | "dfrac" | "tfrac" => Token::Frac,
        "sqrt" => Token::Sqrt,
        "cdot" | "times" => Token::Times,
        "div" => Token::Divide,
        "left" => Token::Left,
        "right" => Token::Right,
        "operatorname" => Token::OperatorName,
        "text" | "mathrm" | "textbf" => Token::Text,
        "quad" | "qquad" | "displaystyle" => return None,
        "lbrace" => Token::LSet,
        "rbrace" => Token::RSet,
        "vert" | "lvert" | "rvert" => Token::Pipe,
        _ if FUNCTION_COMMANDS.contains(&cmd) => Token::Function(cmd.to_string()),
        _ => Token::Symbol(cmd.to_string()),
    };
    Some(token)
}

/// `\name`, escaped braces and bars, or a spacing command (no token).
fn latex_command(input: &str) -> IResult<&str, Option<Token>> {
    let (input, _) = char('\\')(input)?;
    alt((
        map(take_while1(is_alpha), command_token),
        map(one_of(",;:! "), |_| None),
        map(char('{'), |_| Some(Token::LSet)),
        map(char('}'), |_| Some(Token::RSet)),
        map(char('|'), |_| Some(Token::Pipe)),
    ))(input)
}

/// Integer or decimal literal (`12`, `1.5`, `3.`).
fn number(input: &str) -> IResult<&str, Option<Token>> {
    map(recognize(pair(digit1, opt(pair(char('.'), digit0)))), |s: &str| {
        Some(Token::Number(s.to_string()))
    })(input)
}

fn operator_or_grouping(input: &str) -> IResult<&str, Option<Token>> {
    map(
        alt((
            map(char('+'), |_| Token::Plus),
            map(char('-'), |_| Token::Minus),
            map(char('*'), |_| Token::Times),
            map(char('/'), |_| Token::Divide),
            map(char('^'), |_| Token::Caret),
            map(char('_'), |_| Token::Underscore),
            map(char(','), |_| Token::Comma),
            map(char('|'), |_| Token::Pipe),
            map(char('{'), |_| Token::LBrace),
            map(char('}'), |_| Token::RBrace),
            map(char('('), |_| Token::LParen),
            map(char(')'), |_| Token::RParen),
            map(char('['), |_| Token::LBracket),
            map(char(']'), |_| Token::RBracket),
        )),
        Some,
    )(input)
}

fn letters(input: &str) -> IResult<&str, &str> {
    take_while1(is_alpha)(input)
}

/// Split a run of letters into single-letter variables and bare function
/// names, preferring the longest function name at each position.
fn split_word(word: &str, offset: usize, out: &mut Vec<Spanned>) {
    let mut i = 0;
    while i < word.len() {
        let rest = &word[i..];
        if let Some(name) = BARE_FUNCTIONS.iter().find(|f| rest.starts_with(**f)) {
            out.push(Spanned {
                token: Token::Function(name.to_string()),
                span: Span::new(offset + i, offset + i + name.len()),
            });
            i += name.len();
        } else {
            // ASCII only, so one byte per letter.
            let c = rest.as_bytes()[0] as char;
            out.push(Spanned {
                token: Token::Letter(c),
                span: Span::new(offset + i, offset + i + 1),
            });
            i += 1;
        }
    }
}

/// Tokenize a whole markup string.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    loop {
        let trimmed = remaining.trim_start();
        if trimmed.is_empty() {
            break;
        }
        let start = input.len() - trimmed.len();

        if let Ok((rest, word)) = letters(trimmed) {
            split_word(word, start, &mut tokens);
            remaining = rest;
            continue;
        }

        match alt((latex_command, number, operator_or_grouping))(trimmed) {
            Ok((rest, Some(Token::Text))) => {
                // \text{...} is a label, not math.
                remaining = skip_braced(rest);
            }
            Ok((rest, token)) => {
                let end = input.len() - rest.len();
                if let Some(token) = token {
                    tokens.push(Spanned {
                        token,
                        span: Span::new(start, end),
                    });
                }
                remaining = rest;
            }
            Err(_) => {
                let ch = trimmed.chars().next().unwrap_or('\0');
                return Err(ParseError::UnknownCharacter {
                    ch,
                    span: Span::new(start, start + ch.len_utf8()),
                });
            }
        }
    }

    Ok(tokens)
}

fn skip_braced(input: &str) -> &str {
    let trimmed = input.trim_start();
    if !trimmed.starts_with('{') {
        return input;
    }
    match trimmed.find('}') {
        Some(end) => &trimmed[end + 1..],
        None => "",
    }
}

fn parse_decimal(text: &str, span: Span) -> Result<BigRational, ParseError> {
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
    let digits = format!("{}{}", int_part, frac_part);
    let numer: BigInt = digits.parse().map_err(|_| ParseError::InvalidNumber {
        text: text.to_string(),
        span,
    })?;
    let denom = num_traits::pow(BigInt::from(10), frac_part.len());
    Ok(BigRational::new(numer, denom))
}

// ============================================================================
// Parser (Recursive Descent)
// ============================================================================

/// Deepest nesting of groups, scripts and signs accepted before parsing
/// stops with [`ParseError::NestingTooDeep`].
pub const MAX_NESTING_DEPTH: usize = 100;

pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    ctx: &'a mut Context,
    input_len: usize,
    /// Open `|...|` groups; inside one, a bar closes instead of starting a
    /// new factor.
    abs_depth: usize,
    /// Atoms and signs currently being parsed, innermost included.
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Spanned>, ctx: &'a mut Context, input_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            ctx,
            input_len,
            abs_depth: 0,
            nesting: 0,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.nesting >= MAX_NESTING_DEPTH {
            let span = self
                .tokens
                .get(self.pos)
                .map(|t| t.span)
                .unwrap_or_else(|| self.end_span());
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                span,
            });
        }
        self.nesting += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// TeX reads one digit as a script or `\frac` argument, so `x^12` is
    /// `x^1 2`. Splits the number token at the cursor accordingly.
    fn split_leading_digit(&mut self) {
        let Some(Spanned {
            token: Token::Number(text),
            span,
        }) = self.tokens.get(self.pos).cloned()
        else {
            return;
        };
        // `1.5` stays whole; only a run of digits is split.
        if !text.as_bytes().get(1).is_some_and(u8::is_ascii_digit) {
            return;
        }
        let (head, tail) = text.split_at(1);
        let split = span.start + 1;
        self.tokens[self.pos] = Spanned {
            token: Token::Number(tail.to_string()),
            span: Span::new(split, span.end),
        };
        self.tokens.insert(
            self.pos,
            Spanned {
                token: Token::Number(head.to_string()),
                span: Span::new(span.start, split),
            },
        );
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn end_span(&self) -> Span {
        Span::point(self.input_len)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(t) => ParseError::UnexpectedToken {
                found: t.token.describe(),
                expected: expected.to_string(),
                span: t.span,
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                span: self.end_span(),
            },
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Expect the closing partner of the delimiter opened at `open_span`.
    fn expect_close(&mut self, close: &Token, open: &str, open_span: Span) -> Result<(), ParseError> {
        match self.peek() {
            Some(t) if t == close => {
                self.pos += 1;
                Ok(())
            }
            Some(t) if !t.is_closing() => Err(self.unexpected(&close.describe())),
            _ => Err(ParseError::UnbalancedDelimiter {
                delimiter: open.to_string(),
                span: open_span,
            }),
        }
    }

    /// Record the span covering tokens `start..self.pos` for `id`.
    fn mark(&mut self, id: ExprId, start: usize) -> ExprId {
        if let (Some(first), Some(last)) = (
            self.tokens.get(start),
            self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)),
        ) {
            self.ctx.set_span(id, first.span.join(last.span));
        }
        id
    }

    /// Parse expression (lowest precedence: addition/subtraction)
    pub fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = self.ctx.binary(op, left, right);
            self.mark(left, start);
        }

        Ok(left)
    }

    /// Explicit (`*`, `\cdot`, `\times`), divided (`/`, `\div`) or implicit
    /// products.
    fn parse_term(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let mut left = self.parse_signed()?;

        loop {
            let (op, right) = match self.peek().cloned() {
                Some(Token::Times) => {
                    self.advance();
                    (BinaryOp::Mul, self.parse_signed()?)
                }
                Some(Token::Divide) => {
                    self.advance();
                    (BinaryOp::Div, self.parse_signed()?)
                }
                Some(tok) if self.starts_factor(&tok) => {
                    (BinaryOp::ImplicitMul, self.parse_power()?)
                }
                _ => break,
            };
            left = self.ctx.binary(op, left, right);
            self.mark(left, start);
        }

        Ok(left)
    }

    fn starts_factor(&self, tok: &Token) -> bool {
        match tok {
            Token::Number(_)
            | Token::Letter(_)
            | Token::Symbol(_)
            | Token::Function(_)
            | Token::Frac
            | Token::Sqrt
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::LSet
            | Token::Left
            | Token::OperatorName => true,
            Token::Pipe => self.abs_depth == 0,
            _ => false,
        }
    }

    fn parse_signed(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.advance();
        self.enter()?;
        let inner = self.parse_signed();
        self.leave();
        let id = self.ctx.add(Expr::Unary(op, inner?));
        Ok(self.mark(id, start))
    }

    fn parse_power(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let base = self.parse_postfix()?;

        if let Some(Token::Caret) = self.peek() {
            self.advance();
            let exp = self.parse_script()?;
            let id = self.ctx.pow(base, exp);
            Ok(self.mark(id, start))
        } else {
            Ok(base)
        }
    }

    /// Superscript or subscript argument: a braced expression, a signed
    /// single atom, or a single atom (one digit of a number).
    fn parse_script(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(Token::LBrace) => self.parse_atom(),
            Some(Token::Minus) => {
                self.advance();
                self.split_leading_digit();
                let inner = self.parse_atom()?;
                let id = self.ctx.neg(inner);
                Ok(self.mark(id, start))
            }
            Some(_) => {
                self.split_leading_digit();
                self.parse_atom()
            }
            None => Err(self.unexpected("exponent")),
        }
    }

    /// Atom followed by an optional subscript, which becomes part of a
    /// symbol's name (`x_1`, `a_{n}`).
    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let atom = self.parse_atom()?;
        if self.peek() != Some(&Token::Underscore) {
            return Ok(atom);
        }
        let Some(base_name) = self.ctx.symbol_name(atom).map(str::to_string) else {
            return Err(self.unexpected("operator"));
        };
        self.advance();
        let subscript = self.parse_subscript_text()?;
        let id = self.ctx.var(&format!("{}_{}", base_name, subscript));
        Ok(self.mark(id, start))
    }

    fn parse_subscript_text(&mut self) -> Result<String, ParseError> {
        let piece = |tok: &Token| match tok {
            Token::Number(n) => Some(n.clone()),
            Token::Letter(c) => Some(c.to_string()),
            Token::Symbol(s) | Token::Function(s) => Some(s.clone()),
            _ => None,
        };
        match self.peek() {
            Some(Token::LBrace) => {
                let open_span = self.tokens[self.pos].span;
                self.advance();
                let mut text = String::new();
                while let Some(part) = self.peek().and_then(piece) {
                    text.push_str(&part);
                    self.advance();
                }
                if text.is_empty() {
                    return Err(self.unexpected("subscript"));
                }
                self.expect_close(&Token::RBrace, "{", open_span)?;
                Ok(text)
            }
            _ => {
                self.split_leading_digit();
                match self.peek().and_then(piece) {
                    Some(part) => {
                        self.advance();
                        Ok(part)
                    }
                    None => Err(self.unexpected("subscript")),
                }
            }
        }
    }

    /// Parse atom (numbers, variables, groups, fractions, roots, functions)
    fn parse_atom(&mut self) -> Result<ExprId, ParseError> {
        self.enter()?;
        let result = self.parse_primary();
        self.leave();
        result
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let Some(current) = self.tokens.get(self.pos).cloned() else {
            return Err(self.unexpected("expression"));
        };

        let id = match &current.token {
            Token::Number(text) => {
                self.advance();
                let value = parse_decimal(text, current.span)?;
                self.ctx.rational(value)
            }
            Token::Letter(c) => {
                self.advance();
                self.ctx.var(&c.to_string())
            }
            Token::Symbol(name) => {
                self.advance();
                self.ctx.var(name)
            }
            Token::LBrace => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_close(&Token::RBrace, "{", current.span)?;
                inner
            }
            Token::LParen => self.parse_grouped(Delimiter::Paren, &Token::RParen, "(", current.span)?,
            Token::LBracket => {
                self.parse_grouped(Delimiter::Bracket, &Token::RBracket, "[", current.span)?
            }
            Token::LSet => self.parse_grouped(Delimiter::Brace, &Token::RSet, "\\{", current.span)?,
            Token::Pipe => {
                self.advance();
                self.abs_depth += 1;
                let inner = self.parse_expr();
                self.abs_depth -= 1;
                let inner = inner?;
                self.expect_close(&Token::Pipe, "|", current.span)?;
                self.ctx.call("abs", vec![inner])
            }
            Token::Left => self.parse_left_right(current.span)?,
            Token::Frac => {
                self.advance();
                let numer = self.parse_script()?;
                let denom = self.parse_script()?;
                self.ctx.frac(numer, denom)
            }
            Token::Sqrt => {
                self.advance();
                let index = if self.peek() == Some(&Token::LBracket) {
                    let open_span = self.tokens[self.pos].span;
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect_close(&Token::RBracket, "[", open_span)?;
                    Some(index)
                } else {
                    None
                };
                let radicand = self.parse_script()?;
                self.ctx.add(Expr::Sqrt(radicand, index))
            }
            Token::Function(name) => {
                self.advance();
                self.parse_function(name, start)?
            }
            Token::OperatorName => {
                self.advance();
                self.expect(&Token::LBrace, "'{'")?;
                let mut name = String::new();
                loop {
                    match self.peek() {
                        Some(Token::Letter(c)) => name.push(*c),
                        Some(Token::Function(f)) => name.push_str(f),
                        _ => break,
                    }
                    self.advance();
                }
                if name.is_empty() {
                    return Err(self.unexpected("operator name"));
                }
                self.expect(&Token::RBrace, "'}'")?;
                self.parse_function(&name, start)?
            }
            Token::RParen | Token::RBracket | Token::RBrace | Token::RSet | Token::Right => {
                return Err(ParseError::UnbalancedDelimiter {
                    delimiter: current.token.describe().trim_matches('\'').to_string(),
                    span: current.span,
                });
            }
            _ => return Err(self.unexpected("expression")),
        };

        Ok(self.mark(id, start))
    }

    fn parse_grouped(
        &mut self,
        delim: Delimiter,
        close: &Token,
        open: &str,
        open_span: Span,
    ) -> Result<ExprId, ParseError> {
        self.advance();
        let inner = self.parse_expr()?;
        self.expect_close(close, open, open_span)?;
        Ok(self.ctx.add(Expr::Grouped(delim, inner, delim)))
    }

    /// `\left<d> ... \right<d>`; the two delimiters may differ.
    fn parse_left_right(&mut self, open_span: Span) -> Result<ExprId, ParseError> {
        self.advance();
        let open = match self.peek() {
            Some(Token::LParen) => Some(Delimiter::Paren),
            Some(Token::LBracket) => Some(Delimiter::Bracket),
            Some(Token::LSet) => Some(Delimiter::Brace),
            Some(Token::Pipe) => None,
            _ => return Err(self.unexpected("delimiter after \\left")),
        };
        self.advance();

        let inner = self.parse_expr()?;
        if self.peek() != Some(&Token::Right) {
            return match self.peek() {
                Some(t) if !t.is_closing() => Err(self.unexpected("\\right")),
                _ => Err(ParseError::UnbalancedDelimiter {
                    delimiter: "\\left".to_string(),
                    span: open_span,
                }),
            };
        }
        self.advance();

        let close = match self.peek() {
            Some(Token::RParen) => Some(Delimiter::Paren),
            Some(Token::RBracket) => Some(Delimiter::Bracket),
            Some(Token::RSet) => Some(Delimiter::Brace),
            Some(Token::Pipe) => None,
            _ => return Err(self.unexpected("delimiter after \\right")),
        };
        self.advance();

        match (open, close) {
            (None, None) => Ok(self.ctx.call("abs", vec![inner])),
            (Some(open), Some(close)) => Ok(self.ctx.add(Expr::Grouped(open, inner, close))),
            _ => Err(ParseError::UnbalancedDelimiter {
                delimiter: "\\left".to_string(),
                span: open_span,
            }),
        }
    }

    /// Function application after the name has been consumed. Handles
    /// `\sin^2 x`, `\log_b x`, parenthesised argument lists and bare
    /// arguments (`\sin 2x` is `sin(2x)`).
    fn parse_function(&mut self, name: &str, start: usize) -> Result<ExprId, ParseError> {
        let mut power = None;
        let mut base = None;
        loop {
            match self.peek() {
                Some(Token::Caret) if power.is_none() => {
                    self.advance();
                    power = Some(self.parse_script()?);
                }
                Some(Token::Underscore) if base.is_none() && name == "log" => {
                    self.advance();
                    base = Some(self.parse_script()?);
                }
                _ => break,
            }
        }

        let mut args = match (self.peek(), self.peek_at(1)) {
            (Some(Token::LParen), _) => {
                let open_span = self.tokens[self.pos].span;
                self.advance();
                let args = self.parse_arguments()?;
                self.expect_close(&Token::RParen, "(", open_span)?;
                args
            }
            (Some(Token::Left), Some(Token::LParen)) => {
                let open_span = self.tokens[self.pos].span;
                self.pos += 2;
                let args = self.parse_arguments()?;
                if self.peek() != Some(&Token::Right) || self.peek_at(1) != Some(&Token::RParen) {
                    return Err(ParseError::UnbalancedDelimiter {
                        delimiter: "\\left(".to_string(),
                        span: open_span,
                    });
                }
                self.pos += 2;
                args
            }
            _ => vec![self.parse_bare_argument()?],
        };

        if let Some(base) = base {
            args.push(base);
        }
        let call = self.ctx.call(name, args);
        let call = self.mark(call, start);
        Ok(match power {
            Some(exp) => {
                let id = self.ctx.pow(call, exp);
                self.mark(id, start)
            }
            None => call,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<ExprId>, ParseError> {
        let mut args = vec![self.parse_expr()?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    /// Argument written without parentheses: a run of implicitly multiplied
    /// simple factors.
    fn parse_bare_argument(&mut self) -> Result<ExprId, ParseError> {
        let start = self.pos;
        let mut arg = match self.peek() {
            Some(Token::Minus) => self.parse_signed()?,
            _ => self.parse_power()?,
        };
        while matches!(
            self.peek(),
            Some(Token::Number(_) | Token::Letter(_) | Token::Symbol(_))
        ) {
            let right = self.parse_power()?;
            arg = self.ctx.binary(BinaryOp::ImplicitMul, arg, right);
            self.mark(arg, start);
        }
        Ok(arg)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a LaTeX string into an expression.
pub fn parse_latex(ctx: &mut Context, latex: &str) -> Result<ExprId, ParseError> {
    let tokens = tokenize(latex)?;
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut parser = Parser::new(tokens, ctx, latex.len());
    let result = parser.parse_expr()?;

    if let Some(rest) = parser.tokens.get(parser.pos) {
        return Err(if rest.token.is_closing() || rest.token == Token::Pipe {
            ParseError::UnbalancedDelimiter {
                delimiter: rest.token.describe().trim_matches('\'').to_string(),
                span: rest.span,
            }
        } else {
            parser.unexpected("operator or end of input")
        });
    }

    Ok(result)
}

/// The built-in LaTeX front end.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexParser;

impl MarkupParser for LatexParser {
    fn name(&self) -> &str {
        "latex"
    }

    fn version(&self) -> ParserVersion {
        ParserVersion::new(crate::INTERFACE_VERSION, 0)
    }

    fn parse(&self, ctx: &mut Context, markup: &str) -> Result<ExprId, ParseError> {
        let result = parse_latex(ctx, markup);
        if let Err(err) = &result {
            tracing::debug!(target: "parser", error = %err, "parse_failed");
        }
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> (Context, ExprId) {
        let mut ctx = Context::new();
        let id = parse_latex(&mut ctx, input).unwrap();
        (ctx, id)
    }

    fn render(input: &str) -> String {
        let (ctx, id) = parse(input);
        ctx.display(id).to_string()
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("2x + \\pi").unwrap();
        let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
        assert_eq!(
            spans,
            vec![Span::new(0, 1), Span::new(1, 2), Span::new(3, 4), Span::new(5, 8)]
        );
        assert_eq!(tokens[3].token, Token::Symbol("pi".into()));
    }

    #[test]
    fn test_tokenize_splits_bare_function_names() {
        let tokens = tokenize("2sinx").unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|t| t.token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Number("2".into()),
                Token::Function("sin".into()),
                Token::Letter('x')
            ]
        );
    }

    #[test]
    fn test_implicit_multiplication_is_kept_distinct() {
        let (ctx, id) = parse("2x");
        assert!(matches!(ctx.get(id), Expr::Binary(BinaryOp::ImplicitMul, _, _)));
        let (ctx, id) = parse("2 \\cdot x");
        assert!(matches!(ctx.get(id), Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_decimal_is_exact() {
        let (ctx, id) = parse("1.25");
        assert_eq!(
            ctx.as_number(id),
            Some(&BigRational::new(BigInt::from(5), BigInt::from(4)))
        );
    }

    #[test]
    fn test_fraction_and_roots() {
        assert_eq!(render("\\frac{x+1}{2}"), "(x + 1)/2");
        assert_eq!(render("\\sqrt{x}"), "sqrt(x)");
        assert_eq!(render("\\sqrt[3]{8}"), "root(8, 3)");
    }

    #[test]
    fn test_function_forms() {
        assert_eq!(render("\\sin(x)"), "sin(x)");
        assert_eq!(render("\\sin x"), "sin(x)");
        assert_eq!(render("\\sin 2x"), "sin(2 x)");
        assert_eq!(render("\\sin^2 x"), "sin(x)^2");
        assert_eq!(render("\\log_2 8"), "log(8, 2)");
        assert_eq!(render("\\operatorname{tg}(x)"), "tg(x)");
        assert_eq!(render("tan(x)"), "tan(x)");
    }

    #[test]
    fn test_grouping_kinds() {
        assert_eq!(render("(a+b)"), "(a + b)");
        assert_eq!(render("[a+b]"), "[a + b]");
        assert_eq!(render("{a+b}"), "a + b");
        assert_eq!(render("\\left( a \\right)"), "(a)");
        assert_eq!(render("|x|"), "abs(x)");
        assert_eq!(render("\\left| x - 1 \\right|"), "abs(x - 1)");
    }

    #[test]
    fn test_subscripted_names() {
        assert_eq!(render("x_1 + x_{12}"), "x_1 + x_12");
    }

    #[test]
    fn test_scripts_take_one_digit() {
        assert_eq!(render("x^12"), "x^1 2");
        assert_eq!(render("x^{12}"), "x^12");
        assert_eq!(render("x_12"), "x_1 2");
        assert_eq!(render("\\frac12"), "1/2");
        assert_eq!(render("\\frac123"), "1/2 3");
        assert_eq!(render("\\sqrt2x"), "sqrt(2) x");
        assert_eq!(render("x^1.5"), "x^(3/2)");
    }

    #[test]
    fn test_split_digit_keeps_spans() {
        let (ctx, id) = parse("\\frac12");
        assert_eq!(ctx.span(id), Some(Span::new(0, 7)));
        let Expr::Frac(_, denom) = ctx.get(id) else {
            panic!("expected a fraction");
        };
        assert_eq!(ctx.span(*denom), Some(Span::new(6, 7)));
    }

    #[test]
    fn test_spans_cover_source() {
        let (ctx, id) = parse("x + \\frac{1}{2}");
        assert_eq!(ctx.span(id), Some(Span::new(0, 15)));
    }

    #[test]
    fn test_errors_carry_positions() {
        let mut ctx = Context::new();
        assert_eq!(parse_latex(&mut ctx, "   "), Err(ParseError::EmptyInput));

        let err = parse_latex(&mut ctx, "(x + 1").unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedDelimiter { .. }));
        assert_eq!(err.span(), Some(Span::new(0, 1)));

        let err = parse_latex(&mut ctx, "x + ").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEnd { .. }));

        let err = parse_latex(&mut ctx, "x # y").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownCharacter {
                ch: '#',
                span: Span::new(2, 3)
            }
        );

        let err = parse_latex(&mut ctx, "x)").unwrap_err();
        assert_eq!(err.span(), Some(Span::new(1, 2)));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = "\\frac{\\sin^2 x}{1 + x^{2}} - 3.5y";
        assert_eq!(render(input), render(input));
    }

    #[test]
    fn test_parser_reports_version() {
        let parser = LatexParser;
        assert!(parser.version().is_compatible());
        assert_eq!(parser.name(), "latex");
    }
}
