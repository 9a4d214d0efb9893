//! Behavioural checks every [`MarkupParser`] is expected to pass.
//!
//! A replacement parser is interchangeable with [`LatexParser`](crate::LatexParser)
//! when [`check_conformance`] reports no failures for it.

use crate::{MarkupParser, ParseError};
use equiv_ast::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyInput,
    UnknownCharacter,
    UnexpectedToken,
    UnexpectedEnd,
    UnbalancedDelimiter,
    InvalidNumber,
    NestingTooDeep,
    Internal,
}

impl ErrorKind {
    pub fn of(err: &ParseError) -> Self {
        match err {
            ParseError::EmptyInput => ErrorKind::EmptyInput,
            ParseError::UnknownCharacter { .. } => ErrorKind::UnknownCharacter,
            ParseError::UnexpectedToken { .. } => ErrorKind::UnexpectedToken,
            ParseError::UnexpectedEnd { .. } => ErrorKind::UnexpectedEnd,
            ParseError::UnbalancedDelimiter { .. } => ErrorKind::UnbalancedDelimiter,
            ParseError::InvalidNumber { .. } => ErrorKind::InvalidNumber,
            ParseError::NestingTooDeep { .. } => ErrorKind::NestingTooDeep,
            ParseError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Parses, and the tree displays as this string.
    Tree(&'static str),
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy)]
pub struct ConformanceCase {
    pub markup: &'static str,
    pub expected: Expected,
}

const fn tree(markup: &'static str, display: &'static str) -> ConformanceCase {
    ConformanceCase {
        markup,
        expected: Expected::Tree(display),
    }
}

const fn error(markup: &'static str, kind: ErrorKind) -> ConformanceCase {
    ConformanceCase {
        markup,
        expected: Expected::Error(kind),
    }
}

pub const CASES: &[ConformanceCase] = &[
    tree("x", "x"),
    tree("42", "42"),
    tree("0.5", "1/2"),
    tree("a+b", "a + b"),
    tree("a-b", "a - b"),
    tree("-x", "-x"),
    tree("2x", "2 x"),
    tree("2\\cdot x", "2*x"),
    tree("a \\times b", "a*b"),
    tree("a/b", "a/b"),
    tree("a \\div b", "a/b"),
    tree("x^2", "x^2"),
    tree("x^{n+1}", "x^(n + 1)"),
    tree("x^{12}", "x^12"),
    tree("x^12", "x^1 2"),
    tree("\\frac{a}{b}", "a/b"),
    tree("\\dfrac{1}{x}", "1/x"),
    tree("\\frac12", "1/2"),
    tree("\\frac1x", "1/x"),
    tree("\\sqrt{x}", "sqrt(x)"),
    tree("\\sqrt[3]{x}", "root(x, 3)"),
    tree("\\pi", "pi"),
    tree("\\sin(x)", "sin(x)"),
    tree("\\cos x", "cos(x)"),
    tree("\\tan^2 x", "tan(x)^2"),
    tree("\\ln(x)", "ln(x)"),
    tree("\\tg x", "tg(x)"),
    tree("(x+2)^2", "(x + 2)^2"),
    tree("\\left( x \\right)", "(x)"),
    tree("[x]", "[x]"),
    tree("\\{x\\}", "{x}"),
    tree("{x+1}", "x + 1"),
    tree("|x|", "abs(x)"),
    tree("x_{1}", "x_1"),
    tree("\\alpha + \\beta", "alpha + beta"),
    tree("2 \\, x", "2 x"),
    error("", ErrorKind::EmptyInput),
    error("x + ", ErrorKind::UnexpectedEnd),
    error("(x", ErrorKind::UnbalancedDelimiter),
    error("x)", ErrorKind::UnbalancedDelimiter),
    error("x $ y", ErrorKind::UnknownCharacter),
    error("x + * y", ErrorKind::UnexpectedToken),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceFailure {
    pub markup: &'static str,
    pub expected: Expected,
    pub actual: String,
}

impl std::fmt::Display for ConformanceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: expected {:?}, got {}",
            self.markup, self.expected, self.actual
        )
    }
}

/// Run [`CASES`] against `parser`, each in a fresh context.
pub fn check_conformance<P: MarkupParser + ?Sized>(parser: &P) -> Vec<ConformanceFailure> {
    let mut failures = Vec::new();
    for case in CASES {
        let mut ctx = Context::new();
        let result = parser.parse(&mut ctx, case.markup);
        let ok = match (&result, case.expected) {
            (Ok(id), Expected::Tree(display)) => ctx.display(*id).to_string() == display,
            (Err(err), Expected::Error(kind)) => ErrorKind::of(err) == kind,
            _ => false,
        };
        if !ok {
            let actual = match result {
                Ok(id) => format!("tree {}", ctx.display(id)),
                Err(err) => format!("error {}", err),
            };
            failures.push(ConformanceFailure {
                markup: case.markup,
                expected: case.expected,
                actual,
            });
        }
    }
    failures
}
