//! Markup parsing for the equivalence engine.
//!
//! Parsers sit behind the [`MarkupParser`] trait so that the engine can be
//! handed a different front end without touching the rule machinery. The
//! built-in implementation is [`LatexParser`].

pub mod conformance;
pub mod error;
pub mod latex;

pub use error::ParseError;
pub use latex::{parse_latex, LatexParser, MAX_NESTING_DEPTH};

use equiv_ast::{Context, ExprId};

/// Major revision of the [`MarkupParser`] contract this crate implements.
pub const INTERFACE_VERSION: u16 = 1;

/// Version a parser reports for itself. Parsers are interchangeable when
/// their major version equals [`INTERFACE_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParserVersion {
    pub major: u16,
    pub minor: u16,
}

impl ParserVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self) -> bool {
        self.major == INTERFACE_VERSION
    }
}

impl std::fmt::Display for ParserVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Turns markup into a tree inside a caller-owned [`Context`].
///
/// Implementations must be deterministic and must not keep state between
/// calls: the same markup always yields the same tree or the same error.
pub trait MarkupParser: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> ParserVersion;

    fn parse(&self, ctx: &mut Context, markup: &str) -> Result<ExprId, ParseError>;
}
