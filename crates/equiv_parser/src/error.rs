use equiv_ast::Span;
use thiserror::Error;

/// Why a piece of markup could not be turned into a tree.
///
/// Every variant except [`ParseError::EmptyInput`] points at the offending
/// byte range of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    EmptyInput,
    #[error("unknown character '{ch}' at {span}")]
    UnknownCharacter { ch: char, span: Span },
    #[error("unexpected {found} at {span}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },
    #[error("unexpected end of input at {span}, expected {expected}")]
    UnexpectedEnd { expected: String, span: Span },
    #[error("unbalanced delimiter '{delimiter}' at {span}")]
    UnbalancedDelimiter { delimiter: String, span: Span },
    #[error("invalid number '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },
    #[error("nesting deeper than {limit} levels at {span}")]
    NestingTooDeep { limit: usize, span: Span },
    #[error("parser failed internally: {0}")]
    Internal(String),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::EmptyInput | ParseError::Internal(_) => None,
            ParseError::UnknownCharacter { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEnd { span, .. }
            | ParseError::UnbalancedDelimiter { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::NestingTooDeep { span, .. } => Some(*span),
        }
    }
}
