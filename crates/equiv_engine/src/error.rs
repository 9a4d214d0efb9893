use equiv_parser::ParseError;
use thiserror::Error;

/// Rejected configuration. Returned to the caller before any work is done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("symbolic timeout must not be negative, got {0} ms")]
    NegativeTimeout(i64),
    #[error("canonicalization iteration cap must be at least 1")]
    ZeroIterationCap,
    #[error("float tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    #[error("parser '{name}' implements interface {version}, expected major version {expected}")]
    IncompatibleParser {
        name: String,
        version: String,
        expected: u16,
    },
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Failure inside a symbolic backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackError {
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("backend failure: {0}")]
    Internal(String),
}

/// Everything that can go wrong while deciding one pair.
///
/// Only [`EquivalenceError::Configuration`] is returned from the public API;
/// the other variants end up as the `error` text of a verdict.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquivalenceError {
    #[error("could not parse expression {which}: {source}")]
    Parse {
        which: usize,
        #[source]
        source: ParseError,
    },
    #[error("canonicalization did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },
    #[error("symbolic fallback exceeded {budget_ms} ms")]
    FallbackTimeout { budget_ms: u64 },
    #[error("symbolic fallback failed: {0}")]
    FallbackEngine(#[from] FallbackError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
