//! Two-tier symbolic equivalence checking.
//!
//! The fast tier rewrites both expressions to a canonical form with a
//! priority-ordered rule library and compares the serializations. When the
//! forms differ, a symbolic backend gets a bounded amount of time to show the
//! difference vanishes. [`EquivalenceEngine`] runs both tiers behind a result
//! cache.

#[macro_use]
pub mod macros;

pub mod cache;
pub mod canonicalize;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod library;
pub mod profiler;
pub mod region;
pub mod rule;
pub mod rules;
pub mod verdict;

pub use cache::{fingerprint, CacheEntry, CacheKey, InMemoryStore, ResultCache, VerdictStore};
pub use canonicalize::{CanonicalizationResult, Canonicalizer};
pub use config::{CacheSettings, EngineSettings, EquivalenceConfig};
pub use diagnostics::{DiagnosticEvent, DiagnosticHook, Phase};
pub use engine::{EquivalenceEngine, EquivalenceEngineBuilder};
pub use error::{ConfigurationError, EquivalenceError, FallbackError};
pub use fallback::{RationalBackend, SymbolicBackend};
pub use library::{RuleInfo, RuleLibrary};
pub use profiler::RuleProfiler;
pub use region::{Region, RegionSet};
pub use rule::Rule;
pub use verdict::{Method, Verdict};
