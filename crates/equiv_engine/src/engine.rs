//! The orchestrator: cache, parse, canonicalize, then the bounded slow path.

use crate::cache::{fingerprint, ResultCache, VerdictStore};
use crate::canonicalize::{CanonicalizationResult, Canonicalizer};
use crate::config::{EquivalenceConfig, DEFAULT_CACHE_TTL_SECS};
use crate::diagnostics::{DiagnosticEvent, DiagnosticHook, Diagnostics, Phase};
use crate::error::{ConfigurationError, EquivalenceError, FallbackError};
use crate::fallback::{self, RationalBackend, SymbolicBackend};
use crate::library::{RuleInfo, RuleLibrary};
use crate::region::Region;
use crate::verdict::{Method, Verdict};
use equiv_ast::{Context, ExprId};
use equiv_parser::{LatexParser, MarkupParser, ParseError, INTERFACE_VERSION};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Decides whether two markup strings denote the same expression.
///
/// Cheap to clone: every component is shared.
///
/// # Example
/// ```
/// use equiv_engine::{EquivalenceConfig, EquivalenceEngine, Method};
///
/// let engine = EquivalenceEngine::new();
/// let verdict = engine
///     .check_equivalence_blocking("2x+3x", "5x", &EquivalenceConfig::default())
///     .unwrap();
/// assert!(verdict.equivalent);
/// assert_eq!(verdict.method, Method::FastCanonical);
/// ```
#[derive(Clone)]
pub struct EquivalenceEngine {
    parser: Arc<dyn MarkupParser>,
    backend: Arc<dyn SymbolicBackend>,
    library: Arc<RuleLibrary>,
    cache: ResultCache,
    diagnostics: Diagnostics,
}

impl Default for EquivalenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EquivalenceEngine {
    /// LaTeX parser, rational-function fallback, in-memory cache.
    pub fn new() -> Self {
        Self {
            parser: Arc::new(LatexParser),
            backend: Arc::new(RationalBackend::new()),
            library: Arc::new(RuleLibrary::with_default_rules()),
            cache: ResultCache::in_memory(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn builder() -> EquivalenceEngineBuilder {
        EquivalenceEngineBuilder::default()
    }

    pub fn library(&self) -> &Arc<RuleLibrary> {
        &self.library
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Rules eligible in `region`, or every rule, in firing order.
    pub fn describe_rules(&self, region: Option<Region>) -> Vec<RuleInfo> {
        self.library.describe(region)
    }

    /// Check in the default (empty) cache scope.
    pub async fn check_equivalence(
        &self,
        expr1: &str,
        expr2: &str,
        config: &EquivalenceConfig,
    ) -> Result<Verdict, ConfigurationError> {
        self.check_equivalence_scoped("", expr1, expr2, config).await
    }

    /// Check with cache entries namespaced under `scope`.
    ///
    /// Only an invalid `config` is an `Err`. Every other failure, from
    /// malformed markup to a crashed fallback, comes back as a verdict.
    pub async fn check_equivalence_scoped(
        &self,
        scope: &str,
        expr1: &str,
        expr2: &str,
        config: &EquivalenceConfig,
    ) -> Result<Verdict, ConfigurationError> {
        config.validate()?;
        let started = Instant::now();
        let key = fingerprint(expr1, expr2, config);

        if config.cache_enabled {
            let phase_start = Instant::now();
            let hit = self.cache.get(scope, key).await;
            self.diagnostics.emit(
                Phase::CacheLookup,
                phase_start,
                json!({ "hit": hit.is_some(), "key": key.to_string() }),
            );
            if let Some(mut verdict) = hit {
                verdict.elapsed_ms = elapsed_ms(started);
                debug!(target: "equivalence", key = %key, method = %verdict.method, "cache_hit");
                return Ok(verdict);
            }
        }

        let mut verdict = self.decide(expr1, expr2, config).await;
        verdict.elapsed_ms = elapsed_ms(started);

        if config.cache_enabled && verdict.method != Method::Timeout {
            let phase_start = Instant::now();
            self.cache.put(scope, key, verdict.clone()).await;
            self.diagnostics
                .emit(Phase::CacheStore, phase_start, json!({ "key": key.to_string() }));
        }

        debug!(
            target: "equivalence",
            equivalent = verdict.equivalent,
            method = %verdict.method,
            elapsed_ms = verdict.elapsed_ms,
            "check_complete"
        );
        Ok(verdict)
    }

    /// Synchronous wrapper for callers without a runtime.
    ///
    /// A private current-thread runtime drives the check and is shut down in
    /// the background, so an abandoned fallback computation never holds up
    /// the return.
    pub fn check_equivalence_blocking(
        &self,
        expr1: &str,
        expr2: &str,
        config: &EquivalenceConfig,
    ) -> Result<Verdict, EquivalenceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| FallbackError::Internal(format!("failed to start runtime: {}", e)))?;
        let result = runtime.block_on(self.check_equivalence(expr1, expr2, config));
        runtime.shutdown_background();
        Ok(result?)
    }

    /// Parse and canonicalize one expression into `ctx`.
    pub fn canonicalize_markup(
        &self,
        ctx: &mut Context,
        markup: &str,
        config: &EquivalenceConfig,
    ) -> Result<CanonicalizationResult, EquivalenceError> {
        config.validate()?;
        let root = self
            .parse_one(ctx, markup)
            .map_err(|source| EquivalenceError::Parse { which: 1, source })?;
        Ok(self.canonicalizer(config).canonicalize(ctx, root, config.region))
    }

    fn canonicalizer(&self, config: &EquivalenceConfig) -> Canonicalizer {
        Canonicalizer::new(self.library.clone())
            .with_max_iterations(config.max_canonicalization_iterations)
    }

    /// A panicking parser is reported as a parse error.
    fn parse_one(&self, ctx: &mut Context, markup: &str) -> Result<ExprId, ParseError> {
        match catch_unwind(AssertUnwindSafe(|| self.parser.parse(ctx, markup))) {
            Ok(result) => result,
            Err(_) => Err(ParseError::Internal(format!(
                "parser '{}' panicked",
                self.parser.name()
            ))),
        }
    }

    fn parse_pair(
        &self,
        ctx: &mut Context,
        expr1: &str,
        expr2: &str,
    ) -> Result<(ExprId, ExprId), EquivalenceError> {
        let lhs = self
            .parse_one(ctx, expr1)
            .map_err(|source| EquivalenceError::Parse { which: 1, source })?;
        let rhs = self
            .parse_one(ctx, expr2)
            .map_err(|source| EquivalenceError::Parse { which: 2, source })?;
        Ok((lhs, rhs))
    }

    async fn decide(&self, expr1: &str, expr2: &str, config: &EquivalenceConfig) -> Verdict {
        let mut ctx = Context::new();

        let phase_start = Instant::now();
        let parsed = self.parse_pair(&mut ctx, expr1, expr2);
        self.diagnostics.emit(
            Phase::Parse,
            phase_start,
            json!({ "ok": parsed.is_ok(), "nodes": ctx.len() }),
        );
        let (lhs, rhs) = match parsed {
            Ok(pair) => pair,
            Err(err) => {
                debug!(target: "equivalence", error = %err, "parse_failed");
                return Verdict::new(false, Method::ParseError).with_error(err);
            }
        };

        let mut forms = (None, None);
        let mut non_converged = None;
        let (lhs, rhs) = if config.force_symbolic_only {
            (lhs, rhs)
        } else {
            let phase_start = Instant::now();
            let canonicalizer = self.canonicalizer(config);
            let a = canonicalizer.canonicalize(&mut ctx, lhs, config.region);
            let b = canonicalizer.canonicalize(&mut ctx, rhs, config.region);
            let matched = a.canonical == b.canonical;
            self.diagnostics.emit(
                Phase::Canonicalize,
                phase_start,
                json!({
                    "iterations": [a.iterations, b.iterations],
                    "converged": [a.converged, b.converged],
                    "matched": matched,
                }),
            );
            if matched {
                return Verdict::new(true, Method::FastCanonical)
                    .with_forms(Some(a.canonical), Some(b.canonical));
            }
            if !(a.converged && b.converged) {
                let err = EquivalenceError::NonConvergence {
                    iterations: config.max_canonicalization_iterations,
                };
                warn!(target: "equivalence", error = %err, "best_effort_canonical_form");
                non_converged = Some(err);
            }
            forms = (Some(a.canonical), Some(b.canonical));
            (a.expr, b.expr)
        };

        let phase_start = Instant::now();
        let mut verdict = self.slow_path(ctx, lhs, rhs, config).await;
        self.diagnostics.emit(
            Phase::SlowPath,
            phase_start,
            json!({
                "backend": self.backend.name(),
                "method": verdict.method,
                "equivalent": verdict.equivalent,
            }),
        );

        if verdict.canonical_form_1.is_none() && verdict.canonical_form_2.is_none() {
            verdict = verdict.with_forms(forms.0, forms.1);
        }
        if let Some(err) = non_converged {
            if !verdict.equivalent && verdict.error.is_none() {
                verdict = verdict.with_error(err);
            }
        }
        verdict
    }

    /// Run the fallback on a blocking worker that owns `ctx`, racing it
    /// against the configured budget. A late result is dropped with the
    /// worker's arena.
    async fn slow_path(
        &self,
        mut ctx: Context,
        lhs: ExprId,
        rhs: ExprId,
        config: &EquivalenceConfig,
    ) -> Verdict {
        let budget = config.symbolic_timeout();
        let tolerance = config.float_tolerance;
        let backend = self.backend.clone();
        let worker = tokio::task::spawn_blocking(move || {
            fallback::decide(backend.as_ref(), &mut ctx, lhs, rhs, tolerance)
        });

        match tokio::time::timeout(budget, worker).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(join_err)) => {
                warn!(target: "equivalence", error = %join_err, "fallback_worker_failed");
                Verdict::new(false, Method::SlowSimplify).with_error(EquivalenceError::from(
                    FallbackError::Internal(format!("fallback worker failed: {}", join_err)),
                ))
            }
            Err(_) => {
                let budget_ms = budget.as_millis().min(u64::MAX as u128) as u64;
                debug!(target: "equivalence", budget_ms, "fallback_timed_out");
                Verdict::new(false, Method::Timeout)
                    .with_error(EquivalenceError::FallbackTimeout { budget_ms })
            }
        }
    }
}

impl std::fmt::Debug for EquivalenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalenceEngine")
            .field("parser", &self.parser.name())
            .field("backend", &self.backend.name())
            .field("rules", &self.library.len())
            .field("cache", &self.cache)
            .finish()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Swaps individual components of an [`EquivalenceEngine`].
#[derive(Default)]
pub struct EquivalenceEngineBuilder {
    parser: Option<Arc<dyn MarkupParser>>,
    backend: Option<Arc<dyn SymbolicBackend>>,
    library: Option<Arc<RuleLibrary>>,
    store: Option<Arc<dyn VerdictStore>>,
    cache_ttl: Option<Duration>,
    hook: Option<DiagnosticHook>,
}

impl EquivalenceEngineBuilder {
    pub fn parser(mut self, parser: Arc<dyn MarkupParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn SymbolicBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn library(mut self, library: Arc<RuleLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    pub fn store(mut self, store: Arc<dyn VerdictStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn diagnostics<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DiagnosticEvent) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Fails when the parser implements a different major interface version.
    pub fn build(self) -> Result<EquivalenceEngine, ConfigurationError> {
        let parser = self.parser.unwrap_or_else(|| Arc::new(LatexParser));
        let version = parser.version();
        if !version.is_compatible() {
            return Err(ConfigurationError::IncompatibleParser {
                name: parser.name().to_string(),
                version: version.to_string(),
                expected: INTERFACE_VERSION,
            });
        }

        let ttl = self
            .cache_ttl
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        let cache = match self.store {
            Some(store) => ResultCache::new(store, ttl),
            None => ResultCache::in_memory(ttl),
        };

        Ok(EquivalenceEngine {
            parser,
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(RationalBackend::new())),
            library: self
                .library
                .unwrap_or_else(|| Arc::new(RuleLibrary::with_default_rules())),
            cache,
            diagnostics: Diagnostics::new(self.hook),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_path_reports_forms() {
        let engine = EquivalenceEngine::new();
        let v = engine
            .check_equivalence("a+b", "b+a", &EquivalenceConfig::default())
            .await
            .unwrap();
        assert!(v.equivalent);
        assert_eq!(v.method, Method::FastCanonical);
        assert_eq!(v.canonical_form_1.as_deref(), Some("a + b"));
        assert_eq!(v.canonical_form_1, v.canonical_form_2);
    }

    #[tokio::test]
    async fn test_parse_error_names_the_side() {
        let engine = EquivalenceEngine::new();
        let v = engine
            .check_equivalence("x", "x + ", &EquivalenceConfig::default())
            .await
            .unwrap();
        assert!(!v.equivalent);
        assert_eq!(v.method, Method::ParseError);
        assert!(v.error.unwrap().contains("expression 2"));
    }

    #[test]
    fn test_canonicalize_markup_keeps_tree_in_callers_arena() {
        let engine = EquivalenceEngine::new();
        let mut ctx = Context::new();
        let result = engine
            .canonicalize_markup(&mut ctx, "3x + 2x", &EquivalenceConfig::default())
            .unwrap();
        assert_eq!(ctx.display(result.expr).to_string(), result.canonical);
        assert_eq!(result.canonical, "5*x");
    }

    #[test]
    fn test_blocking_check_rejects_bad_config() {
        let engine = EquivalenceEngine::new();
        let config = EquivalenceConfig {
            symbolic_timeout_ms: -1,
            ..Default::default()
        };
        let err = engine
            .check_equivalence_blocking("x", "x", &config)
            .unwrap_err();
        assert_eq!(
            err,
            EquivalenceError::Configuration(ConfigurationError::NegativeTimeout(-1))
        );
    }
}
