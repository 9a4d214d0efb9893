use equiv_ast::{Context, ExprId};
use equiv_engine::{
    fingerprint, ConfigurationError, EquivalenceConfig, EquivalenceEngine, FallbackError,
    InMemoryStore, Method, Phase, RationalBackend, Region, SymbolicBackend,
};
use equiv_parser::{MarkupParser, ParseError, ParserVersion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Run with: RUST_LOG=equivalence=debug cargo test -p equiv_engine --test equivalence_tests -- --nocapture
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> EquivalenceConfig {
    EquivalenceConfig::default()
}

async fn check(a: &str, b: &str) -> equiv_engine::Verdict {
    EquivalenceEngine::new()
        .check_equivalence(a, b, &config())
        .await
        .unwrap()
}

/// Counts calls, waits `delay`, then defers to the rational backend.
#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
    delay: Duration,
    inner: RationalBackend,
}

impl SymbolicBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn simplify(&self, ctx: &mut Context, expr: ExprId) -> Result<ExprId, FallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.simplify(ctx, expr)
    }
}

struct SleepingBackend(Duration);

impl SymbolicBackend for SleepingBackend {
    fn name(&self) -> &str {
        "sleeping"
    }

    fn simplify(&self, _ctx: &mut Context, expr: ExprId) -> Result<ExprId, FallbackError> {
        std::thread::sleep(self.0);
        Ok(expr)
    }
}

struct PanickingBackend;

impl SymbolicBackend for PanickingBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    fn simplify(&self, _ctx: &mut Context, _expr: ExprId) -> Result<ExprId, FallbackError> {
        panic!("backend crashed")
    }
}

struct PanickingParser;

impl MarkupParser for PanickingParser {
    fn name(&self) -> &str {
        "panicking"
    }

    fn version(&self) -> ParserVersion {
        ParserVersion::new(equiv_parser::INTERFACE_VERSION, 0)
    }

    fn parse(&self, _ctx: &mut Context, _markup: &str) -> Result<ExprId, ParseError> {
        panic!("parser crashed")
    }
}

struct FutureParser;

impl MarkupParser for FutureParser {
    fn name(&self) -> &str {
        "future"
    }

    fn version(&self) -> ParserVersion {
        ParserVersion::new(equiv_parser::INTERFACE_VERSION + 1, 0)
    }

    fn parse(&self, ctx: &mut Context, markup: &str) -> Result<ExprId, ParseError> {
        equiv_parser::parse_latex(ctx, markup)
    }
}

// ============================================================================
// Fast path
// ============================================================================

#[tokio::test]
async fn test_commuted_sum_is_fast_canonical() {
    let v = check("a+b", "b+a").await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::FastCanonical);
}

#[tokio::test]
async fn test_like_terms_are_fast_canonical() {
    let v = check("2x+3x", "5x").await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::FastCanonical);
}

#[tokio::test]
async fn test_squared_binomial_is_fast_canonical() {
    let v = check("x^2+4x+4", "(x+2)^2").await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::FastCanonical);
    assert_eq!(v.canonical_form_1, v.canonical_form_2);
}

#[tokio::test]
async fn test_pythagorean_identity_is_fast_canonical() {
    let v = check("\\sin^2 x + \\cos^2 x", "1").await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::FastCanonical);
}

// ============================================================================
// Slow path
// ============================================================================

#[tokio::test]
async fn test_different_symbols_are_not_equivalent() {
    let v = check("x", "y").await;
    assert!(!v.equivalent);
    assert_eq!(v.method, Method::SlowSimplify);
    assert!(v.error.is_none());
    assert!(!v.is_inconclusive());
}

#[tokio::test]
async fn test_difference_of_squares_needs_slow_path() {
    init_tracing();
    let v = check("x^2-1", "(x-1)(x+1)").await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::SlowDifference);
}

#[tokio::test]
async fn test_rational_functions_reduce() {
    let v = check("\\frac{x^2-1}{x-1}", "x+1").await;
    assert!(v.equivalent);

    let v = check("\\frac{1}{x} + \\frac{1}{y}", "\\frac{x+y}{xy}").await;
    assert!(v.equivalent);
}

#[tokio::test]
async fn test_trig_rewrites_in_fallback() {
    let v = check("\\tan(x)\\cos(x)", "\\sin(x)").await;
    assert!(v.equivalent);

    let v = check("\\cos^2 x", "(1 - \\sin x)(1 + \\sin x)").await;
    assert!(v.equivalent);
}

#[tokio::test]
async fn test_tex_digit_arguments() {
    let v = check("\\cos(\\pi/3)", "\\frac12").await;
    assert!(v.equivalent, "{:?}", v);

    // `x^12` is x^1 times 2, not x to the twelfth.
    let v = check("x^12", "2x").await;
    assert!(v.equivalent, "{:?}", v);
    let v = check("x^12", "x^{12}").await;
    assert!(!v.equivalent);
}

#[tokio::test]
async fn test_near_miss_is_not_equivalent() {
    let v = check("x^2", "(x+1)(x-1)").await;
    assert!(!v.equivalent);
    assert_eq!(v.method, Method::SlowSimplify);
    assert!(v.canonical_form_1.is_some());
    assert!(v.canonical_form_2.is_some());
}

#[tokio::test]
async fn test_symbolic_only_skips_canonicalization() {
    let engine = EquivalenceEngine::new();
    let config = EquivalenceConfig {
        force_symbolic_only: true,
        ..config()
    };
    let v = engine.check_equivalence("a+b", "b+a", &config).await.unwrap();
    assert!(v.equivalent);
    assert_eq!(v.method, Method::SlowDifference);
}

#[tokio::test]
async fn test_slow_path_times_out() {
    init_tracing();
    let engine = EquivalenceEngine::builder()
        .backend(Arc::new(SleepingBackend(Duration::from_millis(600))))
        .build()
        .unwrap();
    let config = EquivalenceConfig {
        symbolic_timeout_ms: 50,
        ..config()
    };

    let started = Instant::now();
    let v = engine.check_equivalence("x", "y", &config).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!v.equivalent);
    assert_eq!(v.method, Method::Timeout);
    assert!(v.is_inconclusive());
    assert!(v.error.unwrap().contains("50 ms"));

    // Timeouts are not cached.
    assert!(engine.cache().is_empty().await);
}

#[tokio::test]
async fn test_backend_panic_becomes_error_verdict() {
    let engine = EquivalenceEngine::builder()
        .backend(Arc::new(PanickingBackend))
        .build()
        .unwrap();
    let v = engine.check_equivalence("x", "y", &config()).await.unwrap();
    assert!(!v.equivalent);
    assert_eq!(v.method, Method::SlowSimplify);
    assert!(v.error.is_some());
}

// ============================================================================
// Parse errors and configuration
// ============================================================================

#[tokio::test]
async fn test_malformed_markup_is_parse_error() {
    let v = check("(x+1", "x+1").await;
    assert!(!v.equivalent);
    assert_eq!(v.method, Method::ParseError);
    assert!(v.is_inconclusive());
    assert!(v.error.unwrap().contains("expression 1"));
}

#[tokio::test]
async fn test_deeply_nested_markup_is_parse_error() {
    let deep = format!("{}x{}", "(".repeat(5_000), ")".repeat(5_000));
    let v = check(&deep, "x").await;
    assert_eq!(v.method, Method::ParseError);
    let error = v.error.unwrap();
    assert!(error.contains("expression 1"), "{}", error);
    assert!(error.contains("nesting deeper than"), "{}", error);

    let v = check("x", &format!("{}x", "-".repeat(5_000))).await;
    assert_eq!(v.method, Method::ParseError);
    assert!(v.error.unwrap().contains("expression 2"));
}

#[tokio::test]
async fn test_long_sums_compare_without_overflow() {
    let terms: Vec<String> = (0..3_000).map(|i| format!("x_{{{}}}", i)).collect();
    let forward = terms.join(" + ");
    let backward = terms.iter().rev().cloned().collect::<Vec<_>>().join(" + ");
    let v = check(&forward, &backward).await;
    assert!(v.equivalent);
    assert_eq!(v.method, Method::FastCanonical);

    let shifted = format!("{} + 1", forward);
    let v = check(&forward, &shifted).await;
    assert!(!v.equivalent);
}

#[test]
fn test_long_sum_blocking_entry_point() {
    let terms: Vec<String> = (0..3_000).map(|i| format!("x_{{{}}}", i)).collect();
    let sum = terms.join(" + ");
    let v = EquivalenceEngine::new()
        .check_equivalence_blocking(&sum, &sum, &config())
        .unwrap();
    assert!(v.equivalent);
}

#[tokio::test]
async fn test_parser_panic_is_parse_error() {
    let engine = EquivalenceEngine::builder()
        .parser(Arc::new(PanickingParser))
        .build()
        .unwrap();
    let v = engine.check_equivalence("x", "x", &config()).await.unwrap();
    assert_eq!(v.method, Method::ParseError);
    assert!(v.error.unwrap().contains("panicked"));
}

#[tokio::test]
async fn test_invalid_config_fails_fast() {
    let engine = EquivalenceEngine::new();
    for (bad, expected) in [
        (
            EquivalenceConfig {
                symbolic_timeout_ms: -10,
                ..config()
            },
            ConfigurationError::NegativeTimeout(-10),
        ),
        (
            EquivalenceConfig {
                max_canonicalization_iterations: 0,
                ..config()
            },
            ConfigurationError::ZeroIterationCap,
        ),
    ] {
        let err = engine.check_equivalence("x", "x", &bad).await.unwrap_err();
        assert_eq!(err, expected);
    }
    assert!(engine.cache().is_empty().await);
}

#[test]
fn test_incompatible_parser_is_rejected() {
    let err = EquivalenceEngine::builder()
        .parser(Arc::new(FutureParser))
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::IncompatibleParser { .. }));
}

// ============================================================================
// Regions
// ============================================================================

#[tokio::test]
async fn test_regional_alias_depends_on_region() {
    let engine = EquivalenceEngine::new();

    let standard = engine
        .check_equivalence("\\tg(x)", "\\tan(x)", &config())
        .await
        .unwrap();
    assert!(!standard.equivalent);

    let continental = engine
        .check_equivalence(
            "\\tg(x)",
            "\\tan(x)",
            &config().with_region(Region::Continental),
        )
        .await
        .unwrap();
    assert!(continental.equivalent);
    assert_eq!(continental.method, Method::FastCanonical);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cache_hit_skips_computation() {
    let backend = Arc::new(CountingBackend {
        delay: Duration::from_millis(40),
        ..Default::default()
    });
    let engine = EquivalenceEngine::builder()
        .backend(backend.clone())
        .build()
        .unwrap();

    let first = engine
        .check_equivalence("x^2-1", "(x-1)(x+1)", &config())
        .await
        .unwrap();
    let calls = backend.calls.load(Ordering::SeqCst);
    assert!(calls > 0);

    let second = engine
        .check_equivalence("x^2-1", "(x-1)(x+1)", &config())
        .await
        .unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), calls);
    assert_eq!(first.equivalent, second.equivalent);
    assert_eq!(first.method, second.method);
    assert_eq!(first.canonical_form_1, second.canonical_form_1);
    assert_eq!(first.canonical_form_2, second.canonical_form_2);
    assert_eq!(first.error, second.error);

    // A hit reports the lookup time, not the time of the original check.
    assert!(first.elapsed_ms >= 40.0, "{}", first.elapsed_ms);
    assert!(
        second.elapsed_ms < first.elapsed_ms / 4.0,
        "hit took {} ms, check took {} ms",
        second.elapsed_ms,
        first.elapsed_ms
    );
}

#[tokio::test]
async fn test_cache_can_be_disabled() {
    let engine = EquivalenceEngine::new();
    let config = EquivalenceConfig {
        cache_enabled: false,
        ..config()
    };
    engine.check_equivalence("a", "a", &config).await.unwrap();
    assert!(engine.cache().is_empty().await);
}

#[tokio::test]
async fn test_cache_scopes_are_separate() {
    let engine = EquivalenceEngine::builder()
        .store(Arc::new(InMemoryStore::new()))
        .cache_ttl(Duration::from_secs(60))
        .build()
        .unwrap();
    engine
        .check_equivalence_scoped("class-a", "a+b", "b+a", &config())
        .await
        .unwrap();

    let key = fingerprint("a+b", "b+a", &config());
    assert!(engine.cache().get("class-a", key).await.is_some());
    assert!(engine.cache().get("", key).await.is_none());

    assert_eq!(engine.cache().clear("class-a").await, 1);
    assert!(engine.cache().get("class-a", key).await.is_none());
}

#[tokio::test]
async fn test_config_change_is_a_cache_miss() {
    let backend = Arc::new(CountingBackend::default());
    let engine = EquivalenceEngine::builder()
        .backend(backend.clone())
        .build()
        .unwrap();
    engine.check_equivalence("x", "y", &config()).await.unwrap();
    let calls = backend.calls.load(Ordering::SeqCst);

    let looser = EquivalenceConfig {
        float_tolerance: 1e-3,
        ..config()
    };
    engine.check_equivalence("x", "y", &looser).await.unwrap();
    assert!(backend.calls.load(Ordering::SeqCst) > calls);
}

// ============================================================================
// Diagnostics
// ============================================================================

#[tokio::test]
async fn test_diagnostic_hook_sees_every_phase() {
    init_tracing();
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    let engine = EquivalenceEngine::builder()
        .diagnostics(move |event| sink.lock().unwrap().push(event.phase))
        .build()
        .unwrap();

    engine.check_equivalence("x", "y", &config()).await.unwrap();
    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            Phase::CacheLookup,
            Phase::Parse,
            Phase::Canonicalize,
            Phase::SlowPath,
            Phase::CacheStore,
        ]
    );

    phases.lock().unwrap().clear();
    engine.check_equivalence("x", "y", &config()).await.unwrap();
    assert_eq!(*phases.lock().unwrap(), vec![Phase::CacheLookup]);
}

#[test]
fn test_blocking_entry_point() {
    let engine = EquivalenceEngine::new();
    let v = engine
        .check_equivalence_blocking("(x+1)^2", "x^2+2x+1", &config())
        .unwrap();
    assert!(v.equivalent);
    assert!(v.elapsed_ms >= 0.0);
}
