//! Slow path: symbolic simplification for pairs the rules could not settle.

pub mod evaluator;
pub mod polynomial;
pub mod rational;

pub use evaluator::eval_f64;
pub use polynomial::PolyBudget;
pub use rational::RationalBackend;

use crate::error::FallbackError;
use crate::verdict::{Method, Verdict};
use equiv_ast::{collect_symbols, BinaryOp, Context, ExprId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// A symbolic simplifier the slow path can call.
///
/// Calls are synchronous and may take a long time; the engine runs them on
/// a blocking worker and abandons them when the budget runs out. The context
/// handed in is a private copy, so an abandoned call cannot affect anything
/// the caller still sees.
pub trait SymbolicBackend: Send + Sync {
    fn name(&self) -> &str;

    fn simplify(&self, ctx: &mut Context, expr: ExprId) -> Result<ExprId, FallbackError>;
}

/// Whether a simplified difference is zero: exactly, or numerically when it
/// mentions no free symbols.
fn residue_vanishes(ctx: &Context, residue: ExprId, tolerance: f64) -> bool {
    if ctx.is_zero(residue) {
        return true;
    }
    let symbols = collect_symbols(ctx, residue);
    if !symbols
        .iter()
        .all(|s| evaluator::constant_value(s).is_some())
    {
        return false;
    }
    match eval_f64(ctx, residue, &FxHashMap::default()) {
        Some(value) => value.is_finite() && value.abs() <= tolerance,
        None => false,
    }
}

/// Decide `lhs` against `rhs` with `backend`.
///
/// First the difference is simplified; a vanishing residue proves
/// equivalence. Otherwise (including when that step fails) both sides are
/// simplified on their own and their serializations compared.
pub(crate) fn decide(
    backend: &dyn SymbolicBackend,
    ctx: &mut Context,
    lhs: ExprId,
    rhs: ExprId,
    tolerance: f64,
) -> Verdict {
    let difference = ctx.binary(BinaryOp::Sub, lhs, rhs);
    match backend.simplify(ctx, difference) {
        Ok(residue) if residue_vanishes(ctx, residue, tolerance) => {
            debug!(target: "fallback", backend = backend.name(), "difference_vanished");
            return Verdict::new(true, Method::SlowDifference);
        }
        Ok(residue) => {
            debug!(
                target: "fallback",
                backend = backend.name(),
                residue = %ctx.display(residue),
                "difference_inconclusive"
            );
        }
        Err(err) => {
            debug!(target: "fallback", backend = backend.name(), error = %err, "difference_failed");
        }
    }

    let simplified = backend
        .simplify(ctx, lhs)
        .and_then(|a| backend.simplify(ctx, rhs).map(|b| (a, b)));
    match simplified {
        Ok((a, b)) => {
            let form_1 = ctx.display(a).to_string();
            let form_2 = ctx.display(b).to_string();
            Verdict::new(form_1 == form_2, Method::SlowSimplify)
                .with_forms(Some(form_1), Some(form_2))
        }
        Err(err) => Verdict::new(false, Method::SlowSimplify)
            .with_error(crate::error::EquivalenceError::FallbackEngine(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiv_parser::parse_latex;

    fn run(backend: &dyn SymbolicBackend, a: &str, b: &str) -> Verdict {
        let mut ctx = Context::new();
        let lhs = parse_latex(&mut ctx, a).unwrap();
        let rhs = parse_latex(&mut ctx, b).unwrap();
        decide(backend, &mut ctx, lhs, rhs, 1e-9)
    }

    /// Returns its input unchanged.
    struct Identity;

    impl SymbolicBackend for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn simplify(&self, _ctx: &mut Context, expr: ExprId) -> Result<ExprId, FallbackError> {
            Ok(expr)
        }
    }

    /// Fails on every call.
    struct Broken;

    impl SymbolicBackend for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn simplify(&self, _ctx: &mut Context, _expr: ExprId) -> Result<ExprId, FallbackError> {
            Err(FallbackError::Unsupported("everything".to_string()))
        }
    }

    #[test]
    fn test_difference_method() {
        let v = run(&RationalBackend::new(), "x^2+4x+4", "(x+2)^2");
        assert!(v.equivalent);
        assert_eq!(v.method, Method::SlowDifference);
    }

    #[test]
    fn test_ground_residue_within_tolerance() {
        // Left unevaluated by the identity backend, the residue is symbol-free.
        let v = run(&Identity, "\\sin(\\frac{\\pi}{2})", "1");
        assert!(v.equivalent);
        assert_eq!(v.method, Method::SlowDifference);

        let v = run(&Identity, "\\pi", "3.14159");
        assert!(!v.equivalent);
        assert_eq!(v.method, Method::SlowSimplify);
    }

    #[test]
    fn test_simplify_comparison_when_difference_inconclusive() {
        let v = run(&Identity, "x", "x");
        assert!(v.equivalent);

        let v = run(&RationalBackend::new(), "x", "y");
        assert!(!v.equivalent);
        assert_eq!(v.method, Method::SlowSimplify);
        assert_eq!(v.canonical_form_1.as_deref(), Some("x"));
        assert_eq!(v.canonical_form_2.as_deref(), Some("y"));
    }

    #[test]
    fn test_backend_error_is_reported() {
        let v = run(&Broken, "x", "x");
        assert!(!v.equivalent);
        assert_eq!(v.method, Method::SlowSimplify);
        assert!(v.error.unwrap().contains("everything"));
    }
}
