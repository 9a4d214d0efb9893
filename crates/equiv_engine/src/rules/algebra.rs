//! Arithmetic folding, expansion and collection of like terms.

use super::helpers::{build_term, split_coefficient};
use equiv_ast::{
    build_product, build_sum, flatten_add, flatten_mul, BinaryOp, Context, Expr, ExprId,
    NodeKind,
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rustc_hash::FxHashMap;

/// Largest integer exponent folded into a number.
const MAX_FOLD_EXPONENT: u32 = 64;
/// Upper bound on `bits(base) * exponent` when folding a power.
const MAX_FOLD_BITS: u64 = 4096;
/// Sums with more terms than this are not squared out.
const MAX_EXPANSION_TERMS: usize = 8;

// ============================================================================
// Constant folding
// ============================================================================

fn integer_value(n: &BigRational) -> Option<i64> {
    if n.is_integer() {
        n.numer().to_i64()
    } else {
        None
    }
}

fn pow_rational(base: &BigRational, exp: i64) -> Option<BigRational> {
    let magnitude = u32::try_from(exp.unsigned_abs()).ok()?;
    if magnitude > MAX_FOLD_EXPONENT {
        return None;
    }
    let bits = base.numer().bits().max(base.denom().bits());
    if bits.saturating_mul(u64::from(magnitude)) > MAX_FOLD_BITS {
        return None;
    }
    if base.is_zero() && exp < 0 {
        return None;
    }
    let numer = num_traits::pow(base.numer().clone(), magnitude as usize);
    let denom = num_traits::pow(base.denom().clone(), magnitude as usize);
    let value = BigRational::new(numer, denom);
    Some(if exp < 0 { value.recip() } else { value })
}

/// Exact `k`-th root of a rational, when there is one.
pub(crate) fn exact_root(n: &BigRational, k: u32) -> Option<BigRational> {
    if k == 0 || (k % 2 == 0 && n.is_negative()) {
        return None;
    }
    let root_of = |v: &BigInt| -> Option<BigInt> {
        let r = v.nth_root(k);
        (num_traits::pow(r.clone(), k as usize) == *v).then_some(r)
    };
    Some(BigRational::new(root_of(n.numer())?, root_of(n.denom())?))
}

/// What a constant fold turns a node into.
enum Folded {
    Number(BigRational),
    Existing(ExprId),
    Terms {
        constant: Option<BigRational>,
        rest: Vec<ExprId>,
    },
    Factors {
        coeff: BigRational,
        rest: Vec<ExprId>,
    },
    Scaled {
        coeff: BigRational,
        expr: ExprId,
    },
    SquareRoot(ExprId),
}

fn fold_plan(ctx: &Context, expr: ExprId) -> Option<Folded> {
    match ctx.get(expr) {
        Expr::Binary(BinaryOp::Add, _, _) => {
            let terms = flatten_add(ctx, expr);
            let numbers: Vec<&BigRational> =
                terms.iter().filter_map(|t| ctx.as_number(*t)).collect();
            let has_zero = numbers.iter().any(|n| n.is_zero());
            if numbers.len() < 2 && !has_zero {
                return None;
            }
            let sum: BigRational = numbers.into_iter().sum();
            let rest: Vec<ExprId> = terms
                .into_iter()
                .filter(|t| ctx.as_number(*t).is_none())
                .collect();
            if rest.is_empty() {
                return Some(Folded::Number(sum));
            }
            Some(Folded::Terms {
                constant: (!sum.is_zero()).then_some(sum),
                rest,
            })
        }
        Expr::Binary(BinaryOp::Mul, _, _) => {
            let factors = flatten_mul(ctx, expr);
            let numbers: Vec<&BigRational> =
                factors.iter().filter_map(|f| ctx.as_number(*f)).collect();
            let trivial = numbers.iter().any(|n| n.is_zero() || n.is_one());
            if numbers.len() < 2 && !trivial {
                return None;
            }
            let coeff: BigRational = numbers.into_iter().product();
            if coeff.is_zero() {
                return Some(Folded::Number(coeff));
            }
            let rest = factors
                .into_iter()
                .filter(|f| ctx.as_number(*f).is_none())
                .collect();
            Some(Folded::Factors { coeff, rest })
        }
        Expr::Pow(base, exp) => {
            let exp_value = ctx.as_number(*exp);
            if let (Some(b), Some(e)) = (ctx.as_number(*base), exp_value) {
                if let Some(value) = integer_value(e).and_then(|k| pow_rational(b, k)) {
                    return Some(Folded::Number(value));
                }
            }
            if ctx.is_one(*base) || exp_value.is_some_and(|e| e.is_zero()) {
                return Some(Folded::Number(BigRational::one()));
            }
            if exp_value.is_some_and(|e| e.is_one()) {
                return Some(Folded::Existing(*base));
            }
            let is_two = exp_value.and_then(integer_value) == Some(2);
            if let Expr::Sqrt(radicand, None) = ctx.get(*base) {
                if is_two {
                    return Some(Folded::Existing(*radicand));
                }
            }
            None
        }
        Expr::Frac(num, den) => {
            let den_value = ctx.as_number(*den)?;
            if den_value.is_zero() {
                return None;
            }
            if let Some(n) = ctx.as_number(*num) {
                return Some(Folded::Number(n / den_value));
            }
            if den_value.is_one() {
                return Some(Folded::Existing(*num));
            }
            Some(Folded::Scaled {
                coeff: den_value.recip(),
                expr: *num,
            })
        }
        Expr::Sqrt(radicand, index) => {
            let k = match index {
                None => 2,
                Some(index) => {
                    let k = ctx.as_number(*index).and_then(integer_value)?;
                    if k == 2 {
                        return Some(Folded::SquareRoot(*radicand));
                    }
                    u32::try_from(k).ok().filter(|k| *k > 0 && *k <= MAX_FOLD_EXPONENT)?
                }
            };
            let n = ctx.as_number(*radicand)?;
            exact_root(n, k).map(Folded::Number)
        }
        _ => None,
    }
}

define_rule!(
    /// Arithmetic on literal numbers plus the identities `a^1`, `a^0`, `1^a`.
    FoldConstantsRule {
        name: "Fold Constants",
        description: "Evaluate numeric sub-expressions exactly",
        priority: 55,
        targets: [NodeKind::Add, NodeKind::Mul, NodeKind::Pow, NodeKind::Frac, NodeKind::Sqrt],
    },
    matches |ctx, expr| { fold_plan(ctx, expr).is_some() },
    transform |ctx, expr| {
        match fold_plan(ctx, expr) {
            None => expr,
            Some(Folded::Number(n)) => ctx.rational(n),
            Some(Folded::Existing(id)) => id,
            Some(Folded::Terms { constant, rest }) => {
                let mut terms = Vec::with_capacity(rest.len() + 1);
                if let Some(c) = constant {
                    terms.push(ctx.rational(c));
                }
                terms.extend(rest);
                build_sum(ctx, &terms)
            }
            Some(Folded::Factors { coeff, rest }) => build_term(ctx, coeff, &rest),
            Some(Folded::Scaled { coeff, expr: inner }) => {
                let c = ctx.rational(coeff);
                ctx.product(c, inner)
            }
            Some(Folded::SquareRoot(radicand)) => ctx.sqrt(radicand),
        }
    }
);

// ============================================================================
// Expansion
// ============================================================================

fn squared_sum_terms(ctx: &Context, expr: ExprId) -> Option<Vec<ExprId>> {
    let Expr::Pow(base, exp) = ctx.get(expr) else {
        return None;
    };
    if ctx.as_number(*exp).and_then(integer_value) != Some(2) {
        return None;
    }
    if !matches!(ctx.get(*base), Expr::Binary(BinaryOp::Add, _, _)) {
        return None;
    }
    let terms = flatten_add(ctx, *base);
    (terms.len() <= MAX_EXPANSION_TERMS).then_some(terms)
}

define_rule!(
    /// `(a + b)^2` -> `a*a + 2*a*b + b*b`
    ExpandSquaredBinomialRule {
        name: "Expand Squared Binomial",
        description: "Multiply out the square of a sum",
        priority: 60,
        targets: [NodeKind::Pow],
    },
    matches |ctx, expr| { squared_sum_terms(ctx, expr).is_some() },
    transform |ctx, expr| {
        let Some(terms) = squared_sum_terms(ctx, expr) else {
            return expr;
        };
        let two = ctx.num(2);
        let mut out = Vec::new();
        for (i, a) in terms.iter().enumerate() {
            out.push(build_product(ctx, &[*a, *a]));
            for b in &terms[i + 1..] {
                out.push(build_product(ctx, &[two, *a, *b]));
            }
        }
        build_sum(ctx, &out)
    }
);

/// Numeric coefficient and the single sum of a product `c * (a + b + ...)`.
fn constant_times_sum(ctx: &Context, expr: ExprId) -> Option<(BigRational, ExprId)> {
    if !matches!(ctx.get(expr), Expr::Binary(BinaryOp::Mul, _, _)) {
        return None;
    }
    let mut coeff = BigRational::one();
    let mut sum = None;
    let mut saw_number = false;
    for factor in flatten_mul(ctx, expr) {
        if let Some(n) = ctx.as_number(factor) {
            coeff *= n;
            saw_number = true;
        } else if matches!(ctx.get(factor), Expr::Binary(BinaryOp::Add, _, _)) && sum.is_none() {
            sum = Some(factor);
        } else {
            return None;
        }
    }
    if !saw_number {
        return None;
    }
    sum.map(|s| (coeff, s))
}

define_rule!(
    /// `c * (a + b)` -> `c*a + c*b` for a numeric `c`
    DistributeConstantRule {
        name: "Distribute Constant",
        description: "Distribute a numeric factor over a sum",
        priority: 58,
        targets: [NodeKind::Mul],
    },
    matches |ctx, expr| { constant_times_sum(ctx, expr).is_some() },
    transform |ctx, expr| {
        let Some((coeff, sum)) = constant_times_sum(ctx, expr) else {
            return expr;
        };
        let terms = flatten_add(ctx, sum);
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            let split = split_coefficient(ctx, t);
            out.push(build_term(ctx, &coeff * split.coeff, &split.rest));
        }
        build_sum(ctx, &out)
    }
);

// ============================================================================
// Collection
// ============================================================================

/// Factors of a product grouped by base, with numeric exponents summed.
/// `None` unless some base occurs more than once.
fn merged_powers(ctx: &Context, expr: ExprId) -> Option<(Vec<ExprId>, Vec<(ExprId, BigRational)>)> {
    if !matches!(ctx.get(expr), Expr::Binary(BinaryOp::Mul, _, _)) {
        return None;
    }
    let mut numbers = Vec::new();
    let mut bases: Vec<(ExprId, BigRational)> = Vec::new();
    let mut repeated = false;
    for factor in flatten_mul(ctx, expr) {
        if ctx.as_number(factor).is_some() {
            numbers.push(factor);
            continue;
        }
        let (base, exp) = match ctx.get(factor) {
            Expr::Pow(b, e) => match ctx.as_number(*e) {
                Some(e) => (*b, e.clone()),
                None => (factor, BigRational::one()),
            },
            _ => (factor, BigRational::one()),
        };
        match bases.iter_mut().find(|(b, _)| *b == base) {
            Some((_, total)) => {
                *total += exp;
                repeated = true;
            }
            None => bases.push((base, exp)),
        }
    }
    repeated.then_some((numbers, bases))
}

define_rule!(
    /// `x * x^2` -> `x^3`
    CombinePowersRule {
        name: "Combine Powers",
        description: "Multiply equal bases by adding exponents",
        priority: 52,
        targets: [NodeKind::Mul],
    },
    matches |ctx, expr| { merged_powers(ctx, expr).is_some() },
    transform |ctx, expr| {
        let Some((mut factors, bases)) = merged_powers(ctx, expr) else {
            return expr;
        };
        for (base, exp) in bases {
            if exp.is_zero() {
                continue;
            }
            if exp.is_one() {
                factors.push(base);
            } else {
                let e = ctx.rational(exp);
                factors.push(ctx.pow(base, e));
            }
        }
        build_product(ctx, &factors)
    }
);

/// Terms grouped by their non-coefficient part, in order of first
/// appearance. `None` unless two terms share a group.
fn like_term_groups(ctx: &Context, expr: ExprId) -> Option<Vec<(Vec<ExprId>, BigRational)>> {
    if !matches!(ctx.get(expr), Expr::Binary(BinaryOp::Add, _, _)) {
        return None;
    }
    let mut groups: Vec<(Vec<ExprId>, BigRational)> = Vec::new();
    let mut index: FxHashMap<Vec<ExprId>, usize> = FxHashMap::default();
    let mut merged = false;
    for term in flatten_add(ctx, expr) {
        let split = split_coefficient(ctx, term);
        let key = split.sorted_rest(ctx);
        match index.get(&key) {
            Some(&at) => {
                groups[at].1 += split.coeff;
                merged = true;
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, split.coeff));
            }
        }
    }
    merged.then_some(groups)
}

define_rule!(
    /// `2x + 3x` -> `5x`
    CombineLikeTermsRule {
        name: "Combine Like Terms",
        description: "Add the coefficients of terms with the same variable part",
        priority: 50,
        targets: [NodeKind::Add],
    },
    matches |ctx, expr| { like_term_groups(ctx, expr).is_some() },
    transform |ctx, expr| {
        let Some(groups) = like_term_groups(ctx, expr) else {
            return expr;
        };
        let mut terms = Vec::with_capacity(groups.len());
        for (rest, coeff) in groups {
            if coeff.is_zero() {
                continue;
            }
            terms.push(build_term(ctx, coeff, &rest));
        }
        build_sum(ctx, &terms)
    }
);
