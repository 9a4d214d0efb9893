//! Term-level views shared by several rules.

use equiv_ast::{build_product, flatten_mul, term_order, Context, Expr, ExprId};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// `coefficient * rest[0] * rest[1] * ...`, where the coefficient is the
/// product of every numeric factor.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTerm {
    pub coeff: BigRational,
    pub rest: Vec<ExprId>,
}

pub fn split_coefficient(ctx: &Context, term: ExprId) -> SplitTerm {
    match ctx.get(term) {
        Expr::Number(n) => SplitTerm {
            coeff: n.clone(),
            rest: Vec::new(),
        },
        Expr::Binary(equiv_ast::BinaryOp::Mul, _, _) => {
            let mut coeff = BigRational::one();
            let mut rest = Vec::new();
            for factor in flatten_mul(ctx, term) {
                match ctx.as_number(factor) {
                    Some(n) => coeff *= n,
                    None => rest.push(factor),
                }
            }
            SplitTerm { coeff, rest }
        }
        _ => SplitTerm {
            coeff: BigRational::one(),
            rest: vec![term],
        },
    }
}

impl SplitTerm {
    /// Non-coefficient factors in canonical order, used to group like terms.
    pub fn sorted_rest(&self, ctx: &Context) -> Vec<ExprId> {
        let mut rest = self.rest.clone();
        rest.sort_by(|a, b| term_order(ctx, *a, *b));
        rest
    }
}

/// Inverse of [`split_coefficient`].
pub fn build_term(ctx: &mut Context, coeff: BigRational, rest: &[ExprId]) -> ExprId {
    if rest.is_empty() || coeff.is_zero() {
        return ctx.rational(coeff);
    }
    if coeff.is_one() {
        return build_product(ctx, rest);
    }
    let mut factors = Vec::with_capacity(rest.len() + 1);
    factors.push(ctx.rational(coeff));
    factors.extend_from_slice(rest);
    build_product(ctx, &factors)
}

pub fn has_negative_coefficient(ctx: &Context, term: ExprId) -> bool {
    split_coefficient(ctx, term).coeff.is_negative()
}

/// `term` with its coefficient sign flipped.
pub fn negate_term(ctx: &mut Context, term: ExprId) -> ExprId {
    let split = split_coefficient(ctx, term);
    build_term(ctx, -split.coeff, &split.rest)
}

/// `q` when `arg` is `q * pi` for rational `q` (including plain `pi` and `0`).
pub fn pi_multiple(ctx: &Context, arg: ExprId) -> Option<BigRational> {
    if ctx.is_zero(arg) {
        return Some(BigRational::zero());
    }
    let split = split_coefficient(ctx, arg);
    match split.rest.as_slice() {
        [only] if ctx.symbol_name(*only) == Some("pi") => Some(split.coeff),
        _ => None,
    }
}

#[cfg(test)]
pub fn integer(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

pub fn ratio(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_coefficient_multiplies_numeric_factors() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let three = ctx.num(3);
        let x = ctx.var("x");
        let term = build_product(&mut ctx, &[two, x, three]);
        let split = split_coefficient(&ctx, term);
        assert_eq!(split.coeff, integer(6));
        assert_eq!(split.rest, vec![x]);
    }

    #[test]
    fn test_build_term_round_trip_shapes() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        assert_eq!(build_term(&mut ctx, integer(1), &[x]), x);
        let zero = build_term(&mut ctx, integer(0), &[x]);
        assert!(ctx.is_zero(zero));
        let t = build_term(&mut ctx, integer(-2), &[x]);
        assert_eq!(ctx.display(t).to_string(), "-2*x");
        let n = negate_term(&mut ctx, t);
        assert_eq!(ctx.display(n).to_string(), "2*x");
    }

    #[test]
    fn test_pi_multiple() {
        let mut ctx = Context::new();
        let pi = ctx.var("pi");
        let sixth = ctx.rational(ratio(1, 6));
        let arg = ctx.product(sixth, pi);
        assert_eq!(pi_multiple(&ctx, arg), Some(ratio(1, 6)));
        assert_eq!(pi_multiple(&ctx, pi), Some(integer(1)));
        let x = ctx.var("x");
        assert_eq!(pi_multiple(&ctx, x), None);
    }
}
