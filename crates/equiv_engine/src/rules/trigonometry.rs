//! Trigonometric rewrites toward `sin`/`cos` with exact special values.

use super::helpers::{
    has_negative_coefficient, negate_term, pi_multiple, ratio, split_coefficient,
};
use equiv_ast::{build_sum, flatten_add, Context, Expr, ExprId, NodeKind};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

/// Exact value of `sin(q*pi)` for the angles with a closed form here.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TrigValue {
    Rational(BigRational),
    /// `coeff * sqrt(radicand)`
    Surd { coeff: BigRational, radicand: i64 },
}

impl TrigValue {
    fn negated(self) -> Self {
        match self {
            TrigValue::Rational(r) => TrigValue::Rational(-r),
            TrigValue::Surd { coeff, radicand } => TrigValue::Surd {
                coeff: -coeff,
                radicand,
            },
        }
    }

    fn to_expr(&self, ctx: &mut Context) -> ExprId {
        match self {
            TrigValue::Rational(r) => ctx.rational(r.clone()),
            TrigValue::Surd { coeff, radicand } => {
                let c = ctx.rational(coeff.clone());
                let n = ctx.num(*radicand);
                let root = ctx.sqrt(n);
                ctx.product(c, root)
            }
        }
    }
}

/// `sin(q*pi)` for `q` with denominator 1, 2, 3, 4 or 6.
fn sin_of_pi_multiple(q: &BigRational) -> Option<TrigValue> {
    let two = BigRational::from_integer(BigInt::from(2));
    // Reduce into [0, 2).
    let mut r = q.clone() - (q.clone() / &two).floor() * &two;
    let mut negate = false;
    if r >= BigRational::one() {
        r -= BigRational::one();
        negate = true;
    }
    let half = ratio(1, 2);
    if r > half {
        r = BigRational::one() - r;
    }

    let value = if r.is_zero() {
        TrigValue::Rational(BigRational::zero())
    } else if r == ratio(1, 6) {
        TrigValue::Rational(ratio(1, 2))
    } else if r == ratio(1, 4) {
        TrigValue::Surd {
            coeff: ratio(1, 2),
            radicand: 2,
        }
    } else if r == ratio(1, 3) {
        TrigValue::Surd {
            coeff: ratio(1, 2),
            radicand: 3,
        }
    } else if r == half {
        TrigValue::Rational(BigRational::one())
    } else {
        return None;
    };
    Some(if negate { value.negated() } else { value })
}

fn special_value(ctx: &Context, expr: ExprId) -> Option<TrigValue> {
    let (name, &[arg]) = ctx.function(expr)? else {
        return None;
    };
    special_angle_value(ctx, name, arg)
}

/// `name(arg)` for `sin`/`cos` when `arg` is a special multiple of pi.
pub(crate) fn special_angle_value(ctx: &Context, name: &str, arg: ExprId) -> Option<TrigValue> {
    let q = pi_multiple(ctx, arg)?;
    if ![1, 2, 3, 4, 6].iter().any(|d| q.denom() == &BigInt::from(*d)) {
        return None;
    }
    match name {
        "sin" => sin_of_pi_multiple(&q),
        // cos(x) = sin(x + pi/2)
        "cos" => sin_of_pi_multiple(&(q + ratio(1, 2))),
        _ => None,
    }
}

define_rule!(
    /// `tan u` -> `sin u / cos u`
    TangentAsRatioRule {
        name: "Tangent As Ratio",
        description: "Rewrite tangent as sine over cosine",
        priority: 75,
        targets: [NodeKind::Function],
    },
    matches |ctx, expr| { ctx.unary_call(expr, "tan").is_some() },
    transform |ctx, expr| {
        let Some(arg) = ctx.unary_call(expr, "tan") else {
            return expr;
        };
        let sin = ctx.call("sin", vec![arg]);
        let cos = ctx.call("cos", vec![arg]);
        ctx.frac(sin, cos)
    }
);

define_rule!(
    /// `cot`, `sec`, `csc` in terms of `sin` and `cos`
    ReciprocalTrigRule {
        name: "Reciprocal Trig Functions",
        description: "Rewrite cot, sec and csc via sine and cosine",
        priority: 75,
        targets: [NodeKind::Function],
    },
    matches |ctx, expr| {
        ["cot", "sec", "csc"]
            .iter()
            .any(|name| ctx.unary_call(expr, name).is_some())
    },
    transform |ctx, expr| {
        let Some((name, &[arg])) = ctx.function(expr) else {
            return expr;
        };
        let name = name.to_string();
        match name.as_str() {
            "cot" => {
                let cos = ctx.call("cos", vec![arg]);
                let sin = ctx.call("sin", vec![arg]);
                ctx.frac(cos, sin)
            }
            "sec" => {
                let one = ctx.num(1);
                let cos = ctx.call("cos", vec![arg]);
                ctx.frac(one, cos)
            }
            "csc" => {
                let one = ctx.num(1);
                let sin = ctx.call("sin", vec![arg]);
                ctx.frac(one, sin)
            }
            _ => expr,
        }
    }
);

define_rule!(
    /// `sin(-u)` -> `-sin u`, `cos(-u)` -> `cos u`
    TrigParityRule {
        name: "Trig Parity",
        description: "Sine is odd and cosine is even",
        priority: 72,
        targets: [NodeKind::Function],
    },
    matches |ctx, expr| {
        ["sin", "cos"].iter().any(|name| {
            ctx.unary_call(expr, name)
                .is_some_and(|arg| has_negative_coefficient(ctx, arg))
        })
    },
    transform |ctx, expr| {
        if let Some(arg) = ctx.unary_call(expr, "sin") {
            let positive = negate_term(ctx, arg);
            let sin = ctx.call("sin", vec![positive]);
            let minus_one = ctx.num(-1);
            return ctx.product(minus_one, sin);
        }
        if let Some(arg) = ctx.unary_call(expr, "cos") {
            let positive = negate_term(ctx, arg);
            return ctx.call("cos", vec![positive]);
        }
        expr
    }
);

define_rule!(
    /// `sin(pi/6)` -> `1/2`, `cos(pi/4)` -> `1/2 * sqrt(2)`, ...
    TrigSpecialAnglesRule {
        name: "Trig Special Angles",
        description: "Exact sine and cosine at multiples of pi/6 and pi/4",
        priority: 70,
        targets: [NodeKind::Function],
    },
    matches |ctx, expr| { special_value(ctx, expr).is_some() },
    transform |ctx, expr| {
        match special_value(ctx, expr) {
            Some(value) => value.to_expr(ctx),
            None => expr,
        }
    }
);

/// Argument `u` and coefficient `c` of a term `c * f(u)^2`.
fn squared_call(ctx: &Context, term: ExprId, name: &str) -> Option<(BigRational, ExprId)> {
    let split = split_coefficient(ctx, term);
    let [factor] = split.rest.as_slice() else {
        return None;
    };
    let Expr::Pow(base, exp) = ctx.get(*factor) else {
        return None;
    };
    let is_two = ctx
        .as_number(*exp)
        .is_some_and(|e| e.is_integer() && e.numer() == &BigInt::from(2));
    if !is_two {
        return None;
    }
    ctx.unary_call(*base, name).map(|arg| (split.coeff, arg))
}

/// Indices `(i, j)` of a `c*sin(u)^2` / `c*cos(u)^2` pair among `terms`.
fn pythagorean_pair(ctx: &Context, terms: &[ExprId]) -> Option<(usize, usize, BigRational)> {
    for (i, t) in terms.iter().enumerate() {
        let Some((c_sin, u)) = squared_call(ctx, *t, "sin") else {
            continue;
        };
        for (j, other) in terms.iter().enumerate() {
            if let Some((c_cos, v)) = squared_call(ctx, *other, "cos") {
                if u == v && c_sin == c_cos && !c_sin.is_zero() {
                    return Some((i.min(j), i.max(j), c_sin));
                }
            }
        }
    }
    None
}

define_rule!(
    /// `c*sin(u)^2 + c*cos(u)^2` -> `c` inside any sum
    PythagoreanIdentityRule {
        name: "Pythagorean Identity",
        description: "sin^2 + cos^2 = 1",
        priority: 62,
        targets: [NodeKind::Add],
    },
    matches |ctx, expr| {
        let terms = flatten_add(ctx, expr);
        pythagorean_pair(ctx, &terms).is_some()
    },
    transform |ctx, expr| {
        let terms = flatten_add(ctx, expr);
        let Some((i, j, coeff)) = pythagorean_pair(ctx, &terms) else {
            return expr;
        };
        let mut out: Vec<ExprId> = Vec::with_capacity(terms.len() - 1);
        for (k, t) in terms.iter().enumerate() {
            if k == i {
                out.push(ctx.rational(coeff.clone()));
            } else if k != j {
                out.push(*t);
            }
        }
        build_sum(ctx, &out)
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    fn pi_times(ctx: &mut Context, q: BigRational) -> ExprId {
        let c = ctx.rational(q);
        let pi = ctx.var("pi");
        ctx.product(c, pi)
    }

    #[test]
    fn test_sin_table() {
        assert_eq!(sin_of_pi_multiple(&ratio(0, 1)), Some(TrigValue::Rational(ratio(0, 1))));
        assert_eq!(sin_of_pi_multiple(&ratio(1, 6)), Some(TrigValue::Rational(ratio(1, 2))));
        assert_eq!(sin_of_pi_multiple(&ratio(5, 6)), Some(TrigValue::Rational(ratio(1, 2))));
        assert_eq!(
            sin_of_pi_multiple(&ratio(7, 6)),
            Some(TrigValue::Rational(ratio(-1, 2)))
        );
        assert_eq!(
            sin_of_pi_multiple(&ratio(-1, 2)),
            Some(TrigValue::Rational(ratio(-1, 1)))
        );
        assert_eq!(
            sin_of_pi_multiple(&ratio(3, 4)),
            Some(TrigValue::Surd {
                coeff: ratio(1, 2),
                radicand: 2
            })
        );
        assert_eq!(sin_of_pi_multiple(&ratio(1, 5)), None);
    }

    #[test]
    fn test_special_angles_rule() {
        let mut ctx = Context::new();
        let arg = pi_times(&mut ctx, ratio(1, 3));
        let cos = ctx.call("cos", vec![arg]);
        assert!(TrigSpecialAnglesRule.matches(&ctx, cos));
        let value = TrigSpecialAnglesRule.transform(&mut ctx, cos);
        assert_eq!(ctx.display(value).to_string(), "1/2");

        let pi = ctx.var("pi");
        let sin_pi = ctx.call("sin", vec![pi]);
        let value = TrigSpecialAnglesRule.transform(&mut ctx, sin_pi);
        assert!(ctx.is_zero(value));

        let x = ctx.var("x");
        let sin_x = ctx.call("sin", vec![x]);
        assert!(!TrigSpecialAnglesRule.matches(&ctx, sin_x));
    }

    #[test]
    fn test_parity() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let m1 = ctx.num(-1);
        let neg_x = ctx.product(m1, x);
        let sin = ctx.call("sin", vec![neg_x]);
        let cos = ctx.call("cos", vec![neg_x]);
        let s = TrigParityRule.transform(&mut ctx, sin);
        let c = TrigParityRule.transform(&mut ctx, cos);
        assert_eq!(ctx.display(s).to_string(), "-1*sin(x)");
        assert_eq!(ctx.display(c).to_string(), "cos(x)");
        assert!(!TrigParityRule.matches(&ctx, c));
    }

    #[test]
    fn test_pythagorean_pair_inside_longer_sum() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let two = ctx.num(2);
        let sin = ctx.call("sin", vec![x]);
        let cos = ctx.call("cos", vec![x]);
        let sin2 = ctx.pow(sin, two);
        let cos2 = ctx.pow(cos, two);
        let sum = build_sum(&mut ctx, &[cos2, y, sin2]);
        assert!(PythagoreanIdentityRule.matches(&ctx, sum));
        let out = PythagoreanIdentityRule.transform(&mut ctx, sum);
        assert_eq!(ctx.display(out).to_string(), "1 + y");
    }

    #[test]
    fn test_pythagorean_requires_same_argument() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let two = ctx.num(2);
        let sin = ctx.call("sin", vec![x]);
        let cos = ctx.call("cos", vec![y]);
        let sin2 = ctx.pow(sin, two);
        let cos2 = ctx.pow(cos, two);
        let sum = ctx.sum(sin2, cos2);
        assert!(!PythagoreanIdentityRule.matches(&ctx, sum));
    }

    #[test]
    fn test_tangent_and_reciprocals() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let tan = ctx.call("tan", vec![x]);
        let out = TangentAsRatioRule.transform(&mut ctx, tan);
        assert_eq!(ctx.display(out).to_string(), "sin(x)/cos(x)");
        let sec = ctx.call("sec", vec![x]);
        let out = ReciprocalTrigRule.transform(&mut ctx, sec);
        assert_eq!(ctx.display(out).to_string(), "1/cos(x)");
        assert!(!ReciprocalTrigRule.matches(&ctx, out));
    }
}
