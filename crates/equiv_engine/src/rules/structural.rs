//! Shape normalization: notation differences that carry no meaning.

use super::helpers::{build_term, has_negative_coefficient, negate_term, split_coefficient};
use crate::region::RegionSet;
use equiv_ast::traversal::is_left_assoc_chain;
use equiv_ast::{
    build_product, build_sum, flatten_add, flatten_mul, BinaryOp, Expr, NodeKind, UnaryOp,
};

/// Continental function names and their standard spelling.
const REGIONAL_ALIASES: &[(&str, &str)] = &[
    ("tg", "tan"),
    ("ctg", "cot"),
    ("cosec", "csc"),
    ("arctg", "arctan"),
];

define_rule!(
    /// `(e)`, `[e]`, `\{e\}` -> `e`
    StripGroupingRule {
        name: "Strip Grouping",
        description: "Remove written grouping delimiters",
        priority: 100,
        targets: [NodeKind::Grouped],
    },
    matches |ctx, expr| { matches!(ctx.get(expr), Expr::Grouped(..)) },
    transform |ctx, expr| {
        match ctx.get(expr) {
            Expr::Grouped(_, body, _) => *body,
            _ => expr,
        }
    }
);

define_rule!(
    InsertExplicitMultiplicationRule {
        name: "Insert Explicit Multiplication",
        description: "Juxtaposition becomes an explicit product",
        priority: 96,
        targets: [NodeKind::ImplicitMul],
    },
    matches |ctx, expr| { matches!(ctx.get(expr), Expr::Binary(BinaryOp::ImplicitMul, _, _)) },
    transform |ctx, expr| {
        match *ctx.get(expr) {
            Expr::Binary(BinaryOp::ImplicitMul, l, r) => ctx.product(l, r),
            _ => expr,
        }
    }
);

define_rule!(
    /// `a - b` -> `a + (-b)`, `+a` -> `a`
    SubtractionToAdditionRule {
        name: "Subtraction To Addition",
        description: "Express subtraction as addition of a negation",
        priority: 95,
        targets: [NodeKind::Sub, NodeKind::Plus],
    },
    matches |ctx, expr| {
        matches!(
            ctx.get(expr),
            Expr::Binary(BinaryOp::Sub, _, _) | Expr::Unary(UnaryOp::Plus, _)
        )
    },
    transform |ctx, expr| {
        match *ctx.get(expr) {
            Expr::Binary(BinaryOp::Sub, l, r) => {
                let neg = ctx.neg(r);
                ctx.sum(l, neg)
            }
            Expr::Unary(UnaryOp::Plus, inner) => inner,
            _ => expr,
        }
    }
);

define_rule!(
    DivisionToFractionRule {
        name: "Division To Fraction",
        description: "Inline division becomes a fraction",
        priority: 94,
        targets: [NodeKind::Div],
    },
    matches |ctx, expr| { matches!(ctx.get(expr), Expr::Binary(BinaryOp::Div, _, _)) },
    transform |ctx, expr| {
        match *ctx.get(expr) {
            Expr::Binary(BinaryOp::Div, l, r) => ctx.frac(l, r),
            _ => expr,
        }
    }
);

define_rule!(
    /// `tg x` -> `tan x` and friends, only under continental notation.
    RegionalFunctionNamesRule {
        name: "Regional Function Names",
        description: "Map continental function names to their standard names",
        priority: 93,
        targets: [NodeKind::Function],
        regions: RegionSet::CONTINENTAL,
    },
    matches |ctx, expr| {
        ctx.function(expr)
            .is_some_and(|(name, _)| REGIONAL_ALIASES.iter().any(|(alias, _)| *alias == name))
    },
    transform |ctx, expr| {
        let Some((name, args)) = ctx.function(expr) else {
            return expr;
        };
        let Some((_, standard)) = REGIONAL_ALIASES.iter().find(|(alias, _)| *alias == name) else {
            return expr;
        };
        let args = args.to_vec();
        ctx.call(standard, args)
    }
);

define_rule!(
    /// `-(-a)` -> `a`
    CollapseDoubleNegationRule {
        name: "Collapse Double Negation",
        description: "Two negations cancel",
        priority: 90,
        targets: [NodeKind::Neg],
    },
    matches |ctx, expr| {
        match ctx.get(expr) {
            Expr::Unary(UnaryOp::Neg, inner) => {
                matches!(ctx.get(*inner), Expr::Unary(UnaryOp::Neg, _))
            }
            _ => false,
        }
    },
    transform |ctx, expr| {
        match ctx.get(expr) {
            Expr::Unary(UnaryOp::Neg, inner) => match ctx.get(*inner) {
                Expr::Unary(UnaryOp::Neg, a) => *a,
                _ => expr,
            },
            _ => expr,
        }
    }
);

define_rule!(
    /// `-3` -> number `-3`, `-e` -> `(-1) * e`
    NegationToCoefficientRule {
        name: "Negation To Coefficient",
        description: "Express negation as a numeric coefficient",
        priority: 88,
        targets: [NodeKind::Neg],
    },
    matches |ctx, expr| { matches!(ctx.get(expr), Expr::Unary(UnaryOp::Neg, _)) },
    transform |ctx, expr| {
        let Expr::Unary(UnaryOp::Neg, inner) = *ctx.get(expr) else {
            return expr;
        };
        if let Some(n) = ctx.as_number(inner) {
            let negated = -n.clone();
            return ctx.rational(negated);
        }
        let minus_one = ctx.num(-1);
        ctx.product(minus_one, inner)
    }
);

define_rule!(
    /// `a + (b + c)` -> `(a + b) + c`
    FlattenAdditionRule {
        name: "Flatten Addition",
        description: "Re-associate nested sums into one left-leaning chain",
        priority: 85,
        targets: [NodeKind::Add],
    },
    matches |ctx, expr| { !is_left_assoc_chain(ctx, expr, BinaryOp::Add) },
    transform |ctx, expr| {
        let terms = flatten_add(ctx, expr);
        build_sum(ctx, &terms)
    }
);

define_rule!(
    FlattenMultiplicationRule {
        name: "Flatten Multiplication",
        description: "Re-associate nested products into one left-leaning chain",
        priority: 85,
        targets: [NodeKind::Mul],
    },
    matches |ctx, expr| { !is_left_assoc_chain(ctx, expr, BinaryOp::Mul) },
    transform |ctx, expr| {
        let factors = flatten_mul(ctx, expr);
        build_product(ctx, &factors)
    }
);

define_rule!(
    /// `a / (-b)` -> `(-a) / b`, then `(-a) / b` -> `-1 * (a / b)`
    NormalizeFractionSignRule {
        name: "Normalize Fraction Sign",
        description: "Move negative coefficients in front of a fraction",
        priority: 80,
        targets: [NodeKind::Frac],
    },
    matches |ctx, expr| {
        match ctx.get(expr) {
            Expr::Frac(n, d) => {
                has_negative_coefficient(ctx, *n) || has_negative_coefficient(ctx, *d)
            }
            _ => false,
        }
    },
    transform |ctx, expr| {
        let Expr::Frac(n, d) = *ctx.get(expr) else {
            return expr;
        };
        if has_negative_coefficient(ctx, d) {
            let n = negate_term(ctx, n);
            let d = negate_term(ctx, d);
            return ctx.frac(n, d);
        }
        let split = split_coefficient(ctx, n);
        let positive = build_term(ctx, -split.coeff, &split.rest);
        let frac = ctx.frac(positive, d);
        let minus_one = ctx.num(-1);
        ctx.product(minus_one, frac)
    }
);
