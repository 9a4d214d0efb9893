//! Numeric evaluation of expressions using f64 values.
//!
//! Used to decide whether a ground residue left by the symbolic fallback is
//! zero within the configured tolerance.

use equiv_ast::{BinaryOp, Context, Expr, ExprId, UnaryOp};
use num_traits::ToPrimitive;
use rustc_hash::FxHashMap;

const MAX_EVAL_DEPTH: usize = 200;

/// Names evaluated without a binding.
pub fn constant_value(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Evaluate `expr` with `vars` bound, falling back to the named constants.
/// `None` for unbound symbols, unknown functions and depth beyond 200.
pub fn eval_f64(ctx: &Context, expr: ExprId, vars: &FxHashMap<String, f64>) -> Option<f64> {
    eval_f64_depth(ctx, expr, vars, MAX_EVAL_DEPTH)
}

fn eval_f64_depth(
    ctx: &Context,
    expr: ExprId,
    vars: &FxHashMap<String, f64>,
    depth: usize,
) -> Option<f64> {
    if depth == 0 {
        return None;
    }
    let eval = |id: ExprId| eval_f64_depth(ctx, id, vars, depth - 1);

    match ctx.get(expr) {
        Expr::Number(n) => n.to_f64(),
        Expr::Symbol(sym) => {
            let name = ctx.sym_name(*sym);
            vars.get(name).copied().or_else(|| constant_value(name))
        }
        Expr::Unary(UnaryOp::Neg, e) => Some(-eval(*e)?),
        Expr::Unary(UnaryOp::Plus, e) | Expr::Grouped(_, e, _) => eval(*e),
        Expr::Binary(op, l, r) => {
            let (a, b) = (eval(*l)?, eval(*r)?);
            Some(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul | BinaryOp::ImplicitMul => a * b,
                BinaryOp::Div => a / b,
            })
        }
        Expr::Frac(n, d) => Some(eval(*n)? / eval(*d)?),
        Expr::Pow(b, e) => Some(eval(*b)?.powf(eval(*e)?)),
        Expr::Sqrt(r, None) => Some(eval(*r)?.sqrt()),
        Expr::Sqrt(r, Some(index)) => {
            let (r, k) = (eval(*r)?, eval(*index)?);
            // Odd roots of negatives are real.
            if r < 0.0 && k.fract() == 0.0 && (k as i64) % 2 != 0 {
                Some(-(-r).powf(1.0 / k))
            } else {
                Some(r.powf(1.0 / k))
            }
        }
        Expr::Function(name, args) => {
            let values: Option<Vec<f64>> = args.iter().map(|a| eval(*a)).collect();
            let values = values?;
            let x = *values.first()?;
            match ctx.sym_name(*name) {
                "sin" => Some(x.sin()),
                "cos" => Some(x.cos()),
                "tan" | "tg" => Some(x.tan()),
                "sec" => Some(1.0 / x.cos()),
                "csc" | "cosec" => Some(1.0 / x.sin()),
                "cot" | "ctg" => Some(1.0 / x.tan()),

                "arcsin" => Some(x.asin()),
                "arccos" => Some(x.acos()),
                "arctan" | "arctg" => Some(x.atan()),

                "sinh" => Some(x.sinh()),
                "cosh" => Some(x.cosh()),
                "tanh" => Some(x.tanh()),

                "exp" => Some(x.exp()),
                "ln" => Some(x.ln()),
                // log(x, b) = ln x / ln b
                "log" => match values.as_slice() {
                    [x, b] => Some(x.ln() / b.ln()),
                    [x] => Some(x.log10()),
                    _ => None,
                },

                "abs" => Some(x.abs()),
                _ => None,
            }
        }
    }
}
