//! Plain-text serialization of trees.
//!
//! The output is the canonical string form compared by the equivalence
//! engine, so it must be a pure function of tree structure.

use crate::{BinaryOp, Context, Expr, ExprId, UnaryOp};
use num_rational::BigRational;
use num_traits::{One, Signed};
use std::fmt;

pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

impl Context {
    pub fn display(&self, id: ExprId) -> DisplayExpr<'_> {
        DisplayExpr { context: self, id }
    }
}

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(self.context, self.id, 0, f)
    }
}

fn precedence(ctx: &Context, id: ExprId) -> u8 {
    match ctx.get(id) {
        Expr::Number(n) => {
            if n.is_integer() && !n.is_negative() {
                PREC_ATOM
            } else {
                PREC_PRODUCT
            }
        }
        Expr::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) => PREC_SUM,
        Expr::Binary(_, _, _) | Expr::Frac(_, _) => PREC_PRODUCT,
        Expr::Unary(_, _) => PREC_PRODUCT,
        Expr::Pow(_, _) => PREC_POW,
        Expr::Symbol(_) | Expr::Sqrt(_, _) | Expr::Function(_, _) | Expr::Grouped(_, _, _) => {
            PREC_ATOM
        }
    }
}

fn write_expr(ctx: &Context, id: ExprId, min_prec: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if precedence(ctx, id) < min_prec {
        write!(f, "(")?;
        write_expr(ctx, id, 0, f)?;
        return write!(f, ")");
    }

    match ctx.get(id) {
        Expr::Number(n) => write_number(n, f),
        Expr::Symbol(s) => write!(f, "{}", ctx.sym_name(*s)),
        Expr::Unary(UnaryOp::Neg, e) => {
            write!(f, "-")?;
            write_expr(ctx, *e, PREC_UNARY, f)
        }
        Expr::Unary(UnaryOp::Plus, e) => {
            write!(f, "+")?;
            write_expr(ctx, *e, PREC_UNARY, f)
        }
        Expr::Binary(..) => write_chain(ctx, id, f),
        Expr::Frac(n, d) => {
            write_expr(ctx, *n, PREC_POW, f)?;
            write!(f, "/")?;
            write_expr(ctx, *d, PREC_ATOM, f)
        }
        Expr::Pow(b, e) => {
            write_expr(ctx, *b, PREC_ATOM, f)?;
            write!(f, "^")?;
            write_expr(ctx, *e, PREC_ATOM, f)
        }
        Expr::Sqrt(r, None) => {
            write!(f, "sqrt(")?;
            write_expr(ctx, *r, 0, f)?;
            write!(f, ")")
        }
        Expr::Sqrt(r, Some(index)) => {
            write!(f, "root(")?;
            write_expr(ctx, *r, 0, f)?;
            write!(f, ", ")?;
            write_expr(ctx, *index, 0, f)?;
            write!(f, ")")
        }
        Expr::Function(name, args) => {
            write!(f, "{}(", ctx.sym_name(*name))?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(ctx, *arg, 0, f)?;
            }
            write!(f, ")")
        }
        Expr::Grouped(open, body, close) => {
            write!(f, "{}", open.open())?;
            write_expr(ctx, *body, 0, f)?;
            write!(f, "{}", close.close())
        }
    }
}

/// Left operand precedence, separator and right operand precedence.
fn binary_layout(op: BinaryOp) -> (u8, &'static str, u8) {
    match op {
        BinaryOp::Add => (PREC_SUM, " + ", PREC_PRODUCT),
        BinaryOp::Sub => (PREC_SUM, " - ", PREC_PRODUCT),
        BinaryOp::Mul => (PREC_PRODUCT, "*", PREC_UNARY),
        BinaryOp::ImplicitMul => (PREC_PRODUCT, " ", PREC_UNARY),
        BinaryOp::Div => (PREC_PRODUCT, "/", PREC_UNARY),
    }
}

/// A binary node and the binary nodes down its left spine, written in one
/// loop so that long sums and products do not recurse per operand.
fn write_chain(ctx: &Context, id: ExprId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut links = Vec::new();
    let mut current = id;
    while let Expr::Binary(op, l, r) = ctx.get(current) {
        links.push((*op, *r));
        current = *l;
        if precedence(ctx, current) < binary_layout(*op).0 {
            break;
        }
    }

    let left_prec = links.last().map_or(0, |(op, _)| binary_layout(*op).0);
    write_expr(ctx, current, left_prec, f)?;
    for (op, right) in links.into_iter().rev() {
        if op == BinaryOp::Add {
            if let Some(magnitude) = negated_magnitude(ctx, right) {
                write!(f, " - {}", magnitude)?;
                continue;
            }
        }
        let (_, sep, right_prec) = binary_layout(op);
        write!(f, "{}", sep)?;
        write_expr(ctx, right, right_prec, f)?;
    }
    Ok(())
}

fn write_number(n: &BigRational, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_integer() {
        write!(f, "{}", n.numer())
    } else {
        write!(f, "{}/{}", n.numer(), n.denom())
    }
}

/// For a sum operand that carries a leading minus sign (negative number,
/// negated node or product with a negative leading coefficient), render its
/// magnitude so the sum can print as `a - b`.
fn negated_magnitude(ctx: &Context, id: ExprId) -> Option<String> {
    match ctx.get(id) {
        Expr::Number(n) if n.is_negative() => {
            let abs = -n.clone();
            Some(if abs.is_integer() {
                abs.numer().to_string()
            } else {
                format!("{}/{}", abs.numer(), abs.denom())
            })
        }
        Expr::Unary(UnaryOp::Neg, inner) => Some(paren_if(ctx, *inner, PREC_PRODUCT)),
        Expr::Binary(BinaryOp::Mul, _, _) => {
            let factors = crate::traversal::flatten_mul(ctx, id);
            let (first, rest) = factors.split_first()?;
            let coeff = ctx.as_number(*first)?;
            if !coeff.is_negative() || rest.is_empty() {
                return None;
            }
            let abs = -coeff.clone();
            let mut parts: Vec<String> = Vec::with_capacity(factors.len());
            if !abs.is_one() {
                parts.push(if abs.is_integer() {
                    abs.numer().to_string()
                } else {
                    format!("({}/{})", abs.numer(), abs.denom())
                });
            }
            for (i, factor) in rest.iter().enumerate() {
                let min = if i == 0 && parts.is_empty() {
                    PREC_PRODUCT
                } else {
                    PREC_UNARY
                };
                parts.push(paren_if(ctx, *factor, min));
            }
            Some(parts.join("*"))
        }
        _ => None,
    }
}

fn paren_if(ctx: &Context, id: ExprId, min_prec: u8) -> String {
    struct At<'a>(&'a Context, ExprId, u8);
    impl fmt::Display for At<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_expr(self.0, self.1, self.2, f)
        }
    }
    At(ctx, id, min_prec).to_string()
}
