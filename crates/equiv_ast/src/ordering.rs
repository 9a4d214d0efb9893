use crate::{Context, Expr, ExprId};
use std::cmp::Ordering;

/// Total structural order over trees.
///
/// Compares names by their resolved strings, so the result is the same for
/// equal trees built in different contexts.
pub fn compare_expr(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let expr_a = context.get(a);
    let expr_b = context.get(b);

    let rank_a = get_rank(expr_a);
    let rank_b = get_rank(expr_b);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    use Expr::*;
    match (expr_a, expr_b) {
        (Number(n1), Number(n2)) => n1.cmp(n2),
        (Symbol(s1), Symbol(s2)) => context.sym_name(*s1).cmp(context.sym_name(*s2)),
        (Function(n1, args1), Function(n2, args2)) => {
            match context.sym_name(*n1).cmp(context.sym_name(*n2)) {
                Ordering::Equal => compare_args(context, args1, args2),
                ord => ord,
            }
        }
        (Unary(op1, e1), Unary(op2, e2)) => {
            (*op1 as u8).cmp(&(*op2 as u8)).then_with(|| compare_expr(context, *e1, *e2))
        }
        (Binary(op1, l1, r1), Binary(op2, l2, r2)) => (*op1 as u8)
            .cmp(&(*op2 as u8))
            .then_with(|| compare_pair(context, *l1, *r1, *l2, *r2)),
        (Pow(b1, e1), Pow(b2, e2)) | (Frac(b1, e1), Frac(b2, e2)) => {
            compare_pair(context, *b1, *e1, *b2, *e2)
        }
        (Sqrt(r1, i1), Sqrt(r2, i2)) => match (i1, i2) {
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(i1), Some(i2)) => compare_pair(context, *i1, *r1, *i2, *r2),
            (None, None) => compare_expr(context, *r1, *r2),
        },
        (Grouped(o1, body1, _), Grouped(o2, body2, _)) => {
            (*o1 as u8).cmp(&(*o2 as u8)).then_with(|| compare_expr(context, *body1, *body2))
        }
        _ => Ordering::Equal,
    }
}

/// Order used when sorting the operands of sums and products: numbers first,
/// then symbols alphabetically, then everything else by content hash (with
/// [`compare_expr`] breaking hash ties).
pub fn term_order(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let class = |id: ExprId| match context.get(id) {
        Expr::Number(_) => 0u8,
        Expr::Symbol(_) => 1,
        _ => 2,
    };
    match (class(a), class(b)) {
        (2, 2) => context
            .hash_of(a)
            .cmp(&context.hash_of(b))
            .then_with(|| compare_expr(context, a, b)),
        (ca, cb) if ca == cb => compare_expr(context, a, b),
        (ca, cb) => ca.cmp(&cb),
    }
}

fn get_rank(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(_) => 0,
        Expr::Symbol(_) => 1,
        Expr::Function(_, _) => 2,
        Expr::Sqrt(_, _) => 3,
        Expr::Pow(_, _) => 4,
        Expr::Unary(_, _) => 5,
        Expr::Frac(_, _) => 6,
        Expr::Binary(_, _, _) => 7,
        Expr::Grouped(_, _, _) => 8,
    }
}

fn compare_args(context: &Context, args1: &[ExprId], args2: &[ExprId]) -> Ordering {
    for (a1, a2) in args1.iter().zip(args2.iter()) {
        match compare_expr(context, *a1, *a2) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    args1.len().cmp(&args2.len())
}

fn compare_pair(context: &Context, l1: ExprId, r1: ExprId, l2: ExprId, r2: ExprId) -> Ordering {
    match compare_expr(context, l1, l2) {
        Ordering::Equal => compare_expr(context, r1, r2),
        ord => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_before_symbols_before_compound() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let x = ctx.var("x");
        let sin_x = ctx.call("sin", vec![x]);
        assert_eq!(term_order(&ctx, two, x), Ordering::Less);
        assert_eq!(term_order(&ctx, x, sin_x), Ordering::Less);
        assert_eq!(term_order(&ctx, sin_x, two), Ordering::Greater);
    }

    #[test]
    fn test_symbols_sort_alphabetically_regardless_of_interning() {
        let mut ctx = Context::new();
        let z = ctx.var("z");
        let a = ctx.var("a");
        assert_eq!(compare_expr(&ctx, a, z), Ordering::Less);
    }

    #[test]
    fn test_compare_expr_is_antisymmetric_for_distinct_trees() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let p = ctx.pow(x, two);
        let q = ctx.product(two, x);
        let ab = compare_expr(&ctx, p, q);
        let ba = compare_expr(&ctx, q, p);
        assert_ne!(ab, Ordering::Equal);
        assert_eq!(ab, ba.reverse());
    }
}
