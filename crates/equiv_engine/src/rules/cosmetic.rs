//! Ordering of commutative operands. Runs last so every other rule sees
//! settled operands.

use equiv_ast::{
    build_product, build_sum, flatten_add, flatten_mul, term_order, BinaryOp, Context, Expr,
    ExprId, NodeKind,
};

fn sorted_operands(ctx: &Context, expr: ExprId, op: BinaryOp) -> Option<Vec<ExprId>> {
    let operands = match ctx.get(expr) {
        Expr::Binary(found, _, _) if *found == op => match op {
            BinaryOp::Add => flatten_add(ctx, expr),
            _ => flatten_mul(ctx, expr),
        },
        _ => return None,
    };
    let mut sorted = operands.clone();
    sorted.sort_by(|a, b| term_order(ctx, *a, *b));
    (sorted != operands).then_some(sorted)
}

define_rule!(
    /// Numbers first, then symbols alphabetically, then compound factors.
    SortFactorsRule {
        name: "Sort Factors",
        description: "Put product factors in canonical order",
        priority: 20,
        targets: [NodeKind::Mul],
    },
    matches |ctx, expr| { sorted_operands(ctx, expr, BinaryOp::Mul).is_some() },
    transform |ctx, expr| {
        match sorted_operands(ctx, expr, BinaryOp::Mul) {
            Some(factors) => build_product(ctx, &factors),
            None => expr,
        }
    }
);

define_rule!(
    SortTermsRule {
        name: "Sort Terms",
        description: "Put sum terms in canonical order",
        priority: 10,
        targets: [NodeKind::Add],
    },
    matches |ctx, expr| { sorted_operands(ctx, expr, BinaryOp::Add).is_some() },
    transform |ctx, expr| {
        match sorted_operands(ctx, expr, BinaryOp::Add) {
            Some(terms) => build_sum(ctx, &terms),
            None => expr,
        }
    }
);
