//! Chain helpers and whole-tree queries shared by the parser and the engine.

use crate::{BinaryOp, Context, Expr, ExprId};
use std::collections::BTreeSet;

/// Operands of a (possibly nested) `Add` chain, left to right.
pub fn flatten_add(ctx: &Context, id: ExprId) -> Vec<ExprId> {
    let mut out = Vec::new();
    flatten_binary(ctx, id, BinaryOp::Add, &mut out);
    out
}

/// Factors of a (possibly nested) explicit `Mul` chain, left to right.
pub fn flatten_mul(ctx: &Context, id: ExprId) -> Vec<ExprId> {
    let mut out = Vec::new();
    flatten_binary(ctx, id, BinaryOp::Mul, &mut out);
    out
}

fn flatten_binary(ctx: &Context, id: ExprId, op: BinaryOp, out: &mut Vec<ExprId>) {
    // Iterative on the left spine: canonical chains are left-associated and
    // can be long.
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        match ctx.get(current) {
            Expr::Binary(o, l, r) if *o == op => {
                stack.push(*r);
                stack.push(*l);
            }
            _ => out.push(current),
        }
    }
}

/// Left-associated `Add` chain; `0` for no terms.
pub fn build_sum(ctx: &mut Context, terms: &[ExprId]) -> ExprId {
    build_chain(ctx, terms, BinaryOp::Add, 0)
}

/// Left-associated `Mul` chain; `1` for no factors.
pub fn build_product(ctx: &mut Context, factors: &[ExprId]) -> ExprId {
    build_chain(ctx, factors, BinaryOp::Mul, 1)
}

fn build_chain(ctx: &mut Context, items: &[ExprId], op: BinaryOp, empty: i64) -> ExprId {
    match items.split_first() {
        None => ctx.num(empty),
        Some((first, rest)) => rest
            .iter()
            .fold(*first, |acc, item| ctx.binary(op, acc, *item)),
    }
}

/// Whether `id` is a left-associated chain of `op`: no operand of the chain
/// is itself a parenthesized chain of the same operator on the right.
pub fn is_left_assoc_chain(ctx: &Context, id: ExprId, op: BinaryOp) -> bool {
    let mut current = id;
    loop {
        match ctx.get(current) {
            Expr::Binary(o, l, r) if *o == op => {
                if matches!(ctx.get(*r), Expr::Binary(ro, _, _) if *ro == op) {
                    return false;
                }
                current = *l;
            }
            _ => return true,
        }
    }
}

/// Names of all `Symbol` nodes reachable from `id`.
pub fn collect_symbols(ctx: &Context, id: ExprId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut seen = rustc_hash::FxHashSet::default();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        let node = ctx.get(current);
        if let Expr::Symbol(s) = node {
            names.insert(ctx.sym_name(*s).to_string());
        }
        stack.extend(node.children());
    }
    names
}

/// Number of nodes in the tree, counting shared sub-trees once per use.
pub fn tree_size(ctx: &Context, id: ExprId) -> usize {
    let mut count = 0;
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        count += 1;
        stack.extend(ctx.get(current).children());
    }
    count
}
