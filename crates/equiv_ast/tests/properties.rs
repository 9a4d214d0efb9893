use equiv_ast::{compare_expr, term_order, BinaryOp, Context, Expr, ExprId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum RawExpr {
    Number(i64),
    Symbol(String),
    Neg(Box<RawExpr>),
    Binary(BinaryOp, Box<RawExpr>, Box<RawExpr>),
    Pow(Box<RawExpr>, Box<RawExpr>),
    Call(String, Vec<RawExpr>),
}

fn arb_raw() -> impl Strategy<Value = RawExpr> {
    let leaf = prop_oneof![
        (-20i64..20).prop_map(RawExpr::Number),
        "[a-e]".prop_map(RawExpr::Symbol),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        let op = prop_oneof![
            Just(BinaryOp::Add),
            Just(BinaryOp::Sub),
            Just(BinaryOp::Mul),
            Just(BinaryOp::Div),
        ];
        prop_oneof![
            inner.clone().prop_map(|e| RawExpr::Neg(Box::new(e))),
            (op, inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| RawExpr::Binary(op, Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(b, e)| RawExpr::Pow(Box::new(b), Box::new(e))),
            (
                prop_oneof![Just("sin".to_string()), Just("log".to_string())],
                prop::collection::vec(inner, 1..3)
            )
                .prop_map(|(name, args)| RawExpr::Call(name, args)),
        ]
    })
}

fn build(ctx: &mut Context, raw: &RawExpr) -> ExprId {
    match raw {
        RawExpr::Number(n) => ctx.num(*n),
        RawExpr::Symbol(s) => ctx.var(s),
        RawExpr::Neg(e) => {
            let e = build(ctx, e);
            ctx.neg(e)
        }
        RawExpr::Binary(op, l, r) => {
            let (l, r) = (build(ctx, l), build(ctx, r));
            ctx.binary(*op, l, r)
        }
        RawExpr::Pow(b, e) => {
            let (b, e) = (build(ctx, b), build(ctx, e));
            ctx.pow(b, e)
        }
        RawExpr::Call(name, args) => {
            let args = args.iter().map(|a| build(ctx, a)).collect();
            ctx.call(name, args)
        }
    }
}

/// A context that already holds unrelated nodes and symbols.
fn noisy_context() -> Context {
    let mut ctx = Context::new();
    for name in ["z", "e", "y", "cos"] {
        let v = ctx.var(name);
        let two = ctx.num(2);
        ctx.add(Expr::Binary(BinaryOp::Mul, two, v));
    }
    ctx
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn hash_consing_shares_equal_trees(raw in arb_raw()) {
        let mut ctx = Context::new();
        let a = build(&mut ctx, &raw);
        let size = ctx.len();
        let b = build(&mut ctx, &raw);
        prop_assert_eq!(a, b);
        prop_assert_eq!(ctx.len(), size);
    }

    #[test]
    fn content_hash_ignores_insertion_history(raw in arb_raw()) {
        let mut plain = Context::new();
        let mut noisy = noisy_context();
        let a = build(&mut plain, &raw);
        let b = build(&mut noisy, &raw);
        prop_assert_eq!(plain.hash_of(a), noisy.hash_of(b));
        prop_assert_eq!(plain.display(a).to_string(), noisy.display(b).to_string());
    }

    #[test]
    fn structural_order_is_antisymmetric_and_portable(x in arb_raw(), y in arb_raw()) {
        let mut plain = Context::new();
        let (a, b) = (build(&mut plain, &x), build(&mut plain, &y));
        let mut noisy = noisy_context();
        let (c, d) = (build(&mut noisy, &x), build(&mut noisy, &y));

        let ab = compare_expr(&plain, a, b);
        prop_assert_eq!(ab, compare_expr(&plain, b, a).reverse());
        prop_assert_eq!(ab, compare_expr(&noisy, c, d));
        prop_assert_eq!(term_order(&plain, a, b), term_order(&noisy, c, d));
    }
}
