use equiv_ast::{Context, Span};
use equiv_parser::{parse_latex, ParseError, MAX_NESTING_DEPTH};

fn nested(open: &str, inner: &str, close: &str, depth: usize) -> String {
    format!("{}{}{}", open.repeat(depth), inner, close.repeat(depth))
}

#[test]
fn moderate_nesting_parses() {
    let mut ctx = Context::new();
    let markup = nested("(", "x", ")", MAX_NESTING_DEPTH / 2);
    assert!(parse_latex(&mut ctx, &markup).is_ok());
}

#[test]
fn deep_parentheses_are_rejected_not_overflowed() {
    let mut ctx = Context::new();
    let markup = nested("(", "x", ")", 5_000);
    let err = parse_latex(&mut ctx, &markup).unwrap_err();
    assert!(
        matches!(err, ParseError::NestingTooDeep { limit, .. } if limit == MAX_NESTING_DEPTH),
        "{:?}",
        err
    );
    // One '(' per level; the first refused one is at offset MAX_NESTING_DEPTH.
    assert_eq!(
        err.span(),
        Some(Span::new(MAX_NESTING_DEPTH, MAX_NESTING_DEPTH + 1))
    );
}

#[test]
fn deep_nesting_of_every_kind_is_rejected() {
    let cases = [
        nested("{", "x", "}", 5_000),
        nested("\\left(", "x", "\\right)", 5_000),
        nested("\\frac{", "1", "}{2}", 5_000),
        nested("x^{", "2", "}", 5_000),
        nested("\\sin(", "x", ")", 5_000),
        nested("\\sqrt{", "x", "}", 5_000),
        format!("{}x", "-".repeat(5_000)),
        format!("{}x", "\\sqrt ".repeat(5_000)),
    ];
    for markup in &cases {
        let mut ctx = Context::new();
        let err = parse_latex(&mut ctx, markup).unwrap_err();
        assert!(
            matches!(err, ParseError::NestingTooDeep { .. }),
            "{}: {:?}",
            &markup[..20],
            err
        );
    }
}

#[test]
fn long_flat_sums_parse_and_display() {
    let mut ctx = Context::new();
    let markup = (0..20_000)
        .map(|i| format!("x_{{{}}}", i))
        .collect::<Vec<_>>()
        .join(" + ");
    let id = parse_latex(&mut ctx, &markup).unwrap();
    let shown = ctx.display(id).to_string();
    assert!(shown.starts_with("x_0 + x_1 + "));
    assert!(shown.ends_with(" + x_19999"));
}
