use equiv_ast::{Context, Expr};
use equiv_parser::conformance::{check_conformance, ConformanceCase, Expected, CASES};
use equiv_parser::{LatexParser, MarkupParser, ParseError, ParserVersion};

#[test]
fn latex_parser_passes_conformance_suite() {
    let failures = check_conformance(&LatexParser);
    assert!(
        failures.is_empty(),
        "conformance failures:\n{}",
        failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// A parser that accepts nothing reports every tree case as a failure.
struct RejectAll;

impl MarkupParser for RejectAll {
    fn name(&self) -> &str {
        "reject-all"
    }

    fn version(&self) -> ParserVersion {
        ParserVersion::new(1, 0)
    }

    fn parse(&self, _ctx: &mut Context, _markup: &str) -> Result<equiv_ast::ExprId, ParseError> {
        Err(ParseError::EmptyInput)
    }
}

#[test]
fn conformance_suite_detects_broken_parser() {
    let failures = check_conformance(&RejectAll);
    let tree_cases = CASES
        .iter()
        .filter(|c: &&ConformanceCase| matches!(c.expected, Expected::Tree(_)))
        .count();
    // The empty-input case is the only error case RejectAll gets right.
    let error_cases = CASES.len() - tree_cases;
    assert_eq!(failures.len(), tree_cases + error_cases - 1);
}

#[test]
fn parser_can_be_used_as_trait_object() {
    let parser: Box<dyn MarkupParser> = Box::new(LatexParser);
    let mut ctx = Context::new();
    let id = parser.parse(&mut ctx, "\\frac{x}{2}").unwrap();
    assert!(matches!(ctx.get(id), Expr::Frac(_, _)));
}

#[test]
fn shared_context_dedups_across_parses() {
    let mut ctx = Context::new();
    let a = LatexParser.parse(&mut ctx, "x^2 + 1").unwrap();
    let b = LatexParser.parse(&mut ctx, "x^{2}+1").unwrap();
    assert_eq!(a, b);
}
