//! Fixpoint rewriting of a tree into its canonical form.
//!
//! One pass visits the tree bottom-up. At every node the eligible rules for
//! that node kind are tried in priority order and only the first match fires.
//! Passes repeat until the root id stops changing, which under hash-consing
//! is the same as the tree no longer changing.
//!
//! Sums and products are rewritten as whole chains. The binary nodes along a
//! chain's left spine are visited in a loop, and the `Add` and `Mul` rules,
//! which all flatten the chain they match, only run at the chain root.

use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::library::RuleLibrary;
use crate::profiler::RuleProfiler;
use crate::region::Region;
use equiv_ast::{BinaryOp, Context, Expr, ExprId};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Nodes deeper than this are left untouched for the current pass.
const MAX_REWRITE_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalizationResult {
    #[serde(skip)]
    pub expr: ExprId,
    pub canonical: String,
    /// Passes run, including the final pass that changed nothing.
    pub iterations: usize,
    pub converged: bool,
    pub rule_hits: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub struct Canonicalizer {
    library: Arc<RuleLibrary>,
    max_iterations: usize,
}

impl Canonicalizer {
    pub fn new(library: Arc<RuleLibrary>) -> Self {
        Self {
            library,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Pass cap. Zero is treated as one.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn library(&self) -> &Arc<RuleLibrary> {
        &self.library
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn canonicalize(
        &self,
        ctx: &mut Context,
        root: ExprId,
        region: Region,
    ) -> CanonicalizationResult {
        let mut profiler = RuleProfiler::new();
        let mut current = root;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let mut pass = Pass {
                ctx: &mut *ctx,
                library: &self.library,
                region,
                memo: FxHashMap::default(),
                profiler: &mut profiler,
                depth: 0,
                depth_limited: false,
            };
            let next = pass.rewrite(current);
            if pass.depth_limited {
                debug!(target: "canonicalize", pass = iterations, "depth_limit_reached");
            }
            if next == current {
                converged = true;
                break;
            }
            current = next;
        }

        if !converged {
            warn!(
                target: "canonicalize",
                iterations,
                "canonicalization did not reach a fixpoint; using best-effort form"
            );
        }

        let canonical = ctx.display(current).to_string();
        debug!(
            target: "canonicalize",
            iterations,
            converged,
            rule_firings = profiler.total(),
            canonical = %canonical,
            "canonicalization_complete"
        );

        CanonicalizationResult {
            expr: current,
            canonical,
            iterations,
            converged,
            rule_hits: profiler.hits(),
        }
    }
}

struct Pass<'a> {
    ctx: &'a mut Context,
    library: &'a RuleLibrary,
    region: Region,
    /// Shared sub-trees are rewritten once per pass.
    memo: FxHashMap<ExprId, ExprId>,
    profiler: &'a mut RuleProfiler,
    depth: usize,
    depth_limited: bool,
}

impl Pass<'_> {
    fn rewrite(&mut self, id: ExprId) -> ExprId {
        if let Some(done) = self.memo.get(&id) {
            return *done;
        }
        if self.depth >= MAX_REWRITE_DEPTH {
            self.depth_limited = true;
            return id;
        }

        self.depth += 1;
        let result = if matches!(self.ctx.get(id), Expr::Binary(..)) {
            self.rewrite_chain(id)
        } else {
            let rebuilt = self.rewrite_children(id);
            self.apply_first_rule(rebuilt)
        };
        self.depth -= 1;

        self.memo.insert(id, result);
        result
    }

    fn rewrite_children(&mut self, id: ExprId) -> ExprId {
        let node = self.ctx.get(id).clone();
        let children = node.children();
        let mut rewritten = Vec::with_capacity(children.len());
        for child in &children {
            rewritten.push(self.rewrite(*child));
        }
        if rewritten == children {
            return id;
        }
        match node.with_children(&rewritten) {
            Some(expr) => self.ctx.add(expr),
            None => id,
        }
    }

    /// Rewrite a binary node and every binary node down its left spine.
    /// Operands recurse; spine links do not.
    fn rewrite_chain(&mut self, root: ExprId) -> ExprId {
        let mut links = Vec::new();
        let mut current = root;
        while let Expr::Binary(op, l, r) = self.ctx.get(current) {
            links.push((current, *op, *l, *r));
            current = *l;
        }

        let mut acc = self.rewrite(current);
        for i in (0..links.len()).rev() {
            let (id, op, left, right) = links[i];
            let new_right = self.rewrite(right);
            let rebuilt = if acc == left && new_right == right {
                id
            } else {
                self.ctx.binary(op, acc, new_right)
            };
            let inner_link = i > 0
                && links[i - 1].1 == op
                && matches!(op, BinaryOp::Add | BinaryOp::Mul);
            acc = if inner_link {
                rebuilt
            } else {
                let out = self.apply_first_rule(rebuilt);
                self.memo.insert(id, out);
                out
            };
        }
        acc
    }

    fn apply_first_rule(&mut self, id: ExprId) -> ExprId {
        let kind = self.ctx.get(id).kind();
        for rule in self.library.rules_for(kind) {
            if !rule.regions().contains(self.region) || !rule.matches(self.ctx, id) {
                continue;
            }
            let out = rule.transform(self.ctx, id);
            if out == id {
                // A match that changes nothing would stall the pass; try the next rule.
                trace!(target: "canonicalize", rule = rule.name(), "rule_matched_without_change");
                continue;
            }
            trace!(
                target: "canonicalize",
                rule = rule.name(),
                before = %self.ctx.display(id),
                after = %self.ctx.display(out),
                "rule_applied"
            );
            self.profiler.record(rule.name());
            return out;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiv_ast::{Delimiter, Expr};
    use equiv_parser::parse_latex;

    fn canonical(markup: &str, region: Region) -> CanonicalizationResult {
        let mut ctx = Context::new();
        let root = parse_latex(&mut ctx, markup).unwrap();
        Canonicalizer::new(Arc::new(RuleLibrary::with_default_rules())).canonicalize(
            &mut ctx, root, region,
        )
    }

    fn form(markup: &str) -> String {
        canonical(markup, Region::Standard).canonical
    }

    #[test]
    fn test_commuted_sum_has_one_form() {
        assert_eq!(form("a+b"), form("b+a"));
        assert_eq!(form("a+b"), "a + b");
    }

    #[test]
    fn test_like_terms_combine() {
        assert_eq!(form("2x+3x"), "5*x");
        assert_eq!(form("2x+3x"), form("5x"));
        assert_eq!(form("x - x"), "0");
    }

    #[test]
    fn test_squared_binomial_matches_expanded_form() {
        assert_eq!(form("x^2+4x+4"), form("(x+2)^2"));
    }

    #[test]
    fn test_result_reports_convergence_and_hits() {
        let result = canonical("(x+1)(x+1)", Region::Standard);
        assert!(result.converged);
        assert!(result.iterations >= 2);
        assert!(result
            .rule_hits
            .iter()
            .any(|(name, _)| name == "Insert Explicit Multiplication"));
    }

    #[test]
    fn test_already_canonical_converges_in_one_pass() {
        let first = canonical("y + 2x", Region::Standard);
        let mut ctx = Context::new();
        let root = parse_latex(&mut ctx, &first.canonical).unwrap();
        let library = Arc::new(RuleLibrary::with_default_rules());
        let once =
            Canonicalizer::new(library.clone()).canonicalize(&mut ctx, root, Region::Standard);
        let again =
            Canonicalizer::new(library).canonicalize(&mut ctx, once.expr, Region::Standard);
        assert_eq!(again.iterations, 1);
        assert!(again.rule_hits.is_empty());
        assert_eq!(again.expr, once.expr);
    }

    #[test]
    fn test_iteration_cap_gives_best_effort_result() {
        let mut ctx = Context::new();
        let root = parse_latex(&mut ctx, "(x+2)^2 - (x^2+4x+4)").unwrap();
        let result = Canonicalizer::new(Arc::new(RuleLibrary::with_default_rules()))
            .with_max_iterations(1)
            .canonicalize(&mut ctx, root, Region::Standard);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(!result.canonical.is_empty());
    }

    #[test]
    fn test_region_gates_function_aliases() {
        assert_ne!(
            canonical("\\tg(x)", Region::Standard).canonical,
            canonical("\\tan(x)", Region::Standard).canonical
        );
        assert_eq!(
            canonical("\\tg(x)", Region::Continental).canonical,
            canonical("\\tan(x)", Region::Continental).canonical
        );
    }

    #[test]
    fn test_trig_identities() {
        assert_eq!(form("\\sin^2 x + \\cos^2 x"), "1");
        assert_eq!(form("\\sin(\\frac{\\pi}{6})"), "1/2");
        assert_eq!(form("\\cos(-x)"), form("\\cos x"));
    }

    #[test]
    fn test_long_sum_is_sorted_once_at_the_root() {
        let markup = (0..3_000)
            .map(|i| format!("x_{{{}}}", i))
            .collect::<Vec<_>>()
            .join(" + ");
        let result = canonical(&markup, Region::Standard);
        assert!(result.converged);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.rule_hits, vec![("Sort Terms".to_string(), 1)]);
        assert!(result.canonical.starts_with("x_0 + x_1 + x_10 + x_100 + "));
    }

    #[test]
    fn test_deep_nesting_still_converges() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let mut id = x;
        for _ in 0..600 {
            id = ctx.add(Expr::Grouped(Delimiter::Paren, id, Delimiter::Paren));
        }
        let result = Canonicalizer::new(Arc::new(RuleLibrary::with_default_rules()))
            .canonicalize(&mut ctx, id, Region::Standard);
        assert!(result.converged);
        assert_eq!(result.expr, x);
    }
}
