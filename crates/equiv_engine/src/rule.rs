use crate::region::RegionSet;
use equiv_ast::{Context, ExprId, NodeKind};

/// A single rewrite step of the canonicalizer.
///
/// Rules are pure: `transform` only adds nodes to the context. When
/// `matches` returns true, `transform` must return a different tree, so the
/// canonicalizer can tell a firing from a no-op by id comparison.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Higher fires first.
    fn priority(&self) -> i32;

    fn regions(&self) -> RegionSet {
        RegionSet::ALL
    }

    /// Node kinds this rule can match. `None` means every kind.
    fn target_kinds(&self) -> Option<&'static [NodeKind]> {
        None
    }

    fn matches(&self, ctx: &Context, expr: ExprId) -> bool;

    fn transform(&self, ctx: &mut Context, expr: ExprId) -> ExprId;
}
