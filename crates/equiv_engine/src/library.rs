use crate::region::{Region, RegionSet};
use crate::rule::Rule;
use equiv_ast::NodeKind;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;

/// Priority-ordered rule collection.
///
/// Built once, then shared read-only behind an `Arc`. Rules are kept in
/// descending priority; rules of equal priority keep registration order.
/// Each node kind has its own bucket with the same ordering, and a rule
/// without target kinds lands in every bucket.
#[derive(Clone, Default)]
pub struct RuleLibrary {
    ordered: Vec<Arc<dyn Rule>>,
    by_kind: FxHashMap<NodeKind, Vec<Arc<dyn Rule>>>,
}

/// One row of [`RuleLibrary::describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub regions: String,
}

fn insert_by_priority(rules: &mut Vec<Arc<dyn Rule>>, rule: Arc<dyn Rule>) {
    let priority = rule.priority();
    let pos = rules
        .iter()
        .position(|r| r.priority() < priority)
        .unwrap_or(rules.len());
    rules.insert(pos, rule);
}

impl RuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural, trigonometric, algebraic and cosmetic rules.
    pub fn with_default_rules() -> Self {
        let mut library = Self::new();
        crate::rules::register_structural(&mut library);
        crate::rules::register_trigonometry(&mut library);
        crate::rules::register_algebra(&mut library);
        crate::rules::register_cosmetic(&mut library);

        #[cfg(debug_assertions)]
        library.assert_unique_rule_names();

        library
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        let rule: Arc<dyn Rule> = rule.into();
        let targets: &[NodeKind] = rule.target_kinds().unwrap_or(&NodeKind::ALL);
        for kind in targets {
            insert_by_priority(self.by_kind.entry(*kind).or_default(), rule.clone());
        }
        insert_by_priority(&mut self.ordered, rule);
    }

    /// Every rule, highest priority first.
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.ordered
    }

    /// Rules that may fire on a node of `kind`, highest priority first.
    pub fn rules_for(&self, kind: NodeKind) -> &[Arc<dyn Rule>] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Listing for display, restricted to rules eligible in `region` when given.
    pub fn describe(&self, region: Option<Region>) -> Vec<RuleInfo> {
        self.ordered
            .iter()
            .filter(|r| region.map_or(true, |region| r.regions().contains(region)))
            .map(|r| RuleInfo {
                name: r.name().to_string(),
                description: r.description().to_string(),
                priority: r.priority(),
                regions: regions_label(r.regions()),
            })
            .collect()
    }

    #[cfg(debug_assertions)]
    #[allow(clippy::panic)]
    fn assert_unique_rule_names(&self) {
        let mut seen = rustc_hash::FxHashSet::default();
        for rule in &self.ordered {
            if !seen.insert(rule.name()) {
                panic!("Duplicate rule name detected: '{}'", rule.name());
            }
        }
    }
}

fn regions_label(regions: RegionSet) -> String {
    if regions == RegionSet::ALL {
        "all".to_string()
    } else {
        regions.to_string()
    }
}

impl std::fmt::Debug for RuleLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.ordered.iter().map(|r| (r.name(), r.priority())))
            .finish()
    }
}
