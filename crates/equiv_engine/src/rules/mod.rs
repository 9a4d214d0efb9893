//! Default rule set, grouped by layer.
//!
//! Priorities: structural normalization at 80 and above, semantic
//! simplification between 40 and 79, cosmetic ordering below 40.

pub mod algebra;
pub mod cosmetic;
pub(crate) mod helpers;
pub mod structural;
pub mod trigonometry;

use crate::library::RuleLibrary;

pub fn register_structural(library: &mut RuleLibrary) {
    library.add_rule(Box::new(structural::StripGroupingRule));
    library.add_rule(Box::new(structural::InsertExplicitMultiplicationRule));
    library.add_rule(Box::new(structural::SubtractionToAdditionRule));
    library.add_rule(Box::new(structural::DivisionToFractionRule));
    library.add_rule(Box::new(structural::RegionalFunctionNamesRule));
    library.add_rule(Box::new(structural::CollapseDoubleNegationRule));
    library.add_rule(Box::new(structural::NegationToCoefficientRule));
    library.add_rule(Box::new(structural::FlattenAdditionRule));
    library.add_rule(Box::new(structural::FlattenMultiplicationRule));
    library.add_rule(Box::new(structural::NormalizeFractionSignRule));
}

pub fn register_trigonometry(library: &mut RuleLibrary) {
    library.add_rule(Box::new(trigonometry::TangentAsRatioRule));
    library.add_rule(Box::new(trigonometry::ReciprocalTrigRule));
    library.add_rule(Box::new(trigonometry::TrigParityRule));
    library.add_rule(Box::new(trigonometry::TrigSpecialAnglesRule));
    library.add_rule(Box::new(trigonometry::PythagoreanIdentityRule));
}

pub fn register_algebra(library: &mut RuleLibrary) {
    library.add_rule(Box::new(algebra::ExpandSquaredBinomialRule));
    library.add_rule(Box::new(algebra::DistributeConstantRule));
    library.add_rule(Box::new(algebra::FoldConstantsRule));
    library.add_rule(Box::new(algebra::CombinePowersRule));
    library.add_rule(Box::new(algebra::CombineLikeTermsRule));
}

pub fn register_cosmetic(library: &mut RuleLibrary) {
    library.add_rule(Box::new(cosmetic::SortFactorsRule));
    library.add_rule(Box::new(cosmetic::SortTermsRule));
}
