//! Last-resort keyword fallback used when fusion misses its deadline.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use tracing::debug;

use super::FusionResult;
use crate::analyzer::AnalyzerId;
use crate::analyzer::rules::keyword_rule;
use crate::evidence::Evidence;

/// Confidence of a fallback fusion result.
pub const FALLBACK_FUSION_CONFIDENCE: f64 = 0.3;

/// Factor marking a result produced by the fallback path.
pub const HYBRID_FALLBACK: &str = "hybrid-fallback";

/// Apply the three-category keyword rule to the raw evidence text.
///
/// Pure string scanning; cannot fail.
pub fn keyword_fallback(evidence: &Evidence) -> FusionResult {
    let outcome = keyword_rule(&evidence.raw_text());
    debug!(level = %outcome.level, "keyword fallback applied");

    let factors: BTreeSet<String> = [HYBRID_FALLBACK, super::FUSION_FACTOR]
        .into_iter()
        .map(String::from)
        .collect();

    FusionResult {
        recommended: outcome.level,
        confidence: FALLBACK_FUSION_CONFIDENCE,
        reasoning: format!(
            "analysis did not complete in time; keyword rule over change text selects {}",
            outcome.level
        ),
        factors,
        contributing: BTreeMap::new(),
        winning_source: AnalyzerId::RuleBased,
        scores: BTreeMap::new(),
        produced_at: SystemTime::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::BumpLevel;

    fn fallback(description: &str) -> FusionResult {
        keyword_fallback(&Evidence {
            description: description.into(),
            ..Evidence::default()
        })
    }

    #[test]
    fn three_categories() {
        assert_eq!(fallback("breaking: remove v1 endpoints").recommended, BumpLevel::Major);
        assert_eq!(fallback("add bulk import").recommended, BumpLevel::Minor);
        assert_eq!(fallback("fix typo").recommended, BumpLevel::Patch);
        assert_eq!(fallback("").recommended, BumpLevel::Patch);
    }

    #[test]
    fn shape() {
        let result = fallback("anything");
        assert!(result.factors.contains(HYBRID_FALLBACK));
        assert!(result.factors.contains("fusion"));
        assert_eq!(result.factors.len(), 2);
        assert_eq!(result.winning_source, AnalyzerId::RuleBased);
        assert!(result.contributing.is_empty());
        assert!(result.scores.is_empty());
        assert!(result.is_fallback());
    }
}
