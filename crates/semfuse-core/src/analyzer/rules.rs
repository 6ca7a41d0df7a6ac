//! Rule-based analyzer: the three-category keyword rule.
//!
//! breaking keyword → major, feature keyword → minor, anything else → patch.
//! The same rule, via [`keyword_rule`], is the fusion engine's last-resort
//! fallback when the deadline elapses, so it must never fail.

use tracing::debug;

use super::keywords::{KeywordClass, KeywordHits};
use super::{AnalysisResult, Analyzer, AnalyzerId};
use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Outcome of applying the keyword rule to a block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOutcome {
    /// The bump the rule selects.
    pub level: BumpLevel,
    /// The category that fired, if any.
    pub class: Option<KeywordClass>,
}

/// Apply the three-category keyword rule to `text`.
///
/// Fix keywords are deliberately not a separate tier: anything that is not
/// breaking or a feature is a patch.
pub fn keyword_rule(text: &str) -> RuleOutcome {
    let hits = KeywordHits::scan(text);
    let (level, class) = if hits.breaking {
        (BumpLevel::Major, Some(KeywordClass::Breaking))
    } else if hits.feature {
        (BumpLevel::Minor, Some(KeywordClass::Feature))
    } else {
        (BumpLevel::Patch, hits.fix.then_some(KeywordClass::Fix))
    };
    RuleOutcome { level, class }
}

/// Keyword-rule analyzer over the description and commit messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAnalyzer;

impl Analyzer for RuleBasedAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::RuleBased
    }

    fn analyze(&self, evidence: &Evidence, _context: &AnalysisContext) -> AnalysisResult {
        let text = evidence.raw_text();
        if text.trim().is_empty() {
            return AnalysisResult::fallback(self.id(), "no description or commit text");
        }

        let outcome = keyword_rule(&text);
        debug!(level = %outcome.level, class = ?outcome.class, "keyword rule applied");

        let (confidence, factor, reasoning) = match outcome.class {
            Some(KeywordClass::Breaking) => (
                0.6,
                "rule-breaking",
                "breaking-change keywords found in change text",
            ),
            Some(KeywordClass::Feature) => {
                (0.5, "rule-feature", "feature keywords found in change text")
            }
            Some(KeywordClass::Fix) => (0.4, "rule-default", "only fix keywords found"),
            None => (0.3, "rule-default", "no release keywords found; defaulting to patch"),
        };

        AnalysisResult::new(self.id(), outcome.level, confidence, reasoning, [factor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(description: &str, commits: &[&str]) -> Evidence {
        Evidence {
            description: description.into(),
            commits: commits.iter().map(|c| (*c).to_string()).collect(),
            ..Evidence::default()
        }
    }

    #[test]
    fn rule_tiers() {
        assert_eq!(keyword_rule("breaking: drop v1 API").level, BumpLevel::Major);
        assert_eq!(keyword_rule("add export button").level, BumpLevel::Minor);
        assert_eq!(keyword_rule("fix typo").level, BumpLevel::Patch);
        assert_eq!(keyword_rule("misc").class, None);
    }

    #[test]
    fn analyzer_uses_commits_and_description() {
        let result = RuleBasedAnalyzer.analyze(
            &evidence("", &["feat: add login"]),
            &AnalysisContext::default(),
        );
        assert_eq!(result.recommended, BumpLevel::Minor);
        assert!(result.factors.contains("rule-feature"));
        assert_eq!(result.source, AnalyzerId::RuleBased);
    }

    #[test]
    fn empty_text_falls_back() {
        let result = RuleBasedAnalyzer.analyze(&Evidence::default(), &AnalysisContext::default());
        assert!(result.factors.contains("rule-based-fallback"));
    }
}
