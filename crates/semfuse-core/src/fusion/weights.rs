//! Per-analyzer fusion weights.

use serde::{Deserialize, Serialize};

use crate::analyzer::AnalyzerId;

/// Weight applied to each analyzer's score.
///
/// Weights are independent multipliers; they need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Weight of the AI-style signal.
    pub ai: f64,
    /// Weight of the rule-based keyword signal.
    pub rule_based: f64,
    /// Weight of the code-diff signal.
    pub code: f64,
    /// Weight of the commit-message signal.
    pub commit: f64,
    /// Weight of the dependency signal.
    pub dependency: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            ai: 0.3,
            rule_based: 0.2,
            code: 0.2,
            commit: 0.3,
            dependency: 0.1,
        }
    }
}

impl WeightConfig {
    /// Every analyzer at weight `w`.
    pub const fn uniform(w: f64) -> Self {
        Self {
            ai: w,
            rule_based: w,
            code: w,
            commit: w,
            dependency: w,
        }
    }

    /// The weight for one analyzer.
    pub const fn weight(&self, id: AnalyzerId) -> f64 {
        match id {
            AnalyzerId::Ai => self.ai,
            AnalyzerId::RuleBased => self.rule_based,
            AnalyzerId::Code => self.code,
            AnalyzerId::Commit => self.commit,
            AnalyzerId::Dependency => self.dependency,
        }
    }

    /// Set the weight for one analyzer.
    pub fn set(&mut self, id: AnalyzerId, w: f64) {
        match id {
            AnalyzerId::Ai => self.ai = w,
            AnalyzerId::RuleBased => self.rule_based = w,
            AnalyzerId::Code => self.code = w,
            AnalyzerId::Commit => self.commit = w,
            AnalyzerId::Dependency => self.dependency = w,
        }
    }

    /// Exact bit patterns of the weights in priority order, for cache keys.
    pub fn fingerprint(&self) -> [u64; 5] {
        AnalyzerId::PRIORITY.map(|id| self.weight(id).to_bits())
    }

    /// Copy with every negative or non-finite weight replaced by zero.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for id in self.invalid() {
            self.set(id, 0.0);
        }
        self
    }

    /// Names of analyzers whose weight is negative or not finite.
    pub fn invalid(&self) -> Vec<AnalyzerId> {
        AnalyzerId::PRIORITY
            .into_iter()
            .filter(|id| {
                let w = self.weight(*id);
                !w.is_finite() || w < 0.0
            })
            .collect()
    }
}
