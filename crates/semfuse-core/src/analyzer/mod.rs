//! Signal analyzers.
//!
//! Each analyzer reduces one kind of evidence to a single opinion, an
//! [`AnalysisResult`]. Analyzers never call each other and never fail from
//! the caller's point of view: internal errors become a low-confidence
//! result tagged `<analyzer>-fallback` (see [`AnalysisResult::fallback`]).
//!
//! | Analyzer          | Evidence read                    |
//! |-------------------|----------------------------------|
//! | [`ai`]            | description, via an [`ai::AiTransport`] |
//! | [`rules`]         | description and commit text      |
//! | [`code`]          | changed-file contents            |
//! | [`commit`]        | commit messages                  |
//! | [`deps`]          | dependency-change summary        |

pub mod ai;
pub mod code;
pub mod commit;
pub mod deps;
pub mod keywords;
pub mod rules;

use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Confidence assigned to every fallback result.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Identity of an analyzer.
///
/// Declaration order is the fusion tie-break priority: when two analyzers
/// score exactly the same, the one declared first wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerId {
    /// Natural-language recommendation from an external reasoning service.
    Ai,
    /// Three-category keyword rule over description and commit text.
    RuleBased,
    /// Changed source-file contents.
    Code,
    /// Conventional-commit and keyword analysis of commit messages.
    Commit,
    /// Dependency-manifest deltas.
    Dependency,
}

impl AnalyzerId {
    /// All analyzers in tie-break priority order.
    pub const PRIORITY: [Self; 5] = [
        Self::Ai,
        Self::RuleBased,
        Self::Code,
        Self::Commit,
        Self::Dependency,
    ];

    /// Kebab-case name, also used as the prefix of fallback factors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::RuleBased => "rule-based",
            Self::Code => "code",
            Self::Commit => "commit",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for AnalyzerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analyzer's opinion about the required bump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Recommended bump level.
    pub recommended: BumpLevel,
    /// Self-reported reliability in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable justification.
    pub reasoning: String,
    /// Signal tags (e.g. `bug-fix`, `api-change`).
    pub factors: BTreeSet<String>,
    /// Which analyzer produced this result.
    pub source: AnalyzerId,
    /// When the result was produced.
    pub produced_at: SystemTime,
}

impl AnalysisResult {
    /// Create a result, clamping confidence into `[0, 1]`.
    pub fn new(
        source: AnalyzerId,
        recommended: BumpLevel,
        confidence: f64,
        reasoning: impl Into<String>,
        factors: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            recommended,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            factors: factors.into_iter().map(Into::into).collect(),
            source,
            produced_at: SystemTime::now(),
        }
    }

    /// The fixed low-confidence result an analyzer returns when it fails.
    pub fn fallback(source: AnalyzerId, reason: impl fmt::Display) -> Self {
        Self::new(
            source,
            BumpLevel::Patch,
            FALLBACK_CONFIDENCE,
            format!("{source} analysis unavailable: {reason}"),
            [format!("{source}-fallback")],
        )
    }

    /// Whether this is a fallback result.
    pub fn is_fallback(&self) -> bool {
        self.factors.contains(&format!("{}-fallback", self.source))
    }
}

/// Clamp a confidence into `[0, 1]`, mapping NaN to zero.
pub(crate) fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// An evidence source that produces one [`AnalysisResult`].
///
/// Implementations run on a blocking thread, so they may do file or process
/// I/O directly. They must not panic on bad input; the engine still guards
/// against panics, but a panicking analyzer loses its own fallback reasoning.
pub trait Analyzer: Send + Sync {
    /// This analyzer's identity.
    fn id(&self) -> AnalyzerId;

    /// Analyze the evidence. Always returns a result.
    fn analyze(&self, evidence: &Evidence, context: &AnalysisContext) -> AnalysisResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_matches_declaration_order() {
        let mut sorted = AnalyzerId::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, AnalyzerId::PRIORITY);
    }

    #[test]
    fn fallback_is_tagged_and_low_confidence() {
        let result = AnalysisResult::fallback(AnalyzerId::Code, "disk on fire");
        assert_eq!(result.recommended, BumpLevel::Patch);
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
        assert!(result.factors.contains("code-fallback"));
        assert!(result.is_fallback());
        assert!(result.reasoning.contains("disk on fire"));
    }

    #[test]
    fn confidence_is_clamped() {
        let high = AnalysisResult::new(AnalyzerId::Ai, BumpLevel::Major, 7.0, "", ["x"]);
        assert!((high.confidence - 1.0).abs() < f64::EPSILON);
        let nan = AnalysisResult::new(AnalyzerId::Ai, BumpLevel::Major, f64::NAN, "", ["x"]);
        assert!(nan.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn ids_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AnalyzerId::RuleBased).unwrap(),
            "\"rule-based\""
        );
    }
}
