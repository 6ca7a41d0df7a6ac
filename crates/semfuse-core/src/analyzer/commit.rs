//! Commit-message analyzer.
//!
//! Each message is checked two ways:
//!
//! 1. **Conventional-commit header** (`type(scope)!: description`). Known
//!    types map to a bump category with a fixed weight; `!` marks a
//!    breaking change.
//! 2. **Keyword scan** of the whole message (subject, body, and footers),
//!    independent of the header, so `BREAKING CHANGE:` footers, free-form
//!    messages and phrasing inside a typed description all count.
//!
//! Aggregation: any breaking signal → major, else any feature → minor,
//! else any fix → patch, else a weighted majority vote over the categories
//! of the conventional headers that were parsed.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::keywords::KeywordHits;
use super::{AnalysisResult, Analyzer, AnalyzerId};
use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Confidence for a header carrying the `!` breaking marker.
const BREAKING_WEIGHT: f64 = 0.95;

/// Map a conventional-commit type to its bump category and weight.
///
/// Unknown types return `None`: the header still counts as conventional
/// syntax but does not vote.
pub fn type_category(kind: &str) -> Option<(BumpLevel, f64)> {
    let category = match kind {
        "feat" | "feature" => (BumpLevel::Minor, 0.8),
        "fix" | "bugfix" => (BumpLevel::Patch, 0.8),
        "perf" => (BumpLevel::Patch, 0.7),
        "revert" => (BumpLevel::Patch, 0.6),
        "refactor" => (BumpLevel::Patch, 0.5),
        "docs" | "style" | "test" | "tests" | "chore" | "build" | "ci" => (BumpLevel::Patch, 0.3),
        _ => return None,
    };
    Some(category)
}

/// A parsed conventional-commit header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalHeader<'a> {
    /// Lowercased commit type (`feat`, `fix`, ...).
    pub kind: String,
    /// Optional scope between parentheses.
    pub scope: Option<&'a str>,
    /// Whether the `!` breaking marker was present.
    pub breaking: bool,
    /// Text after the colon.
    pub description: &'a str,
}

/// Parse the first line of a commit message as a conventional-commit header.
pub fn parse_header(message: &str) -> Option<ConventionalHeader<'_>> {
    let first_line = message.lines().next()?.trim();
    let (prefix, description) = first_line.split_once(':')?;
    let description = description.trim();
    if description.is_empty() {
        return None;
    }

    let (prefix, breaking) = prefix
        .strip_suffix('!')
        .map_or((prefix, false), |p| (p, true));

    let (kind, scope) = match prefix.split_once('(') {
        Some((kind, rest)) => {
            let scope = rest.strip_suffix(')')?;
            if scope.is_empty() || scope.contains(['(', ')']) {
                return None;
            }
            (kind, Some(scope))
        }
        None => (prefix, None),
    };

    let valid_kind = !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_kind {
        return None;
    }

    Some(ConventionalHeader {
        kind: kind.to_ascii_lowercase(),
        scope,
        breaking,
        description,
    })
}

/// Signals extracted from one commit message.
#[derive(Debug, Default)]
struct CommitSignal {
    conventional: bool,
    category: Option<(BumpLevel, f64)>,
    breaking: bool,
    feature: bool,
    fix: bool,
}

impl CommitSignal {
    fn from_message(message: &str) -> Self {
        let header = parse_header(message);
        let keywords = KeywordHits::scan(message);
        let footer_breaking = message.contains("BREAKING CHANGE") || message.contains("BREAKING-CHANGE");

        let mut signal = Self {
            conventional: header.is_some(),
            breaking: footer_breaking || keywords.breaking,
            feature: keywords.feature,
            fix: keywords.fix,
            ..Self::default()
        };

        if let Some(header) = header {
            signal.category = type_category(&header.kind);
            if header.breaking {
                signal.breaking = true;
                signal.category = Some((BumpLevel::Major, BREAKING_WEIGHT));
            }
            match signal.category {
                Some((BumpLevel::Minor, _)) => signal.feature = true,
                Some((BumpLevel::Patch, _)) if header.kind.contains("fix") => signal.fix = true,
                _ => {}
            }
        }

        signal
    }
}

/// Analyzer over the evidence's commit messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitAnalyzer;

impl Analyzer for CommitAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Commit
    }

    #[instrument(name = "commit_analyzer", skip_all, fields(commits = evidence.commits.len()))]
    fn analyze(&self, evidence: &Evidence, _context: &AnalysisContext) -> AnalysisResult {
        let messages: Vec<&str> = evidence
            .commits
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();

        if messages.is_empty() {
            return AnalysisResult::new(
                self.id(),
                BumpLevel::Patch,
                super::FALLBACK_CONFIDENCE,
                "no commit messages to analyze",
                ["no-commits"],
            );
        }

        let signals: Vec<CommitSignal> = messages
            .iter()
            .map(|m| CommitSignal::from_message(m))
            .collect();
        aggregate(self.id(), &messages, &signals)
    }
}

fn aggregate(id: AnalyzerId, messages: &[&str], signals: &[CommitSignal]) -> AnalysisResult {
    let total = signals.len();
    let conventional = signals.iter().filter(|s| s.conventional).count();
    let conventional_fraction = conventional as f64 / total as f64;

    let first_with = |pred: fn(&CommitSignal) -> bool| {
        signals
            .iter()
            .position(pred)
            .map(|i| messages[i].lines().next().unwrap_or_default())
    };

    let mut factors = Vec::new();
    if conventional > 0 {
        factors.push("conventional-commits");
    }

    let (level, signal_term, why) = if let Some(subject) = first_with(|s| s.breaking) {
        factors.push("breaking-change");
        (BumpLevel::Major, 0.3, format!("breaking change in {subject:?}"))
    } else if let Some(subject) = first_with(|s| s.feature) {
        factors.push("new-feature");
        (BumpLevel::Minor, 0.2, format!("new feature in {subject:?}"))
    } else if let Some(subject) = first_with(|s| s.fix) {
        factors.push("bug-fix");
        (BumpLevel::Patch, 0.2, format!("bug fix in {subject:?}"))
    } else if let Some(level) = majority_vote(signals) {
        factors.push("majority-vote");
        (level, 0.0, format!("majority of conventional commits are {level}"))
    } else {
        (BumpLevel::Patch, 0.0, "no release signals; defaulting to patch".to_string())
    };

    let count_term = (0.05 * total as f64).min(0.2);
    let confidence = (0.3 + signal_term + count_term + 0.2 * conventional_fraction).min(1.0);

    debug!(%level, confidence, conventional, total, "commit analysis complete");

    AnalysisResult::new(
        id,
        level,
        confidence,
        format!("{total} commit(s) analyzed, {conventional} conventional: {why}"),
        factors,
    )
}

/// Weighted vote over parsed conventional categories; ties go to the larger bump.
fn majority_vote(signals: &[CommitSignal]) -> Option<BumpLevel> {
    let mut votes: BTreeMap<BumpLevel, f64> = BTreeMap::new();
    for (level, weight) in signals.iter().filter_map(|s| s.category) {
        *votes.entry(level).or_default() += weight;
    }
    // BTreeMap iterates Patch..Major; `max_by` keeps the last of equal maxima
    votes
        .into_iter()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(level, _)| level)
}
