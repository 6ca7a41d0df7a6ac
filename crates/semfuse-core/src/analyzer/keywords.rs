//! Keyword tables shared by the text-scanning analyzers.
//!
//! Matching is case-insensitive. Single words match whole words only (so
//! `fix` matches "Fix:" and "fix" but not "prefix"); multi-word phrases match
//! as substrings of the lowercased text.

/// Phrases that indicate an incompatible change.
pub const BREAKING: &[&str] = &[
    "breaking change",
    "breaking-change",
    "breaking",
    "incompatible",
    "backwards incompatible",
    "removed api",
    "drop support",
    "no longer supported",
];

/// Phrases that indicate new functionality.
pub const FEATURE: &[&str] = &[
    "feat",
    "feature",
    "new feature",
    "add",
    "adds",
    "added",
    "implement",
    "implements",
    "implemented",
    "introduce",
    "introduces",
    "support for",
    "enhancement",
];

/// Phrases that indicate a bug fix.
pub const FIX: &[&str] = &[
    "fix",
    "fixes",
    "fixed",
    "bug",
    "bugfix",
    "hotfix",
    "patch",
    "resolve",
    "resolves",
    "resolved",
    "correct",
    "repair",
    "crash",
    "regression",
];

/// Category of a keyword hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordClass {
    /// Matched [`BREAKING`].
    Breaking,
    /// Matched [`FEATURE`].
    Feature,
    /// Matched [`FIX`].
    Fix,
}

/// Which keyword categories appear in a block of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordHits {
    /// Any breaking-change phrase.
    pub breaking: bool,
    /// Any new-feature phrase.
    pub feature: bool,
    /// Any bug-fix phrase.
    pub fix: bool,
}

impl KeywordHits {
    /// Scan `text` for all three categories.
    pub fn scan(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .collect();

        Self {
            breaking: matches_any(&lowered, &words, BREAKING),
            feature: matches_any(&lowered, &words, FEATURE),
            fix: matches_any(&lowered, &words, FIX),
        }
    }

    /// The strongest category present, if any.
    pub const fn strongest(self) -> Option<KeywordClass> {
        if self.breaking {
            Some(KeywordClass::Breaking)
        } else if self.feature {
            Some(KeywordClass::Feature)
        } else if self.fix {
            Some(KeywordClass::Fix)
        } else {
            None
        }
    }

    /// Number of categories present.
    pub fn count(self) -> usize {
        [self.breaking, self.feature, self.fix]
            .into_iter()
            .filter(|hit| *hit)
            .count()
    }
}

fn matches_any(lowered: &str, words: &[&str], table: &[&str]) -> bool {
    table.iter().any(|phrase| {
        if phrase.contains(' ') {
            lowered.contains(phrase)
        } else {
            words.iter().any(|w| w == phrase)
        }
    })
}
