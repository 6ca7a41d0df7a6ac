//! Code-diff analyzer: inspect changed source files.
//!
//! For each changed file with a source extension, the file content is
//! scanned for public/exported declarations, breaking or deprecation
//! markers, and feature or fix phrasing. Findings are unioned across files:
//! breaking or deprecation → major, API change or feature → minor, fix →
//! patch, and patch when nothing was found.

use std::collections::BTreeSet;

use camino::Utf8Path;
use tracing::{debug, instrument};

use super::keywords::KeywordHits;
use super::{AnalysisResult, Analyzer, AnalyzerId, FALLBACK_CONFIDENCE};
use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Extensions treated as source code when no override is configured.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "py", "go", "java", "kt", "swift", "c", "h", "cc",
    "cpp", "hpp", "cs", "rb", "php", "scala",
];

/// Line prefixes that declare public API.
const API_PREFIXES: &[&str] = &[
    "pub fn ",
    "pub async fn ",
    "pub struct ",
    "pub enum ",
    "pub trait ",
    "pub type ",
    "pub const ",
    "pub mod ",
    "export ",
    "module.exports",
    "public ",
    "func (",
];

/// Markers of deprecation, kept separate from general breaking phrasing.
const DEPRECATION_MARKERS: &[&str] = &["#[deprecated", "@deprecated", "deprecated"];

/// Findings for one file or for the whole change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeFindings {
    /// Touches a public/exported declaration.
    pub has_api_changes: bool,
    /// Contains breaking-change text.
    pub has_breaking_changes: bool,
    /// Contains deprecation markers.
    pub has_deprecations: bool,
    /// Contains new-feature phrasing.
    pub has_new_features: bool,
    /// Contains bug-fix phrasing.
    pub has_bug_fixes: bool,
}

impl CodeFindings {
    /// Scan the content of a single source file.
    pub fn scan(content: &str) -> Self {
        let mut findings = Self::default();
        let lowered = content.to_lowercase();

        findings.has_api_changes = content.lines().any(|line| {
            let line = line.trim_start();
            API_PREFIXES.iter().any(|p| line.starts_with(p))
        });
        findings.has_deprecations = DEPRECATION_MARKERS.iter().any(|m| lowered.contains(m));

        // Only comments and string literals carry phrasing; scanning identifiers
        // would flag every `fn fix_x()` as a bug fix.
        let prose = comment_text(content).join("\n");
        let hits = KeywordHits::scan(&prose);
        findings.has_breaking_changes = hits.breaking;
        findings.has_new_features = hits.feature;
        findings.has_bug_fixes = hits.fix;

        findings
    }

    /// Union of two sets of findings.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            has_api_changes: self.has_api_changes || other.has_api_changes,
            has_breaking_changes: self.has_breaking_changes || other.has_breaking_changes,
            has_deprecations: self.has_deprecations || other.has_deprecations,
            has_new_features: self.has_new_features || other.has_new_features,
            has_bug_fixes: self.has_bug_fixes || other.has_bug_fixes,
        }
    }

    /// Number of distinct signal categories present.
    pub fn categories(self) -> usize {
        [
            self.has_api_changes,
            self.has_breaking_changes,
            self.has_deprecations,
            self.has_new_features,
            self.has_bug_fixes,
        ]
        .into_iter()
        .filter(|f| *f)
        .count()
    }

    /// The bump these findings call for.
    pub const fn level(self) -> BumpLevel {
        if self.has_breaking_changes || self.has_deprecations {
            BumpLevel::Major
        } else if self.has_api_changes || self.has_new_features {
            BumpLevel::Minor
        } else {
            BumpLevel::Patch
        }
    }
}

/// Comment text of every line, tracking `/* ... */` blocks across lines.
fn comment_text(content: &str) -> Vec<&str> {
    let mut prose = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if in_block {
            match trimmed.find("*/") {
                Some(end) => {
                    in_block = false;
                    prose.push(&trimmed[..end]);
                }
                None => prose.push(trimmed.strip_prefix('*').unwrap_or(trimmed)),
            }
            continue;
        }

        if let Some(rest) = line_comment(trimmed) {
            prose.push(rest);
            continue;
        }

        match trailing_comment(line) {
            Some(Comment::Line(rest)) => prose.push(rest),
            Some(Comment::Block(rest)) => match rest.find("*/") {
                Some(end) => prose.push(&rest[..end]),
                None => {
                    in_block = true;
                    prose.push(rest);
                }
            },
            None => {}
        }
    }
    prose
}

/// Text after a whole-line comment marker other than `/*`.
fn line_comment(trimmed: &str) -> Option<&str> {
    for marker in ["///", "//!", "//", "#", "--"] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            // `#[attr]` and `#include` are code, not comments
            if marker == "#" && (rest.starts_with('[') || rest.starts_with("include")) {
                return None;
            }
            return Some(rest);
        }
    }
    None
}

enum Comment<'a> {
    Line(&'a str),
    Block(&'a str),
}

/// First `//` or `/*` on the line that is not inside a double-quoted string.
fn trailing_comment(line: &str) -> Option<Comment<'_>> {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string => match bytes.get(i + 1) {
                Some(b'/') => return Some(Comment::Line(&line[i + 2..])),
                Some(b'*') => return Some(Comment::Block(&line[i + 2..])),
                _ => {}
            },
            _ => {}
        }
        i += 1;
    }
    None
}

/// Analyzer over changed source files.
#[derive(Debug, Clone)]
pub struct CodeAnalyzer {
    extensions: BTreeSet<String>,
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_SOURCE_EXTENSIONS.iter().copied())
    }
}

impl CodeAnalyzer {
    /// Analyzer that treats files with the given extensions as source.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn is_source(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }
}

impl Analyzer for CodeAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Code
    }

    #[instrument(name = "code_analyzer", skip_all, fields(files = evidence.changed_files.len()))]
    fn analyze(&self, evidence: &Evidence, context: &AnalysisContext) -> AnalysisResult {
        if evidence.changed_files.is_empty() {
            return AnalysisResult::new(
                self.id(),
                BumpLevel::Patch,
                FALLBACK_CONFIDENCE,
                "no changed files to inspect",
                ["no-changed-files"],
            );
        }

        let mut findings = CodeFindings::default();
        let mut inspected = 0usize;

        for path in evidence.changed_files.iter().filter(|p| self.is_source(p)) {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                context.project_root.join(path)
            };
            match std::fs::read_to_string(&full) {
                Ok(content) => {
                    findings = findings.union(CodeFindings::scan(&content));
                    inspected += 1;
                }
                // Deleted or binary files are expected in a diff
                Err(e) => debug!(%full, %e, "skipping unreadable file"),
            }
        }

        if inspected == 0 {
            return AnalysisResult::new(
                self.id(),
                BumpLevel::Patch,
                0.2,
                format!(
                    "{} changed file(s), none readable source",
                    evidence.changed_files.len()
                ),
                ["no-source-changes"],
            );
        }

        let level = findings.level();
        let confidence =
            (0.3 + 0.15 * findings.categories() as f64 + (0.05 * inspected as f64).min(0.2)).min(1.0);

        let mut factors = Vec::new();
        let mut reasons = Vec::new();
        if findings.has_breaking_changes {
            factors.push("breaking-change");
            reasons.push("breaking-change markers");
        }
        if findings.has_deprecations {
            factors.push("deprecation");
            reasons.push("deprecations");
        }
        if findings.has_api_changes {
            factors.push("api-change");
            reasons.push("public API declarations");
        }
        if findings.has_new_features {
            factors.push("new-feature");
            reasons.push("feature phrasing");
        }
        if findings.has_bug_fixes {
            factors.push("bug-fix");
            reasons.push("bug-fix phrasing");
        }
        let found = if reasons.is_empty() {
            "no release signals".to_string()
        } else {
            reasons.join(", ")
        };

        debug!(%level, confidence, inspected, "code analysis complete");
        AnalysisResult::new(
            self.id(),
            level,
            confidence,
            format!("{inspected} source file(s) inspected: {found}"),
            factors,
        )
    }
}
