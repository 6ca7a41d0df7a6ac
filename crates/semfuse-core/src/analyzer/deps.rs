//! Dependency analyzer: map dependency deltas onto a bump.

use tracing::debug;

use super::{AnalysisResult, Analyzer, AnalyzerId};
use crate::evidence::{AnalysisContext, DepChangeKind, Evidence};
use crate::version::BumpLevel;

/// Analyzer over the evidence's [`DependencyChanges`](crate::evidence::DependencyChanges).
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyAnalyzer;

impl Analyzer for DependencyAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Dependency
    }

    fn analyze(&self, evidence: &Evidence, _context: &AnalysisContext) -> AnalysisResult {
        let deps = &evidence.dependencies;

        let (level, confidence, factor, kind) = if deps.has_breaking_changes() {
            (BumpLevel::Major, 0.8, "dependency-breaking", Some(DepChangeKind::Removed))
        } else if deps.has_major_updates() {
            (BumpLevel::Major, 0.6, "dependency-major", Some(DepChangeKind::Major))
        } else if deps.has_minor_updates() {
            (BumpLevel::Minor, 0.5, "dependency-minor", Some(DepChangeKind::Minor))
        } else if deps.has_patch_updates() {
            (BumpLevel::Patch, 0.4, "dependency-patch", Some(DepChangeKind::Patch))
        } else {
            (BumpLevel::Patch, 0.2, "no-dependency-changes", None)
        };

        let reasoning = match kind {
            Some(kind) => {
                let names: Vec<&str> = deps
                    .changes
                    .iter()
                    .filter(|c| c.kind() == kind)
                    .map(|c| c.name.as_str())
                    .collect();
                format!(
                    "{} dependency change(s); strongest is {kind:?} ({})",
                    deps.changes.len(),
                    names.join(", ")
                )
            }
            None => "no dependency changes".to_string(),
        };

        debug!(%level, confidence, changes = deps.changes.len(), "dependency analysis complete");
        AnalysisResult::new(self.id(), level, confidence, reasoning, [factor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{DepChange, DependencyChanges};

    fn change(name: &str, from: Option<&str>, to: Option<&str>) -> DepChange {
        DepChange {
            name: name.into(),
            from: from.map(Into::into),
            to: to.map(Into::into),
        }
    }

    fn analyze(changes: Vec<DepChange>) -> AnalysisResult {
        let evidence = Evidence {
            dependencies: DependencyChanges::new(changes),
            ..Evidence::default()
        };
        DependencyAnalyzer.analyze(&evidence, &AnalysisContext::default())
    }

    #[test]
    fn removal_is_breaking() {
        let result = analyze(vec![
            change("serde", Some("1.0.1"), Some("1.0.2")),
            change("old-crate", Some("0.3.0"), None),
        ]);
        assert_eq!(result.recommended, BumpLevel::Major);
        assert!(result.factors.contains("dependency-breaking"));
        assert!(result.reasoning.contains("old-crate"));
    }

    #[test]
    fn major_update() {
        let result = analyze(vec![change("tokio", Some("0.2.0"), Some("1.0.0"))]);
        assert_eq!(result.recommended, BumpLevel::Major);
        assert!((result.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn minor_and_patch() {
        let minor = analyze(vec![change("regex", Some("1.9.0"), Some("1.10.0"))]);
        assert_eq!(minor.recommended, BumpLevel::Minor);
        let patch = analyze(vec![change("regex", Some("1.9.0"), Some("1.9.1"))]);
        assert_eq!(patch.recommended, BumpLevel::Patch);
        assert!(patch.factors.contains("dependency-patch"));
    }

    #[test]
    fn no_changes() {
        let result = analyze(Vec::new());
        assert_eq!(result.recommended, BumpLevel::Patch);
        assert!(result.factors.contains("no-dependency-changes"));
        assert!((result.confidence - 0.2).abs() < f64::EPSILON);
    }
}
