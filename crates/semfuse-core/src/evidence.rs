//! Evidence model: the raw inputs every analyzer reads.
//!
//! An [`Evidence`] bundle holds commit messages, changed-file paths, a
//! dependency-change summary, and a free-text change description. Any part
//! may be empty; analyzers degrade confidence instead of failing.
//!
//! [`gather_evidence`] fills a bundle from git history since the latest
//! version tag.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::deps;
use crate::git;
use crate::version::parse_version;

/// Raw project evidence for one fusion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Commit messages, oldest or newest first (order is not significant).
    pub commits: Vec<String>,
    /// Changed file paths, relative to the project root.
    pub changed_files: Vec<Utf8PathBuf>,
    /// Dependency changes since the previous release.
    pub dependencies: DependencyChanges,
    /// Free-text description of the change, for the AI-style signal.
    pub description: String,
}

impl Evidence {
    /// Commit messages and description joined into one block of text.
    pub fn raw_text(&self) -> String {
        let mut text = self.description.clone();
        for commit in &self.commits {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(commit);
        }
        text
    }

    /// Whether every evidence source is empty.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
            && self.changed_files.is_empty()
            && self.dependencies.changes.is_empty()
            && self.description.trim().is_empty()
    }
}

/// A dependency change between two versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepChange {
    /// Dependency name.
    pub name: String,
    /// Previous version (None if newly added).
    pub from: Option<String>,
    /// New version (None if removed).
    pub to: Option<String>,
}

/// The magnitude of a single dependency change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepChangeKind {
    /// Version delta in the patch position, or versions that don't parse.
    Patch,
    /// Version delta in the minor position, or a newly added dependency.
    Minor,
    /// Version delta in the major position (or minor position below 1.0.0).
    Major,
    /// The dependency was removed.
    Removed,
}

impl DepChange {
    /// Classify this change by the semver delta between `from` and `to`.
    pub fn kind(&self) -> DepChangeKind {
        match (self.from.as_deref(), self.to.as_deref()) {
            (Some(_), None) => DepChangeKind::Removed,
            (None, _) => DepChangeKind::Minor,
            (Some(from), Some(to)) => match (parse_version(from), parse_version(to)) {
                (Ok(from), Ok(to)) => delta_kind(&from, &to),
                _ => DepChangeKind::Patch,
            },
        }
    }
}

fn delta_kind(from: &Version, to: &Version) -> DepChangeKind {
    if from.major != to.major {
        DepChangeKind::Major
    } else if from.minor != to.minor {
        // 0.x minor bumps are breaking by cargo's compatibility rules
        if from.major == 0 {
            DepChangeKind::Major
        } else {
            DepChangeKind::Minor
        }
    } else {
        DepChangeKind::Patch
    }
}

/// Dependency-change summary consumed by the dependency analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChanges {
    /// Individual changes, sorted by name.
    pub changes: Vec<DepChange>,
}

impl DependencyChanges {
    /// Wrap a list of changes, sorting them by name.
    pub fn new(mut changes: Vec<DepChange>) -> Self {
        changes.sort();
        Self { changes }
    }

    /// A dependency was removed.
    pub fn has_breaking_changes(&self) -> bool {
        self.has_kind(DepChangeKind::Removed)
    }

    /// A dependency moved across a major (or 0.x minor) boundary.
    pub fn has_major_updates(&self) -> bool {
        self.has_kind(DepChangeKind::Major)
    }

    /// A dependency was added or moved across a minor boundary.
    pub fn has_minor_updates(&self) -> bool {
        self.has_kind(DepChangeKind::Minor)
    }

    /// A dependency moved within a patch range.
    pub fn has_patch_updates(&self) -> bool {
        self.has_kind(DepChangeKind::Patch)
    }

    fn has_kind(&self, kind: DepChangeKind) -> bool {
        self.changes.iter().any(|c| c.kind() == kind)
    }
}

/// Project context passed alongside the evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Human-readable project name.
    pub project_name: String,
    /// Root that changed-file paths are resolved against.
    pub project_root: Utf8PathBuf,
    /// The version being bumped from, if known.
    pub current_version: Option<Version>,
}

impl AnalysisContext {
    /// Build a context for a project rooted at `root`, named after the directory.
    pub fn for_root(root: &Utf8Path) -> Self {
        Self {
            project_name: root.file_name().unwrap_or("project").to_string(),
            project_root: root.to_path_buf(),
            current_version: None,
        }
    }

    /// Attach the current version.
    #[must_use]
    pub fn with_current_version(mut self, version: Option<Version>) -> Self {
        self.current_version = version;
        self
    }
}

/// Gather evidence from git history.
///
/// Uses `since` as the lower bound, or the latest `v*` tag when `None`.
/// Every git failure is logged and leaves the corresponding field empty.
#[instrument(fields(%project_root))]
pub fn gather_evidence(
    project_root: &Utf8Path,
    since: Option<&str>,
    lockfile: &str,
    description: &str,
) -> Evidence {
    let since = since.map(ToOwned::to_owned).or_else(|| {
        git::latest_version_tag(project_root).unwrap_or_else(|e| {
            warn!(%e, "could not read version tags");
            None
        })
    });
    debug!(?since, "gathering evidence");

    let commits = git::commit_messages(project_root, since.as_deref()).unwrap_or_else(|e| {
        warn!(%e, "could not read commit messages");
        Vec::new()
    });

    let changed_files = git::changed_files(project_root, since.as_deref()).unwrap_or_else(|e| {
        warn!(%e, "could not list changed files");
        Vec::new()
    });

    let dependencies = since.as_deref().map_or_else(DependencyChanges::default, |reference| {
        deps::dependency_changes(project_root, reference, lockfile)
    });

    Evidence {
        commits,
        changed_files,
        dependencies,
        description: description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str, from: Option<&str>, to: Option<&str>) -> DepChange {
        DepChange {
            name: name.into(),
            from: from.map(Into::into),
            to: to.map(Into::into),
        }
    }

    #[test]
    fn dep_change_kinds() {
        assert_eq!(change("a", Some("1.0.0"), None).kind(), DepChangeKind::Removed);
        assert_eq!(change("a", None, Some("1.0.0")).kind(), DepChangeKind::Minor);
        assert_eq!(change("a", Some("1.0.0"), Some("2.0.0")).kind(), DepChangeKind::Major);
        assert_eq!(change("a", Some("1.0.0"), Some("1.1.0")).kind(), DepChangeKind::Minor);
        assert_eq!(change("a", Some("0.1.0"), Some("0.2.0")).kind(), DepChangeKind::Major);
        assert_eq!(change("a", Some("1.0.0"), Some("1.0.1")).kind(), DepChangeKind::Patch);
        assert_eq!(change("a", Some("git"), Some("main")).kind(), DepChangeKind::Patch);
    }

    #[test]
    fn dependency_flags() {
        let deps = DependencyChanges::new(vec![
            change("serde", Some("1.0.0"), Some("1.0.1")),
            change("old", Some("2.0.0"), None),
        ]);
        assert!(deps.has_breaking_changes());
        assert!(deps.has_patch_updates());
        assert!(!deps.has_major_updates());
        assert!(!deps.has_minor_updates());
        assert_eq!(deps.changes[0].name, "old");
    }

    #[test]
    fn raw_text_joins_description_and_commits() {
        let evidence = Evidence {
            commits: vec!["fix: a".into(), "feat: b".into()],
            description: "summary".into(),
            ..Evidence::default()
        };
        assert_eq!(evidence.raw_text(), "summary\nfix: a\nfeat: b");
        assert!(!evidence.is_empty());
        assert!(Evidence::default().is_empty());
    }

    #[test]
    fn context_for_root_uses_directory_name() {
        let ctx = AnalysisContext::for_root(Utf8Path::new("/work/widget"));
        assert_eq!(ctx.project_name, "widget");
        assert!(ctx.current_version.is_none());
    }
}
