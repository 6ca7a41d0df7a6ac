//! Lockfile diffs: extract dependency changes from `git diff` output.
//!
//! Feeds the dependency analyzer. Only `Cargo.lock`-style TOML lockfiles are
//! understood; any other lockfile yields no changes.

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::evidence::{DepChange, DependencyChanges};
use crate::git;

/// Compute dependency changes to `lockfile` between `reference` and HEAD.
///
/// A failing diff is non-fatal: it is logged and treated as "no changes".
pub fn dependency_changes(
    project_root: &Utf8Path,
    reference: &str,
    lockfile: &str,
) -> DependencyChanges {
    let diff = match git::diff_file(project_root, reference, lockfile) {
        Ok(d) => d,
        Err(e) => {
            warn!(%e, lockfile, "failed to diff lockfile, skipping dependencies");
            return DependencyChanges::default();
        }
    };

    if diff.trim().is_empty() {
        debug!(lockfile, "no lockfile changes");
        return DependencyChanges::default();
    }

    let changes = if lockfile.ends_with(".lock") {
        parse_lock_diff(&diff)
    } else {
        debug!(lockfile, "unsupported lockfile format");
        Vec::new()
    };

    debug!(lockfile, count = changes.len(), "parsed dependency changes");
    DependencyChanges::new(changes)
}

/// Accumulator for one `[[package]]` block of the diff.
#[derive(Default)]
struct PackageBlock {
    name: Option<String>,
    removed_version: Option<String>,
    added_version: Option<String>,
}

impl PackageBlock {
    /// Turn the block into a change, if a version actually moved.
    fn finish(self) -> Option<DepChange> {
        let name = self.name?;
        if self.removed_version.is_none() && self.added_version.is_none() {
            return None;
        }
        if self.removed_version == self.added_version {
            return None;
        }
        Some(DepChange {
            name,
            from: self.removed_version,
            to: self.added_version,
        })
    }
}

/// Parse a unified diff of a TOML lockfile into dependency changes.
///
/// Within each `[[package]]` block, `name` comes from any line (context,
/// removed, or added), the old version from `-version = "..."` and the new
/// version from `+version = "..."`. Output is sorted by name.
pub fn parse_lock_diff(diff: &str) -> Vec<DepChange> {
    let mut changes = Vec::new();
    let mut block = PackageBlock::default();

    for line in diff.lines() {
        let (marker, body) = split_marker(line);

        if body.trim_start().starts_with("[[package]]") {
            changes.extend(std::mem::take(&mut block).finish());
            continue;
        }

        if let Some(name) = toml_string_value(body, "name") {
            block.name = Some(name);
            continue;
        }

        if let Some(version) = toml_string_value(body, "version") {
            match marker {
                Some('-') => block.removed_version = Some(version),
                Some('+') => block.added_version = Some(version),
                _ => {}
            }
        }
    }
    changes.extend(block.finish());

    changes.sort();
    changes
}

/// Split a diff line into its `+`/`-`/` ` marker and the remaining text.
///
/// File headers (`+++`, `---`) and hunk headers have no meaningful body.
fn split_marker(line: &str) -> (Option<char>, &str) {
    if line.starts_with("+++") || line.starts_with("---") || line.starts_with("@@") {
        return (None, "");
    }
    let mut chars = line.chars();
    match chars.next() {
        Some(c @ ('+' | '-' | ' ')) => (Some(c), chars.as_str()),
        _ => (None, line),
    }
}

/// Extract a TOML string value for `key` from a line like `key = "value"`.
fn toml_string_value(line: &str, key: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(key)?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let value = rest.strip_prefix('"')?.strip_suffix('"')?;
    Some(value.to_string())
}
