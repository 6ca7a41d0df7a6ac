//! Git access for evidence gathering and tag-based version storage.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, GPG signing, hooks, and other configuration.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::version;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Separator placed after each commit body in `git log` output.
const RECORD_SEPARATOR: char = '\u{1e}';

/// Whether the `git` binary is on `PATH`.
pub fn is_available() -> bool {
    which::which("git").is_ok()
}

/// Check if `dir` is inside a git work tree.
#[instrument]
pub fn is_inside_repo(dir: &Utf8Path) -> GitResult<bool> {
    match git(dir, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Get the latest semver tag, if any.
///
/// Lists tags matching `v*`, skips those that are not valid versions, and
/// picks the highest by SemVer precedence. Git's own `version:refname` sort
/// ranks `v1.0.0-rc.1` above `v1.0.0`, so it is not used.
#[instrument]
pub fn latest_version_tag(dir: &Utf8Path) -> GitResult<Option<String>> {
    let Ok(output) = git(dir, &["tag", "--list", "v*"]) else {
        return Ok(None);
    };

    let mut tags = Vec::new();
    let mut versions = Vec::new();
    for tag in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match version::parse_version(tag) {
            Ok(parsed) => {
                tags.push(tag);
                versions.push(parsed);
            }
            Err(e) => debug!(%tag, %e, "ignoring non-semver tag"),
        }
    }

    let tag = version::latest(&versions)
        .and_then(|best| versions.iter().position(|v| v == best))
        .map(|i| tags[i].to_owned());
    debug!(?tag, "latest version tag");
    Ok(tag)
}

/// Full commit messages (subject and body) since a ref, newest first.
///
/// With `since = None`, every commit reachable from HEAD is returned.
#[instrument]
pub fn commit_messages(dir: &Utf8Path, since: Option<&str>) -> GitResult<Vec<String>> {
    let range = since.map_or_else(|| "HEAD".to_string(), |tag| format!("{tag}..HEAD"));
    let format = format!("--format=%B{RECORD_SEPARATOR}");

    let output = git(dir, &["log", &range, &format])?;
    let messages: Vec<String> = output
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    debug!(count = messages.len(), "commit messages");
    Ok(messages)
}

/// Files changed between a ref and HEAD.
///
/// With `since = None` (first release), every tracked file counts as changed.
#[instrument]
pub fn changed_files(dir: &Utf8Path, since: Option<&str>) -> GitResult<Vec<Utf8PathBuf>> {
    let output = match since {
        Some(reference) => git(dir, &["diff", "--name-only", reference, "HEAD"])?,
        None => git(dir, &["ls-files"])?,
    };

    let files: Vec<Utf8PathBuf> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Utf8PathBuf::from)
        .collect();

    debug!(count = files.len(), "changed files");
    Ok(files)
}

/// Unified diff of a single file between a ref and HEAD.
#[instrument]
pub fn diff_file(dir: &Utf8Path, since: &str, path: &str) -> GitResult<String> {
    git(dir, &["diff", since, "HEAD", "--", path])
}

/// Create an annotated tag at HEAD.
#[instrument]
pub fn create_tag(dir: &Utf8Path, tag: &str, message: &str) -> GitResult<()> {
    git(dir, &["tag", "--annotate", tag, "--message", message])?;
    debug!(%tag, "created tag");
    Ok(())
}

/// Run a git command in `dir` and return its stdout.
fn git(dir: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
