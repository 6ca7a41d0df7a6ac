//! Version persistence.
//!
//! [`VersionStore`] is the boundary between the orchestrator and whatever
//! records releases. [`GitTagStore`] is the stock implementation: the
//! current version is the latest `v*` tag, writing a version creates an
//! annotated tag at HEAD, and history records are appended as JSON lines.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analyzer::AnalyzerId;
use crate::git::{self, GitError};
use crate::version::{BumpLevel, VersionError, parse_version};

/// Errors from version persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A stored version did not parse.
    #[error("stored version is invalid: {0}")]
    Version(#[from] VersionError),

    /// Reading or writing the history file failed.
    #[error("history file {path}: {source}")]
    History {
        /// The history file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A history record could not be encoded or decoded.
    #[error("malformed history record: {0}")]
    Record(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One applied release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Project identifier.
    pub project: String,
    /// Version before the bump, if there was one.
    pub previous: Option<Version>,
    /// Version written.
    pub version: Version,
    /// Bump applied.
    pub bump: BumpLevel,
    /// Fused confidence behind the decision.
    pub confidence: f64,
    /// Analyzer whose opinion won.
    pub winning_source: AnalyzerId,
    /// Fused reasoning.
    pub reasoning: String,
    /// When the record was written.
    pub recorded_at: SystemTime,
}

/// Where versions are read from and written to.
pub trait VersionStore: Send + Sync {
    /// The project's current version, or `None` if it has never been released.
    fn read_current_version(&self, project: &str) -> StoreResult<Option<Version>>;

    /// Persist a new version.
    fn write_version(&self, project: &str, version: &Version) -> StoreResult<()>;

    /// Append a history record.
    fn record_history(&self, record: &VersionRecord) -> StoreResult<()>;
}

/// Git-tag backed store with a JSONL history file.
#[derive(Debug, Clone)]
pub struct GitTagStore {
    root: Utf8PathBuf,
    history_path: Option<Utf8PathBuf>,
}

impl GitTagStore {
    /// Store for the repository at `root`, without history.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            history_path: None,
        }
    }

    /// Append history records to `path`.
    #[must_use]
    pub fn with_history(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// Default history location: `history.jsonl` under the user data dir.
    pub fn default_history_path() -> Option<Utf8PathBuf> {
        crate::config::user_data_dir().map(|dir| dir.join("history.jsonl"))
    }

    /// The configured history file, if any.
    pub fn history_path(&self) -> Option<&Utf8Path> {
        self.history_path.as_deref()
    }

    /// Read every history record; a missing file is an empty history.
    pub fn history(&self) -> StoreResult<Vec<VersionRecord>> {
        let Some(path) = &self.history_path else {
            return Ok(Vec::new());
        };
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::History {
                    path: path.clone(),
                    source,
                });
            }
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

impl VersionStore for GitTagStore {
    #[instrument(skip(self), fields(root = %self.root))]
    fn read_current_version(&self, _project: &str) -> StoreResult<Option<Version>> {
        match git::latest_version_tag(&self.root)? {
            Some(tag) => Ok(Some(parse_version(&tag)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(root = %self.root, %version))]
    fn write_version(&self, project: &str, version: &Version) -> StoreResult<()> {
        let tag = format!("v{version}");
        git::create_tag(&self.root, &tag, &format!("{project} {version}"))?;
        Ok(())
    }

    fn record_history(&self, record: &VersionRecord) -> StoreResult<()> {
        let Some(path) = &self.history_path else {
            debug!("no history file configured; skipping record");
            return Ok(());
        };
        let io_err = |source| StoreError::History {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        debug!(%path, version = %record.version, "recorded version history");
        Ok(())
    }
}
