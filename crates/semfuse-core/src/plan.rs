//! Version orchestration: fuse, bump, and hand off persistence.
//!
//! [`determine_next_version`] computes a [`VersionPlan`] and never touches
//! anything outside the process. [`VersionPlan::apply`] performs the write
//! side through a [`VersionStore`], unless the plan is a dry run.

use std::time::SystemTime;

use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::evidence::{AnalysisContext, Evidence};
use crate::fusion::{FusionEngine, FusionResult};
use crate::store::{StoreError, VersionRecord, VersionStore};
use crate::version::{BumpLevel, VersionError, next_version};

/// Errors from planning or applying a version bump.
#[derive(Error, Debug)]
pub enum PlanError {
    /// The bump could not be computed (e.g. an invalid prerelease tag).
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Persisting the new version failed.
    #[error("failed to persist version: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Options for [`determine_next_version`].
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Compute only; [`VersionPlan::apply`] will not write anything.
    pub dry_run: bool,
    /// Prerelease tag appended to the bumped version (e.g. `rc.1`).
    pub prerelease: Option<String>,
}

/// The computed next version and the decision behind it.
#[derive(Debug, Clone, Serialize)]
pub struct VersionPlan {
    /// Version bumped from.
    pub previous: Version,
    /// Version bumped to.
    pub next: Version,
    /// Bump applied.
    pub bump: BumpLevel,
    /// The fused decision.
    pub fusion: FusionResult,
    /// Whether this plan must not be applied.
    pub dry_run: bool,
}

/// What [`VersionPlan::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// Whether the version was written and recorded.
    pub applied: bool,
}

/// Fuse the evidence and bump `current` by the recommended level.
#[instrument(skip_all, fields(%current, dry_run = options.dry_run))]
pub async fn determine_next_version(
    engine: &FusionEngine,
    current: &Version,
    evidence: &Evidence,
    context: &AnalysisContext,
    options: &PlanOptions,
) -> PlanResult<VersionPlan> {
    let fusion = engine.fuse(evidence, context).await;
    let bump = fusion.recommended;
    let next = next_version(current, bump, options.prerelease.as_deref())?;
    info!(%next, %bump, source = %fusion.winning_source, "next version determined");

    Ok(VersionPlan {
        previous: current.clone(),
        next,
        bump,
        fusion,
        dry_run: options.dry_run,
    })
}

impl VersionPlan {
    /// The history record describing this plan.
    pub fn record(&self, project: &str) -> VersionRecord {
        VersionRecord {
            project: project.to_string(),
            previous: Some(self.previous.clone()),
            version: self.next.clone(),
            bump: self.bump,
            confidence: self.fusion.confidence,
            winning_source: self.fusion.winning_source,
            reasoning: self.fusion.reasoning.clone(),
            recorded_at: SystemTime::now(),
        }
    }

    /// Write the new version and record it, unless this is a dry run.
    #[instrument(skip_all, fields(next = %self.next, dry_run = self.dry_run))]
    pub fn apply(&self, store: &dyn VersionStore, project: &str) -> PlanResult<ApplyOutcome> {
        if self.dry_run {
            info!("dry run; nothing written");
            return Ok(ApplyOutcome { applied: false });
        }
        store.write_version(project, &self.next)?;
        store.record_history(&self.record(project))?;
        info!("version applied");
        Ok(ApplyOutcome { applied: true })
    }
}
