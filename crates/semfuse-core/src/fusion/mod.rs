//! Fusion engine: combine analyzer opinions into one bump decision.
//!
//! # Algorithm
//!
//! 1. Derive a [`CacheKey`] from the normalized evidence, context, and
//!    weights. A live cache entry is returned unchanged.
//! 2. Run every analyzer concurrently on the blocking pool under a global
//!    deadline. If the deadline fires, stop waiting (late analyzers keep
//!    running detached and their results are discarded) and return the
//!    [`keyword_fallback`]. Fallback results are never cached.
//! 3. Score each result as `ordinal(bump) * weight * confidence`.
//! 4. The strictly highest score wins; exact ties go to the analyzer that
//!    comes first in [`AnalyzerId::PRIORITY`].
//! 5. The fused confidence is the winner's confidence scaled by its weight,
//!    capped at 1.0; the factor set is the union of every analyzer's
//!    factors plus `fusion`.
//!
//! The score multiplies an ordinal magnitude by a probability-like
//! confidence, so a single `major` opinion can outscore several agreeing
//! lower ones. That is kept as-is for compatibility with existing weight
//! tuning.

pub mod cache;
pub mod fallback;
pub mod weights;

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub use cache::{CacheConfig, CacheKey, CacheStats, MemoryCache, ResultCache};
pub use fallback::{HYBRID_FALLBACK, keyword_fallback};
pub use weights::WeightConfig;

use crate::analyzer::ai::{AiAnalyzer, AiTransport, CommandTransport};
use crate::analyzer::code::CodeAnalyzer;
use crate::analyzer::commit::CommitAnalyzer;
use crate::analyzer::deps::DependencyAnalyzer;
use crate::analyzer::rules::RuleBasedAnalyzer;
use crate::analyzer::{AnalysisResult, Analyzer, AnalyzerId, clamp_confidence};
use crate::config::Config;
use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Factor added to every fused result.
pub const FUSION_FACTOR: &str = "fusion";

/// Default global deadline for one fusion.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// The fused decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Winning bump level.
    pub recommended: BumpLevel,
    /// Winner's confidence scaled by its weight, in `[0, 1]`.
    pub confidence: f64,
    /// Names the winning source and echoes its reasoning.
    pub reasoning: String,
    /// Union of all analyzer factors plus `fusion`.
    pub factors: BTreeSet<String>,
    /// Every analyzer's result.
    pub contributing: BTreeMap<AnalyzerId, AnalysisResult>,
    /// The analyzer whose opinion was adopted.
    pub winning_source: AnalyzerId,
    /// Score per analyzer.
    pub scores: BTreeMap<AnalyzerId, f64>,
    /// When the fusion ran.
    pub produced_at: SystemTime,
}

impl FusionResult {
    /// Whether this came from the deadline fallback.
    pub fn is_fallback(&self) -> bool {
        self.factors.contains(HYBRID_FALLBACK)
    }
}

/// Score of one analyzer result under the given weights.
pub fn score(result: &AnalysisResult, weights: &WeightConfig) -> f64 {
    f64::from(result.recommended.ordinal()) * weights.weight(result.source) * result.confidence
}

/// Combine analyzer results into a fused decision.
///
/// Returns `None` when `results` is empty.
pub fn combine(
    results: BTreeMap<AnalyzerId, AnalysisResult>,
    weights: &WeightConfig,
) -> Option<FusionResult> {
    let scores: BTreeMap<AnalyzerId, f64> = results
        .iter()
        .map(|(id, result)| (*id, score(result, weights)))
        .collect();

    // Scan in priority order and only replace on a strictly higher score
    let mut winner: Option<(AnalyzerId, f64)> = None;
    for id in AnalyzerId::PRIORITY {
        let Some(&s) = scores.get(&id) else { continue };
        if winner.is_none_or(|(_, best)| s > best) {
            winner = Some((id, s));
        }
    }
    let (winning_source, winning_score) = winner?;
    let best = results.get(&winning_source)?;

    let mut factors: BTreeSet<String> = results
        .values()
        .flat_map(|r| r.factors.iter().cloned())
        .collect();
    factors.insert(FUSION_FACTOR.to_string());

    Some(FusionResult {
        recommended: best.recommended,
        confidence: clamp_confidence(best.confidence * weights.weight(winning_source)).min(1.0),
        reasoning: format!(
            "{winning_source} analysis selected {} (score {winning_score:.3}): {}",
            best.recommended, best.reasoning
        ),
        factors,
        winning_source,
        scores,
        contributing: results,
        produced_at: SystemTime::now(),
    })
}

/// The stock analyzer set, in priority order.
pub fn default_analyzers(
    ai: Option<Arc<dyn AiTransport>>,
    source_extensions: Option<&[String]>,
) -> Vec<Arc<dyn Analyzer>> {
    let ai = ai.map_or_else(AiAnalyzer::unconfigured, AiAnalyzer::with_transport);
    let code = source_extensions.map_or_else(CodeAnalyzer::default, CodeAnalyzer::with_extensions);
    vec![
        Arc::new(ai),
        Arc::new(RuleBasedAnalyzer),
        Arc::new(code),
        Arc::new(CommitAnalyzer),
        Arc::new(DependencyAnalyzer),
    ]
}

/// Runs analyzers concurrently and fuses their results.
pub struct FusionEngine {
    analyzers: Vec<Arc<dyn Analyzer>>,
    cache: Arc<dyn ResultCache>,
    weights: RwLock<WeightConfig>,
    deadline: Duration,
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<AnalyzerId> = self.analyzers.iter().map(|a| a.id()).collect();
        f.debug_struct("FusionEngine")
            .field("analyzers", &ids)
            .field("weights", &self.weights())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FusionEngine`].
#[derive(Default)]
pub struct FusionEngineBuilder {
    analyzers: Option<Vec<Arc<dyn Analyzer>>>,
    cache: Option<Arc<dyn ResultCache>>,
    weights: WeightConfig,
    deadline: Option<Duration>,
}

impl FusionEngineBuilder {
    /// Replace the analyzer set.
    #[must_use]
    pub fn analyzers(mut self, analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    /// Use a specific cache.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Initial weights.
    #[must_use]
    pub fn weights(mut self, weights: WeightConfig) -> Self {
        self.weights = weights;
        self
    }

    /// Global deadline for analyzer collection.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the engine.
    pub fn build(self) -> FusionEngine {
        let weights = sanitize(self.weights);
        FusionEngine {
            analyzers: self
                .analyzers
                .unwrap_or_else(|| default_analyzers(None, None)),
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryCache::default())),
            weights: RwLock::new(weights),
            deadline: self.deadline.unwrap_or(DEFAULT_DEADLINE),
        }
    }
}

fn sanitize(weights: WeightConfig) -> WeightConfig {
    let invalid = weights.invalid();
    if !invalid.is_empty() {
        warn!(?invalid, "negative or non-finite weights replaced with 0");
    }
    weights.sanitized()
}

impl FusionEngine {
    /// Start building an engine.
    pub fn builder() -> FusionEngineBuilder {
        FusionEngineBuilder::default()
    }

    /// Engine configured from the `[fusion]`, `[cache]`, `[analysis]` and
    /// `[ai]` sections, with AI commands run from `project_root`.
    pub fn from_config(config: &Config, project_root: &camino::Utf8Path) -> Self {
        let ai: Option<Arc<dyn AiTransport>> = config.ai.command.as_deref().map(|command| {
            Arc::new(CommandTransport::new(command).in_dir(project_root)) as Arc<dyn AiTransport>
        });
        Self::builder()
            .analyzers(default_analyzers(
                ai,
                config.analysis.source_extensions.as_deref(),
            ))
            .cache(Arc::new(MemoryCache::new(config.cache)))
            .weights(config.fusion.weights)
            .deadline(Duration::from_millis(config.fusion.deadline_ms))
            .build()
    }

    /// Current weights.
    pub fn weights(&self) -> WeightConfig {
        *self.weights.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the weights. Affects only fusions started afterwards.
    pub fn set_weights(&self, weights: WeightConfig) {
        *self.weights.write().unwrap_or_else(PoisonError::into_inner) = sanitize(weights);
    }

    /// The configured deadline.
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// The engine's cache.
    pub fn cache(&self) -> &dyn ResultCache {
        self.cache.as_ref()
    }

    /// Fuse with the current weights.
    pub async fn fuse(&self, evidence: &Evidence, context: &AnalysisContext) -> FusionResult {
        let weights = self.weights();
        self.fuse_with_weights(evidence, context, &weights).await
    }

    /// Fuse with explicit weights. Always returns a result.
    ///
    /// Negative or non-finite weights are treated as 0, as everywhere else.
    #[instrument(skip_all, fields(project = %context.project_name))]
    pub async fn fuse_with_weights(
        &self,
        evidence: &Evidence,
        context: &AnalysisContext,
        weights: &WeightConfig,
    ) -> FusionResult {
        let weights = &sanitize(*weights);
        let key = CacheKey::derive(evidence, context, weights);
        if let Some(hit) = self.cache.get(&key) {
            debug!(%key, "fusion cache hit");
            return hit;
        }

        let Some(results) = self.run_analyzers(evidence, context).await else {
            warn!(deadline = ?self.deadline, "analyzers missed the deadline; using keyword fallback");
            return keyword_fallback(evidence);
        };

        let Some(fused) = combine(results, weights) else {
            warn!("no analyzers configured; using keyword fallback");
            return keyword_fallback(evidence);
        };

        info!(
            bump = %fused.recommended,
            source = %fused.winning_source,
            confidence = fused.confidence,
            "fusion complete"
        );
        self.cache.put(key, fused.clone());
        fused
    }

    /// Run every analyzer; `None` if the deadline elapsed first.
    async fn run_analyzers(
        &self,
        evidence: &Evidence,
        context: &AnalysisContext,
    ) -> Option<BTreeMap<AnalyzerId, AnalysisResult>> {
        let evidence = Arc::new(evidence.clone());
        let context = Arc::new(context.clone());

        let mut tasks = JoinSet::new();
        for analyzer in &self.analyzers {
            let analyzer = Arc::clone(analyzer);
            let evidence = Arc::clone(&evidence);
            let context = Arc::clone(&context);
            tasks.spawn_blocking(move || run_guarded(analyzer.as_ref(), &evidence, &context));
        }

        let collect = async {
            let mut results = BTreeMap::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(result) => {
                        results.insert(result.source, result);
                    }
                    // Panics are caught in run_guarded; this is cancellation
                    Err(e) => warn!(error = %e, "analyzer task did not complete"),
                }
            }
            results
        };

        let outcome = tokio::time::timeout(self.deadline, collect).await;
        match outcome {
            Ok(results) => Some(results),
            Err(_) => {
                // Blocking tasks cannot be aborted; let them finish unobserved
                tasks.detach_all();
                None
            }
        }
    }
}

/// Run one analyzer, turning a panic into its fallback result.
fn run_guarded(
    analyzer: &dyn Analyzer,
    evidence: &Evidence,
    context: &AnalysisContext,
) -> AnalysisResult {
    let id = analyzer.id();
    let mut result = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(evidence, context)))
        .unwrap_or_else(|_| {
            warn!(analyzer = %id, "analyzer panicked");
            AnalysisResult::fallback(id, "analyzer panicked")
        });
    result.source = id;
    result
}
