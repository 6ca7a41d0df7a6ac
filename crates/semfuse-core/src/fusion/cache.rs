//! Fusion result cache.
//!
//! Results are keyed by a SHA-256 digest of the normalized inputs (evidence,
//! context, and weights), so two calls that differ only in commit whitespace
//! or changed-file order share an entry. Entries expire after a TTL checked
//! at read time; a sweep of expired entries runs once the cache grows past a
//! threshold, and the oldest entry is evicted when the hard capacity is hit.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::FusionResult;
use super::weights::WeightConfig;
use crate::evidence::{AnalysisContext, DepChange, Evidence};

/// Digest identifying one set of fusion inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

#[derive(Serialize)]
struct NormalizedInputs<'a> {
    commits: Vec<&'a str>,
    changed_files: Vec<&'a Utf8PathBuf>,
    dependencies: Vec<&'a DepChange>,
    description: &'a str,
    context: &'a AnalysisContext,
    weights: [u64; 5],
}

impl CacheKey {
    /// Derive the key for a fusion call.
    pub fn derive(evidence: &Evidence, context: &AnalysisContext, weights: &WeightConfig) -> Self {
        let mut changed_files: Vec<_> = evidence.changed_files.iter().collect();
        changed_files.sort();
        changed_files.dedup();
        let mut dependencies: Vec<_> = evidence.dependencies.changes.iter().collect();
        dependencies.sort();

        let inputs = NormalizedInputs {
            commits: evidence.commits.iter().map(|c| c.trim()).collect(),
            changed_files,
            dependencies,
            description: evidence.description.trim(),
            context,
            weights: weights.fingerprint(),
        };

        let mut hasher = Sha256::new();
        // Plain structs of strings and integers always serialize
        if let Ok(bytes) = serde_json::to_vec(&inputs) {
            hasher.update(&bytes);
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds an entry stays valid.
    pub ttl_secs: u64,
    /// Entry count beyond which each insert sweeps expired entries.
    pub sweep_threshold: usize,
    /// Hard upper bound on entries.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            sweep_threshold: 100,
            capacity: 1000,
        }
    }
}

impl CacheConfig {
    /// The TTL as a [`Duration`].
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned an entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Entries currently stored.
    pub entries: usize,
}

/// Storage for fusion results.
pub trait ResultCache: Send + Sync {
    /// Look up a live entry.
    fn get(&self, key: &CacheKey) -> Option<FusionResult>;
    /// Store an entry.
    fn put(&self, key: CacheKey, result: FusionResult);
    /// Drop expired entries; returns how many were removed.
    fn sweep(&self) -> usize;
    /// Number of stored entries, live or not yet swept.
    fn len(&self) -> usize;
    /// Whether the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Hit/miss counters.
    fn stats(&self) -> CacheStats;
}

struct Entry {
    result: FusionResult,
    inserted: Instant,
}

/// In-process TTL cache.
pub struct MemoryCache {
    config: CacheConfig,
    entries: Mutex<HashMap<CacheKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep_locked(&self, entries: &mut HashMap<CacheKey, Entry>) -> usize {
        let ttl = self.config.ttl();
        let before = entries.len();
        entries.retain(|_, e| e.inserted.elapsed() < ttl);
        before - entries.len()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<FusionResult> {
        let mut entries = self.lock();
        let live = match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.config.ttl() => {
                Some(entry.result.clone())
            }
            Some(_) => {
                trace!(%key, "cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if live.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        live
    }

    fn put(&self, key: CacheKey, result: FusionResult) {
        if self.config.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if entries.len() >= self.config.sweep_threshold {
            let removed = self.sweep_locked(&mut entries);
            if removed > 0 {
                debug!(removed, "swept expired cache entries");
            }
        }
        if !entries.contains_key(&key) && entries.len() >= self.config.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            Entry {
                result,
                inserted: Instant::now(),
            },
        );
    }

    fn sweep(&self) -> usize {
        let mut entries = self.lock();
        self.sweep_locked(&mut entries)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
