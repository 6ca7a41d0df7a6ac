//! Core library for semfuse.
//!
//! semfuse decides the semantic-version bump for a project by fusing several
//! independent signals (commit messages, changed source files, dependency
//! deltas, a keyword rule, and an optional AI-style recommendation) into one
//! decision with a confidence score and a justification.
//!
//! # Modules
//!
//! - [`version`] - Version algebra: parse, compare, bump, range matching
//! - [`evidence`] - Evidence model and git-based evidence gathering
//! - [`analyzer`] - The five signal analyzers
//! - [`fusion`] - Concurrent fusion engine and result cache
//! - [`plan`] - Next-version orchestration and dry-run handling
//! - [`store`] - Version persistence (git tags + JSONL history)
//! - [`config`] - Configuration loading and management
//! - [`git`] - Git plumbing
//! - [`deps`] - Lockfile diff parsing
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```no_run
//! use semfuse_core::evidence::{AnalysisContext, Evidence};
//! use semfuse_core::fusion::FusionEngine;
//!
//! # async fn run() {
//! let engine = FusionEngine::builder().build();
//! let evidence = Evidence {
//!     commits: vec!["feat: add CSV export".into()],
//!     ..Evidence::default()
//! };
//! let result = engine.fuse(&evidence, &AnalysisContext::default()).await;
//! println!("{} ({:.2})", result.recommended, result.confidence);
//! # }
//! ```
#![deny(unsafe_code)]

pub mod analyzer;

pub mod config;

pub mod deps;

pub mod error;

pub mod evidence;

pub mod fusion;

pub mod git;

pub mod plan;

pub mod store;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
