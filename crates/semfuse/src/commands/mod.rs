//! Command implementations

pub mod analyze;

pub mod doctor;

pub mod info;

pub mod next;

pub mod semver;

use std::future::Future;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use semfuse_core::config::Config;
use semfuse_core::evidence::{Evidence, gather_evidence};
use semfuse_core::fusion::FusionResult;
use semfuse_core::git;
use tracing::{debug, warn};

/// Evidence flags shared by `analyze` and `next`.
#[derive(Args, Debug, Default, Clone)]
pub struct EvidenceArgs {
    /// Extra commit message to consider (repeatable)
    #[arg(long = "commit", value_name = "MESSAGE")]
    pub commits: Vec<String>,

    /// Extra changed file, relative to the project root (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<Utf8PathBuf>,

    /// Free-text description of the change (feeds the AI signal)
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Git ref to gather history from (default: latest version tag)
    #[arg(long, value_name = "REF")]
    pub since: Option<String>,

    /// Don't read git history; use only the flags above
    #[arg(long)]
    pub no_git: bool,
}

/// Build the evidence bundle from git (when usable) plus explicit flags.
pub fn collect_evidence(args: &EvidenceArgs, config: &Config, root: &Utf8Path) -> Evidence {
    let use_git = !args.no_git && git::is_available() && git::is_inside_repo(root).unwrap_or(false);
    let mut evidence = if use_git {
        gather_evidence(
            root,
            args.since.as_deref(),
            &config.analysis.lockfile,
            &args.description,
        )
    } else {
        if !args.no_git {
            warn!(%root, "not a git repository; using only explicit evidence");
        }
        Evidence {
            description: args.description.clone(),
            ..Evidence::default()
        }
    };
    evidence.commits.extend(args.commits.iter().cloned());
    evidence.changed_files.extend(args.files.iter().cloned());
    debug!(
        commits = evidence.commits.len(),
        files = evidence.changed_files.len(),
        deps = evidence.dependencies.changes.len(),
        use_git,
        "evidence collected"
    );
    evidence
}

/// Drive a future to completion on a fresh multi-threaded runtime.
///
/// Analyzers abandoned at the deadline keep running on blocking threads, so
/// the runtime is shut down in the background rather than joined.
pub fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Print a fused decision as human-readable text.
pub fn print_fusion(result: &FusionResult) {
    println!(
        "{}: {} ({} {:.2})",
        "Recommended".bold(),
        result.recommended.as_str().green().bold(),
        "confidence".dimmed(),
        result.confidence
    );
    println!("{}: {}", "Winning source".dimmed(), result.winning_source.cyan());
    println!("{}: {}", "Reasoning".dimmed(), result.reasoning);
    if result.is_fallback() {
        println!(
            "  {} analyzers missed the deadline; keyword fallback used",
            "!".yellow()
        );
    }

    if !result.contributing.is_empty() {
        println!();
        println!("{}", "Signals".bold().underline());
        for (id, analysis) in &result.contributing {
            let score = result.scores.get(id).copied().unwrap_or_default();
            let marker = if *id == result.winning_source {
                "★".green().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "  {marker} {:<11} {:<6} conf {:.2}  score {:.3}  {}",
                id.as_str(),
                analysis.recommended.as_str(),
                analysis.confidence,
                score,
                analysis.reasoning.dimmed()
            );
        }
    }

    let factors: Vec<&str> = result.factors.iter().map(String::as_str).collect();
    println!();
    println!("{}: {}", "Factors".dimmed(), factors.join(", "));
}
