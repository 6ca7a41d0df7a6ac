//! Info command: package, configuration and analyzer summary.

use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use semfuse_core::analyzer::AnalyzerId;
use semfuse_core::config::{self, Config};
use semfuse_core::fusion::{CacheConfig, WeightConfig};
use semfuse_core::store::GitTagStore;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    homepage: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            homepage: env!("CARGO_PKG_HOMEPAGE"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    deadline_ms: u64,
    weights: WeightConfig,
    cache: CacheConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            deadline_ms: config.fusion.deadline_ms,
            weights: config.fusion.weights,
            cache: config.cache,
            ai_command: config.ai.command.clone(),
            history: config
                .history
                .path
                .clone()
                .or_else(GitTagStore::default_history_path)
                .map(|p| p.to_string()),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    analyzers: Vec<AnalyzerId>,
}

/// Print package information.
#[instrument(name = "cmd_info", skip_all)]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        analyzers: AnalyzerId::PRIORITY.to_vec(),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.package.name.bold(), info.package.version.green());
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), info.package.repository.cyan());
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    match info.config.config_file {
        Some(ref path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(ref dir) = info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {} ms", "Deadline".dimmed(), info.config.deadline_ms);
    println!(
        "{}: ttl {}s, capacity {}, sweep at {}",
        "Cache".dimmed(),
        info.config.cache.ttl_secs,
        info.config.cache.capacity,
        info.config.cache.sweep_threshold
    );
    match info.config.ai_command {
        Some(ref cmd) => println!("{}: {}", "AI command".dimmed(), cmd.cyan()),
        None => println!("{}: {}", "AI command".dimmed(), "not configured".yellow()),
    }
    if let Some(ref path) = info.config.history {
        println!("{}: {}", "History".dimmed(), path);
    }

    println!();
    println!("{}", "Analyzers".bold().underline());
    for id in &info.analyzers {
        println!(
            "  {:<11} {} {:.2}",
            id.as_str(),
            "weight".dimmed(),
            info.config.weights.weight(*id)
        );
    }
    Ok(())
}
