//! Next command: compute the next version and optionally tag it.

use std::io::IsTerminal;

use anyhow::{Context, bail};
use camino::Utf8Path;
use clap::Args;
use inquire::Confirm;
use owo_colors::OwoColorize;
use semfuse_core::config::Config;
use semfuse_core::evidence::AnalysisContext;
use semfuse_core::fusion::FusionEngine;
use semfuse_core::git;
use semfuse_core::plan::{PlanOptions, VersionPlan, determine_next_version};
use semfuse_core::semver::Version;
use semfuse_core::store::{GitTagStore, VersionStore};
use semfuse_core::version::parse_version;
use tracing::{debug, info, instrument};

use super::{EvidenceArgs, block_on, collect_evidence, print_fusion};

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Evidence sources.
    #[command(flatten)]
    pub evidence: EvidenceArgs,

    /// Version to bump from (default: latest version tag)
    #[arg(long, value_name = "VERSION")]
    pub current: Option<String>,

    /// Prerelease tag for the new version (e.g., "rc.1")
    #[arg(long = "pre", value_name = "TAG")]
    pub prerelease: Option<String>,

    /// Show the decision without tagging or recording anything
    #[arg(long)]
    pub dry_run: bool,

    /// Tag without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Where the starting version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrentSource {
    Flag,
    Tag,
    Initial,
}

fn build_store(config: &Config, cwd: &Utf8Path) -> GitTagStore {
    let store = GitTagStore::new(cwd);
    match config
        .history
        .path
        .clone()
        .or_else(GitTagStore::default_history_path)
    {
        Some(path) => store.with_history(path),
        None => store,
    }
}

fn resolve_current(
    args: &NextArgs,
    store: &dyn VersionStore,
    project: &str,
    cwd: &Utf8Path,
) -> anyhow::Result<(Version, CurrentSource)> {
    if let Some(ref raw) = args.current {
        let version = parse_version(raw).with_context(|| format!("invalid --current {raw:?}"))?;
        return Ok((version, CurrentSource::Flag));
    }
    let usable_git =
        !args.evidence.no_git && git::is_available() && git::is_inside_repo(cwd).unwrap_or(false);
    if usable_git
        && let Some(version) = store
            .read_current_version(project)
            .context("failed to read current version")?
    {
        return Ok((version, CurrentSource::Tag));
    }
    Ok((Version::new(0, 0, 0), CurrentSource::Initial))
}

/// Execute the next command.
#[instrument(name = "cmd_next", skip_all, fields(dry_run = args.dry_run))]
pub fn cmd_next(
    args: NextArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing next command");

    let store = build_store(config, cwd);
    let mut context = AnalysisContext::for_root(cwd);
    let (current, source) = resolve_current(&args, &store, &context.project_name, cwd)?;
    context = context.with_current_version(Some(current.clone()));

    let evidence = collect_evidence(&args.evidence, config, cwd);
    let engine = FusionEngine::from_config(config, cwd);
    let options = PlanOptions {
        dry_run: args.dry_run,
        prerelease: args.prerelease.clone(),
    };
    let plan = block_on(async {
        determine_next_version(&engine, &current, &evidence, &context, &options).await
    })?
    .context("failed to determine next version")?;

    if global_json {
        if plan.dry_run {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
    } else {
        print_plan(&plan, source);
        if plan.dry_run {
            println!();
            println!("{}", "Dry run: no changes made.".yellow());
            return Ok(());
        }
    }

    if !args.yes && !confirm(&plan)? {
        info!("tagging declined");
        if !global_json {
            println!("{}", "Cancelled.".yellow());
        }
        return Ok(());
    }

    let outcome = plan
        .apply(&store, &context.project_name)
        .context("failed to apply version")?;

    if global_json {
        let applied = serde_json::json!({
            "plan": plan,
            "applied": outcome.applied,
            "tag": format!("v{}", plan.next),
            "history": store.history_path().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&applied)?);
    } else {
        println!();
        println!(
            "  {} Tagged {}",
            "✓".green(),
            format!("v{}", plan.next).green().bold()
        );
        if let Some(path) = store.history_path() {
            println!("  {} {}", "→".dimmed(), path.cyan());
        }
    }
    Ok(())
}

fn print_plan(plan: &VersionPlan, source: CurrentSource) {
    println!(
        "{}: {} → {}",
        "Version".bold(),
        plan.previous.to_string().dimmed(),
        plan.next.to_string().green().bold()
    );
    match source {
        CurrentSource::Flag => {}
        CurrentSource::Tag => println!("{}: latest version tag", "Current from".dimmed()),
        CurrentSource::Initial => println!(
            "{}: {}",
            "Current from".dimmed(),
            "no version tag found; starting at 0.0.0".yellow()
        ),
    }
    println!();
    print_fusion(&plan.fusion);
}

fn confirm(plan: &VersionPlan) -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("refusing to tag v{} non-interactively; pass --yes or --dry-run", plan.next);
    }
    let answer = Confirm::new(&format!("Create tag v{}?", plan.next))
        .with_default(false)
        .prompt();
    // An interrupted prompt counts as a no
    Ok(answer.unwrap_or(false))
}
