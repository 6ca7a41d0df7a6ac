//! Analyze command: fuse every signal and report the recommendation.

use camino::Utf8Path;
use clap::Args;
use semfuse_core::config::Config;
use semfuse_core::evidence::AnalysisContext;
use semfuse_core::fusion::FusionEngine;
use tracing::{debug, instrument};

use super::{EvidenceArgs, block_on, collect_evidence, print_fusion};

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Evidence sources.
    #[command(flatten)]
    pub evidence: EvidenceArgs,
}

/// Run the fusion engine over the gathered evidence and print the result.
#[instrument(name = "cmd_analyze", skip_all)]
pub fn cmd_analyze(
    args: AnalyzeArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing analyze command");

    let evidence = collect_evidence(&args.evidence, config, cwd);
    let context = AnalysisContext::for_root(cwd);
    let engine = FusionEngine::from_config(config, cwd);
    let result = block_on(async { engine.fuse(&evidence, &context).await })?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_fusion(&result);
    }
    Ok(())
}
