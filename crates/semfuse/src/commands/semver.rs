//! Semver command: version algebra from the command line.

use anyhow::Context;
use clap::{Args, Subcommand};
use semfuse_core::semver::Version;
use semfuse_core::version::{self, BumpLevel, parse_version, satisfies_range};
use tracing::{debug, instrument};

/// Arguments for the `semver` subcommand.
#[derive(Args, Debug)]
pub struct SemverArgs {
    /// Operation to run.
    #[command(subcommand)]
    pub command: SemverCommand,
}

/// Version algebra operations.
#[derive(Subcommand, Debug)]
pub enum SemverCommand {
    /// Compare two versions; prints -1, 0 or 1
    Compare {
        /// Left-hand version
        a: String,
        /// Right-hand version
        b: String,
    },

    /// Bump a version by a level
    Bump {
        /// Version to bump
        version: String,
        /// Bump level
        #[arg(value_enum)]
        level: BumpLevel,
        /// Prerelease tag to attach (e.g., "beta.1")
        #[arg(long = "pre", value_name = "TAG")]
        prerelease: Option<String>,
    },

    /// Check whether a version satisfies a range (e.g., "^1.2.0", ">=1.0.0 <2.0.0")
    Satisfies {
        /// Version to test
        version: String,
        /// Range expression
        range: String,
    },

    /// Sort versions by precedence
    Sort {
        /// Versions to sort
        #[arg(required = true)]
        versions: Vec<String>,
        /// Highest first
        #[arg(long)]
        desc: bool,
    },
}

fn parse(raw: &str) -> anyhow::Result<Version> {
    parse_version(raw).with_context(|| format!("invalid version {raw:?}"))
}

/// Execute a semver operation.
#[instrument(name = "cmd_semver", skip_all)]
pub fn cmd_semver(args: SemverArgs, global_json: bool) -> anyhow::Result<()> {
    debug!(json_output = global_json, command = ?args.command, "executing semver command");

    match args.command {
        SemverCommand::Compare { a, b } => {
            let (left, right) = (parse(&a)?, parse(&b)?);
            let ordering = version::compare(&left, &right) as i8;
            if global_json {
                let out = serde_json::json!({
                    "a": left.to_string(),
                    "b": right.to_string(),
                    "ordering": ordering,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{ordering}");
            }
        }
        SemverCommand::Bump {
            version: raw,
            level,
            prerelease,
        } => {
            let current = parse(&raw)?;
            let next = version::next_version(&current, level, prerelease.as_deref())?;
            if global_json {
                let out = serde_json::json!({
                    "previous": current.to_string(),
                    "next": next.to_string(),
                    "level": level,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{next}");
            }
        }
        SemverCommand::Satisfies { version: raw, range } => {
            let version = parse(&raw)?;
            let ok = satisfies_range(&version, &range)
                .with_context(|| format!("invalid range {range:?}"))?;
            if global_json {
                let out = serde_json::json!({
                    "version": version.to_string(),
                    "range": range,
                    "satisfies": ok,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{ok}");
            }
        }
        SemverCommand::Sort { versions, desc } => {
            let parsed = versions
                .iter()
                .map(|raw| parse(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let sorted: Vec<String> = version::sort_versions(parsed, !desc)
                .iter()
                .map(ToString::to_string)
                .collect();
            if global_json {
                println!("{}", serde_json::to_string_pretty(&sorted)?);
            } else {
                for v in sorted {
                    println!("{v}");
                }
            }
        }
    }
    Ok(())
}
