//! Doctor command: diagnose configuration and environment.

use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use semfuse_core::config::{self, Config};
use semfuse_core::git;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    git: GitStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    data: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to the discovered project config file, if any
    file: Option<String>,
    found: bool,
    /// Values that load but will misbehave
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct GitStatus {
    available: bool,
    inside_repo: bool,
    latest_tag: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    cwd: String,
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const ENV_VARS: &[(&str, &str)] = &[
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("XDG_DATA_HOME", "Override data directory"),
    ("RUST_LOG", "Log filter directive"),
    ("SEMFUSE_LOG_PATH", "Explicit log file path"),
    ("SEMFUSE_LOG_DIR", "Log directory"),
];

impl DoctorReport {
    fn gather(config: &Config, cwd: &Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        let available = git::is_available();
        let inside_repo = available && git::is_inside_repo(cwd).unwrap_or(false);
        let latest_tag = if inside_repo {
            git::latest_version_tag(cwd).ok().flatten()
        } else {
            None
        };

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
                warnings: config.warnings(),
            },
            git: GitStatus {
                available,
                inside_repo,
                latest_tag,
            },
            environment: EnvironmentInfo {
                cwd: cwd.to_string(),
                env_vars: ENV_VARS
                    .iter()
                    .map(|&(name, description)| EnvVar {
                        name,
                        value: std::env::var(name).ok(),
                        description,
                    })
                    .collect(),
            },
        }
    }
}

/// Run diagnostics and report configuration status.
#[instrument(name = "cmd_doctor", skip_all)]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    for warning in &report.config.warnings {
        println!("  {} {warning}", "!".yellow());
    }
    println!();

    println!("{}", "Git".bold().underline());
    if !report.git.available {
        println!("  {} git not found on PATH", "✗".red());
    } else if !report.git.inside_repo {
        println!("  {} Not inside a git repository", "○".yellow());
    } else {
        println!("  {} Inside a git repository", "✓".green());
        match report.git.latest_tag {
            Some(ref tag) => println!("  {}: {}", "Latest version tag".dimmed(), tag.cyan()),
            None => println!("  {} No version tags yet", "○".yellow()),
        }
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Data", report.directories.data.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), report.environment.cwd.cyan());
    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();
    if set_vars.is_empty() {
        println!("  {} No XDG/logging overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan()
            );
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };
    let config_path = config_dir.join("config.yaml");

    if config_path.exists() || !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn doctor_text_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), false, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn doctor_json_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), true, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn report_carries_config_warnings() {
        let mut config = Config::default();
        config.fusion.deadline_ms = 0;
        let report = DoctorReport::gather(&config, &test_cwd());
        assert_eq!(report.config.warnings.len(), 1);
        assert_eq!(report.environment.env_vars.len(), ENV_VARS.len());
    }
}
