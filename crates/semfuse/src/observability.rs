//! Observability setup: structured JSON logging.
//!
//! This module never writes to stdout, which is reserved for command output
//! (including `--json` documents). Logs go to a file or to stderr.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "SEMFUSE_LOG_PATH";
const ENV_LOG_DIR: &str = "SEMFUSE_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Configuration for observability setup.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Service name, used for the log file name.
    pub service: String,
    /// Directory for JSONL log files. Falls back to platform defaults if unset.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Create config from the package name with an optional configured log dir.
    pub fn from_env_with_overrides(log_dir: Option<camino::Utf8PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir: log_dir.map(camino::Utf8PathBuf::into_std_path_buf),
        }
    }
}

/// How the log file rotates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    /// Exactly the configured path.
    Never,
    /// One file per day, suffixed with the date.
    Daily,
}

#[derive(Clone, Debug)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
    rotation: Rotation,
}

impl LogTarget {
    fn appender(&self) -> RollingFileAppender {
        match self.rotation {
            Rotation::Never => tracing_appender::rolling::never(&self.dir, &self.file_name),
            Rotation::Daily => tracing_appender::rolling::daily(&self.dir, &self.file_name),
        }
    }

    #[cfg(test)]
    fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Guard that must be held for the lifetime of the application so buffered
/// log lines are flushed on exit.
pub struct ObservabilityGuard {
    _log_guard: WorkerGuard,
}

/// Initialize JSON logging.
///
/// Returns a guard that must be held for the application lifetime.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (log_writer, log_guard) = match build_log_writer(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let log_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_ansi(false)
        .with_writer(log_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()?;

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard {
        _log_guard: log_guard,
    })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > `RUST_LOG` env > `default_level`
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    if verbose > 0 {
        let level = match verbose {
            1 => "debug",
            _ => "trace",
        };
        return EnvFilter::new(level);
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn build_log_writer(
    service: &str,
    config_log_dir: Option<&Path>,
) -> Result<(NonBlocking, WorkerGuard)> {
    let target = resolve_log_target(service, config_log_dir).map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(tracing_appender::non_blocking(target.appender()))
}

fn resolve_log_target(service: &str, config_log_dir: Option<&Path>) -> Result<LogTarget, String> {
    let path_override = std::env::var_os(ENV_LOG_PATH).map(PathBuf::from);
    let dir_override = std::env::var_os(ENV_LOG_DIR).map(PathBuf::from);
    let default_dir = semfuse_core::config::user_data_local_dir()
        .map(|dir| dir.join("logs").into_std_path_buf());

    resolve_log_target_with(
        service,
        path_override,
        dir_override,
        config_log_dir.map(PathBuf::from),
        default_dir,
    )
}

fn resolve_log_target_with(
    service: &str,
    path_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    default_dir: Option<PathBuf>,
) -> Result<LogTarget, String> {
    if let Some(path) = path_override {
        return log_target_from_path(path);
    }

    match dir_override.or(config_dir).or(default_dir) {
        Some(dir) => log_target_from_dir(dir, service),
        None => Err("No writable log directory found".to_string()),
    }
}

fn log_target_from_dir(dir: PathBuf, service: &str) -> Result<LogTarget, String> {
    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    ensure_writable(&dir)?;
    Ok(LogTarget {
        dir,
        file_name,
        rotation: Rotation::Daily,
    })
}

fn log_target_from_path(path: PathBuf) -> Result<LogTarget, String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("{ENV_LOG_PATH} must include a file name"))
        .and_then(|name| {
            name.to_str()
                .map(ToString::to_string)
                .ok_or_else(|| format!("{ENV_LOG_PATH} must be valid UTF-8"))
        })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_writable(&dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;

    Ok(LogTarget {
        dir,
        file_name,
        rotation: Rotation::Never,
    })
}

fn ensure_writable(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log directory {}: {e}", dir.display()))?;
    let metadata = std::fs::metadata(dir)
        .map_err(|e| format!("Failed to inspect log directory {}: {e}", dir.display()))?;
    if metadata.permissions().readonly() {
        return Err(format!("Log directory {} is read-only", dir.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn env_filter_quiet_overrides() {
        let filter = env_filter(true, 3, "info");
        assert_eq!(filter.to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_maps_to_debug_and_trace() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 2, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins_and_never_rotates() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("nested/custom.jsonl");
        let target = resolve_log_target_with(
            "demo",
            Some(file_path.clone()),
            Some(tmp.path().join("ignored")),
            None,
            None,
        )
        .unwrap();

        assert_eq!(target.path(), file_path);
        assert_eq!(target.rotation, Rotation::Never);
        assert!(file_path.exists());
    }

    #[test]
    fn dir_override_beats_config_dir() {
        let tmp = TempDir::new().unwrap();
        let env_dir = tmp.path().join("env");
        let target = resolve_log_target_with(
            "demo",
            None,
            Some(env_dir.clone()),
            Some(tmp.path().join("config")),
            None,
        )
        .unwrap();

        assert_eq!(target.dir, env_dir);
        assert_eq!(target.file_name, format!("demo{LOG_FILE_SUFFIX}"));
        assert_eq!(target.rotation, Rotation::Daily);
    }

    #[test]
    fn config_dir_beats_default() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("config");
        let target = resolve_log_target_with(
            "demo",
            None,
            None,
            Some(config_dir.clone()),
            Some(tmp.path().join("default")),
        )
        .unwrap();
        assert_eq!(target.dir, config_dir);
    }

    #[test]
    fn no_candidates_is_an_error() {
        assert!(resolve_log_target_with("demo", None, None, None, None).is_err());
    }
}
