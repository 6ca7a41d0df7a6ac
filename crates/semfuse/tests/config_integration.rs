//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary, isolated from the
/// user's own config and environment overrides.
#[allow(deprecated)]
fn cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("xdg-config"))
        .env("XDG_DATA_HOME", home.join("xdg-data"))
        .env("SEMFUSE_LOG_DIR", home.join("logs"))
        .env_remove("SEMFUSE_FUSION__DEADLINE_MS")
        .env_remove("RUST_LOG");
    cmd
}

/// Run `info --json` from `dir` and return the parsed `config` object.
fn info_config(home: &Path, dir: &Path, extra_env: &[(&str, &str)]) -> serde_json::Value {
    let mut command = cmd(home);
    for (key, value) in extra_env {
        command.env(key, value);
    }
    let output = command
        .args(["-C", dir.to_str().unwrap(), "info", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    json["config"].clone()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = info_config(tmp.path(), tmp.path(), &[]);
    assert_eq!(config["log_level"], "info");
    assert_eq!(config["deadline_ms"], 30_000);
    assert!(config.get("config_file").is_none());
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".semfuse.toml"), r#"log_level = "debug""#).unwrap();

    let config = info_config(tmp.path(), tmp.path(), &[]);
    assert_eq!(config["log_level"], "debug");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(
        tmp.path().join(".semfuse.toml"),
        "[fusion]\ndeadline_ms = 1500\n",
    )
    .unwrap();

    let config = info_config(tmp.path(), &sub_dir, &[]);
    assert_eq!(config["deadline_ms"], 1500);
}

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".semfuse.toml"), r#"log_level = "error""#).unwrap();
    fs::write(sub_dir.join(".semfuse.toml"), r#"log_level = "debug""#).unwrap();

    let config = info_config(tmp.path(), &sub_dir, &[]);
    assert_eq!(config["log_level"], "debug");
}

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(parent.join(".semfuse.toml"), "[fusion]\ndeadline_ms = 7\n").unwrap();

    let config = info_config(tmp.path(), &src, &[]);
    assert_eq!(config["deadline_ms"], 30_000);
}

// =============================================================================
// Config Formats & Sections
// =============================================================================

#[test]
fn parses_yaml_weights() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.yaml"),
        "fusion:\n  weights:\n    commit: 0.9\n    rule_based: 0.05\n",
    )
    .unwrap();

    let config = info_config(tmp.path(), tmp.path(), &[]);
    assert_eq!(config["weights"]["commit"], 0.9);
    assert_eq!(config["weights"]["rule_based"], 0.05);
    // Unset weights keep their defaults
    assert_eq!(config["weights"]["ai"], 0.3);
}

#[test]
fn parses_json_cache_section() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.json"),
        r#"{"cache": {"ttl_secs": 60, "capacity": 10}}"#,
    )
    .unwrap();

    let config = info_config(tmp.path(), tmp.path(), &[]);
    assert_eq!(config["cache"]["ttl_secs"], 60);
    assert_eq!(config["cache"]["capacity"], 10);
    assert_eq!(config["cache"]["sweep_threshold"], 100);
}

#[test]
fn explicit_config_flag_is_loaded() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("custom.toml");
    fs::write(&file, "[ai]\ncommand = \"cat /dev/null\"\n").unwrap();

    let output = cmd(tmp.path())
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--config",
            file.to_str().unwrap(),
            "info",
            "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["config"]["ai_command"], "cat /dev/null");
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .args(["--config", "/nowhere/semfuse.toml", "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn env_override_beats_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.toml"),
        "[fusion]\ndeadline_ms = 1500\n",
    )
    .unwrap();

    let config = info_config(
        tmp.path(),
        tmp.path(),
        &[("SEMFUSE_FUSION__DEADLINE_MS", "250")],
    );
    assert_eq!(config["deadline_ms"], 250);
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.toml"),
        "log_level = \"warn\"\nunknown_field = \"ignored\"\n",
    )
    .unwrap();

    let config = info_config(tmp.path(), tmp.path(), &[]);
    assert_eq!(config["log_level"], "warn");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".semfuse.toml"), "this is not valid toml [[[").unwrap();

    cmd(tmp.path())
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn wrongly_typed_weight_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.toml"),
        "[fusion.weights]\ncommit = \"heavy\"\n",
    )
    .unwrap();

    cmd(tmp.path())
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn negative_weight_is_a_warning_not_an_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".semfuse.toml"),
        "[fusion.weights]\ncode = -1.0\n",
    )
    .unwrap();

    let output = cmd(tmp.path())
        .args(["-C", tmp.path().to_str().unwrap(), "doctor", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let warnings = json["config"]["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap().contains("fusion.weights.code")));
}
