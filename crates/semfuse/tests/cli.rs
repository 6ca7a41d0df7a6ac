//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("SEMFUSE_LOG_DIR", std::env::temp_dir().join("semfuse-test-logs"));
    cmd
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("next"));
}

#[test]
fn long_help_lists_environment_variables() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SEMFUSE_LOG_PATH"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_subcommand_is_an_error() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn unknown_subcommand_is_an_error() {
    cmd()
        .arg("ship-it")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// =============================================================================
// Info & Doctor
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd().args(["info", "--json"]).assert().success();
    let json = json_stdout(output.get_output());
    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["analyzers"].as_array().unwrap().len(), 5);
}

#[test]
fn doctor_json_outputs_valid_json() {
    let tmp = TempDir::new().unwrap();
    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor", "--json"])
        .assert()
        .success();
    let json = json_stdout(output.get_output());
    assert!(json["git"]["available"].is_boolean());
    assert_eq!(json["config"]["found"], false);
}

#[test]
fn chdir_to_missing_directory_fails() {
    cmd()
        .args(["-C", "/definitely/not/here", "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to change directory"));
}

// =============================================================================
// Semver
// =============================================================================

#[test]
fn semver_compare_prints_ordering() {
    cmd()
        .args(["semver", "compare", "1.0.0-rc.1", "1.0.0"])
        .assert()
        .success()
        .stdout("-1\n");
    cmd()
        .args(["semver", "compare", "v2.0.0", "1.9.9"])
        .assert()
        .success()
        .stdout("1\n");
    cmd()
        .args(["semver", "compare", "1.0.0+a", "1.0.0+b"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn semver_bump_applies_level_and_prerelease() {
    cmd()
        .args(["semver", "bump", "1.2.3", "minor"])
        .assert()
        .success()
        .stdout("1.3.0\n");
    cmd()
        .args(["semver", "bump", "1.2.3-beta.1", "major", "--pre", "rc.1"])
        .assert()
        .success()
        .stdout("2.0.0-rc.1\n");
}

#[test]
fn semver_bump_rejects_unknown_level() {
    cmd()
        .args(["semver", "bump", "1.2.3", "huge"])
        .assert()
        .failure();
}

#[test]
fn semver_satisfies_reports_membership() {
    cmd()
        .args(["semver", "satisfies", "1.4.0", "^1.2.0"])
        .assert()
        .success()
        .stdout("true\n");
    cmd()
        .args(["semver", "satisfies", "2.0.0", "^1.2.0"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn semver_sort_orders_by_precedence() {
    cmd()
        .args(["semver", "sort", "1.10.0", "1.2.0", "1.2.0-alpha", "0.9.0"])
        .assert()
        .success()
        .stdout("0.9.0\n1.2.0-alpha\n1.2.0\n1.10.0\n");
    cmd()
        .args(["semver", "sort", "--desc", "1.0.0", "2.0.0"])
        .assert()
        .success()
        .stdout("2.0.0\n1.0.0\n");
}

#[test]
fn semver_invalid_version_fails() {
    cmd()
        .args(["semver", "compare", "one", "1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version"));
}

// =============================================================================
// Analyze & Next
// =============================================================================

#[test]
fn analyze_fix_commit_recommends_patch() {
    let tmp = TempDir::new().unwrap();
    let output = cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "analyze",
            "--no-git",
            "--commit",
            "fix: null pointer on login",
            "--json",
        ])
        .assert()
        .success();
    let json = json_stdout(output.get_output());
    assert_eq!(json["recommended"], "patch");
    assert_eq!(json["contributing"].as_object().unwrap().len(), 5);
    let factors = json["factors"].as_array().unwrap();
    assert!(factors.iter().any(|f| f == "fusion"));
}

#[test]
fn analyze_breaking_commit_recommends_major() {
    let tmp = TempDir::new().unwrap();
    let output = cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "analyze",
            "--no-git",
            "--commit",
            "feat!: remove legacy endpoints",
            "--json",
        ])
        .assert()
        .success();
    let json = json_stdout(output.get_output());
    assert_eq!(json["recommended"], "major");
}

#[test]
fn analyze_text_output_names_the_winner() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--color",
            "never",
            "analyze",
            "--no-git",
            "--commit",
            "feat: add CSV export",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recommended"))
        .stdout(predicate::str::contains("minor"))
        .stdout(predicate::str::contains("commit analysis selected minor"));
}

#[test]
fn next_dry_run_computes_version() {
    let tmp = TempDir::new().unwrap();
    let output = cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "next",
            "--no-git",
            "--current",
            "1.2.3",
            "--commit",
            "feat: x",
            "--dry-run",
            "--json",
        ])
        .assert()
        .success();
    let json = json_stdout(output.get_output());
    assert_eq!(json["previous"], "1.2.3");
    assert_eq!(json["next"], "1.3.0");
    assert_eq!(json["bump"], "minor");
    assert_eq!(json["dry_run"], true);
}

#[test]
fn next_dry_run_text_says_nothing_changed() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--color",
            "never",
            "next",
            "--no-git",
            "--current",
            "1.2.3",
            "--commit",
            "fix: y",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.3"))
        .stdout(predicate::str::contains("1.2.4"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn next_without_yes_refuses_non_interactive_tagging() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "next",
            "--no-git",
            "--commit",
            "fix: y",
        ])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn next_rejects_invalid_current_version() {
    cmd()
        .args(["next", "--no-git", "--current", "nope", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --current"));
}
