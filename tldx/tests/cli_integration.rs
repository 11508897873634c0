// tldx/tests/cli_integration.rs
//
// Offline behaviour only: help text, preset listing, dry-run composition
// and argument validation.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

/// A `tldx` command isolated from the user's config files and environment.
fn tldx(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tldx").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("TLDX_CONFIG")
        .env_remove("TLDX_TLDS")
        .env_remove("TLDX_PREFIXES")
        .env_remove("TLDX_SUFFIXES")
        .env_remove("TLDX_PRESET")
        .env_remove("TLDX_MAX_DOMAIN_LENGTH")
        .env_remove("TLDX_LOG");
    cmd
}

fn create_keywords_file(lines: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), lines.join("\n")).expect("Failed to write to temp file");
    file
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tld-preset"))
        .stdout(predicate::str::contains("--max-domain-length"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--backoff-factor"))
        .stdout(predicate::str::contains("show-tld-presets"));
}

#[test]
fn test_show_tld_presets() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .arg("show-tld-presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("TLD Presets:"))
        .stdout(predicate::str::contains("popular"))
        .stdout(predicate::str::contains("tech"));
}

#[test]
fn test_show_tld_presets_includes_custom() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("tldx.toml"),
        "[custom_presets]\nmyshop = [\"shop\", \"store\"]\n",
    )
    .unwrap();

    tldx(&home)
        .arg("show-tld-presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("myshop"))
        .stdout(predicate::str::contains("shop store"));
}

#[test]
fn test_dry_run_composes_candidates() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["rocket", "-t", "io,dev", "-p", "get", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rocket.io"))
        .stdout(predicate::str::contains("getrocket.dev"))
        .stderr(predicate::str::contains("4 domains would be checked"));
}

#[test]
fn test_dry_run_json() {
    let home = TempDir::new().unwrap();
    let output = tldx(&home)
        .args(["rocket", "-t", "io", "--dry-run", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let domains: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(domains, vec!["rocket.io"]);
}

#[test]
fn test_full_domain_keyword_keeps_its_tld() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["google.co.uk", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("google.co.uk"));
}

#[test]
fn test_keywords_from_file() {
    let home = TempDir::new().unwrap();
    let file = create_keywords_file(&["# ideas", "alpha", "", "beta"]);

    tldx(&home)
        .args(["-i", file.path().to_str().unwrap(), "-t", "com", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha.com"))
        .stdout(predicate::str::contains("beta.com"))
        .stdout(predicate::str::contains("ideas").not())
        .stderr(predicate::str::contains("2 domains would be checked"));
}

#[test]
fn test_regex_pattern_dry_run() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["go[ab]{2}", "-r", "-t", "com", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("goaa.com"))
        .stdout(predicate::str::contains("gobb.com"))
        .stderr(predicate::str::contains("4 domains would be checked"));
}

#[test]
fn test_max_length_filters_candidates() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["app", "-s", "lication", "-t", "com", "-m", "8", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.com"))
        .stdout(predicate::str::contains("application.com").not());
}

#[test]
fn test_missing_keywords_fails() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one keyword"));
}

#[test]
fn test_zero_max_length_fails() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["rocket", "-m", "0", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max-domain-length"));
}

#[test]
fn test_excessive_concurrency_fails() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["rocket", "-c", "5000", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_unknown_format_fails() {
    let home = TempDir::new().unwrap();
    tldx(&home)
        .args(["rocket", "-f", "yaml"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    fs::write(&config, "[defaults]\nconcurrency = 5000\n").unwrap();

    tldx(&home)
        .args(["rocket", "--dry-run", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
