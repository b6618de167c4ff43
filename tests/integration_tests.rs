//! Integration tests for the TIR CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd. Every
//! command runs the default resolver, so nothing waits on a terminal.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a tir command isolated from the user's config and environment
fn tir(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tir").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("config"))
        .env("TIR_AUTHOR", "tester")
        .env_remove("TIR_CONFIG")
        .env_remove("TIR_DATABASE")
        .env_remove("TIR_RESOLVER")
        .env_remove("RUST_LOG")
        .args(["--resolver", "default"]);
    cmd
}

/// Helper to create an initialized store in a temp directory
fn setup_store() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tir(&tmp).arg("init").assert().success();
    tmp
}

/// Helper to resolve a name and return the entity ID
fn resolve_id(tmp: &TempDir, args: &[&str]) -> String {
    let output = tir(tmp)
        .args(["--format", "id", "resolve"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "resolve {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write_manifest(dir: &Path, name: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn test_init_creates_store() {
    let tmp = TempDir::new().unwrap();
    tir(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized entity store"));
    assert!(tmp.path().join("tir.db").exists());
}

#[test]
fn test_init_twice_reports_existing_store() {
    let tmp = setup_store();
    tir(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_database_from_environment() {
    let tmp = TempDir::new().unwrap();
    tir(&tmp)
        .env("TIR_DATABASE", tmp.path().join("data/tracks.db"))
        .arg("init")
        .assert()
        .success();
    assert!(tmp.path().join("data/tracks.db").exists());
    assert!(!tmp.path().join("tir.db").exists());
}

// ============================================================================
// Resolve
// ============================================================================

#[test]
fn test_resolve_creates_then_reuses() {
    let tmp = setup_store();

    tir(&tmp)
        .args(["resolve", "platform", "HMS Foo", "--nationality", "UK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PLT-"))
        .stdout(predicate::str::contains("HMS Foo"));

    let first = resolve_id(&tmp, &["platform", "HMS Foo"]);
    let second = resolve_id(&tmp, &["platform", "  HMS   Foo "]);
    assert_eq!(first, second);

    tir(&tmp)
        .args(["--format", "tsv", "list", "nationality"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UK"));
}

#[test]
fn test_case_differing_name_is_a_distinct_platform() {
    let tmp = setup_store();

    let upper = resolve_id(&tmp, &["platform", "HMS FOO"]);
    let lower = resolve_id(&tmp, &["nationality", "uk"]);
    let reused = resolve_id(&tmp, &["nationality", "UK"]);
    // Reference data folds to the single case-insensitive match
    assert_eq!(lower, reused);

    let output = tir(&tmp)
        .args(["--format", "id", "list", "platform"])
        .output()
        .unwrap();
    let ids = String::from_utf8_lossy(&output.stdout);
    assert_eq!(ids.lines().count(), 1);
    assert!(ids.contains(&upper));
}

#[test]
fn test_nameless_resolve_uses_default_name() {
    let tmp = setup_store();
    tir(&tmp)
        .args(["resolve", "privacy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PRIVACY-1"));
}

#[test]
fn test_platform_listing_shows_defaults() {
    let tmp = setup_store();
    resolve_id(&tmp, &["platform", "Nelson", "--pennant", "28"]);

    tir(&tmp)
        .args(["--format", "tsv", "list", "platform"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nelson\tNel\tNels\t28\tUK\tWarship\tPRIVACY-1"));
}

#[test]
fn test_resolve_rejects_unknown_kind() {
    let tmp = setup_store();
    tir(&tmp)
        .args(["resolve", "submarine", "HMS Foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("submarine"));
}

// ============================================================================
// Synonyms
// ============================================================================

#[test]
fn test_synonym_resolves_to_canonical_entity() {
    let tmp = setup_store();
    let uk = resolve_id(&tmp, &["nationality", "United Kingdom"]);

    tir(&tmp)
        .args(["synonym", "add", "nationality", "GB", "United Kingdom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added to synonyms"));

    assert_eq!(resolve_id(&tmp, &["nationality", "GB"]), uk);

    tir(&tmp)
        .args(["--format", "tsv", "synonym", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GB\tUnited Kingdom"));
}

#[test]
fn test_synonym_for_unknown_entity_fails() {
    let tmp = setup_store();
    tir(&tmp)
        .args(["synonym", "add", "nationality", "GB", "United Kingdom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no nationality named 'United Kingdom'"));
}

#[test]
fn test_synonym_equal_to_canonical_name_fails() {
    let tmp = setup_store();
    resolve_id(&tmp, &["nationality", "UK"]);
    tir(&tmp)
        .args(["synonym", "add", "nationality", "UK", "UK"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot record 'UK'"));
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_import_directory_one_unit_per_file() {
    let tmp = setup_store();
    let data = tmp.path().join("data");
    write_manifest(
        &data,
        "a.csv",
        "kind,name,nationality,platform_type\n\
         platform,HMS Foo,UK,Frigate\n\
         sensor,GPS,,\n",
    );
    write_manifest(&data, "b.csv", "kind,name\nplatform,HMS Foo\ndatafile,track.rep\n");
    write_manifest(&data.join("nested"), "c.csv", "kind,name\nplatform,HMS Bar\n");

    tir(&tmp)
        .args(["import", "data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files imported:   2"))
        .stdout(predicate::str::contains("Rows resolved:    4"));

    // Without --descend the nested manifest is untouched
    let output = tir(&tmp)
        .args(["--format", "tsv", "list", "platform"])
        .output()
        .unwrap();
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(listing.contains("HMS Foo"));
    assert!(!listing.contains("HMS Bar"));
    assert!(listing.contains("Frigate"));

    tir(&tmp)
        .args(["import", "data", "--descend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files imported:   3"));

    tir(&tmp)
        .args(["--format", "tsv", "list", "platform"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HMS Bar"));
}

#[test]
fn test_import_records_one_change_per_file() {
    let tmp = setup_store();
    write_manifest(tmp.path(), "a.csv", "kind,name\nprivacy,Public\n");
    write_manifest(tmp.path(), "b.csv", "kind,name\nprivacy,Secret\n");

    tir(&tmp).args(["import", "."]).assert().success();

    tir(&tmp)
        .args(["--format", "tsv", "changes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.csv"))
        .stdout(predicate::str::contains("b.csv"))
        .stdout(predicate::str::contains("tester"));
}

#[test]
fn test_import_bad_manifest_fails_without_writes() {
    let tmp = setup_store();
    write_manifest(tmp.path(), "bad.csv", "kind,name\nsubmarine,HMS Foo\n");

    tir(&tmp)
        .args(["import", "bad.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"));

    tir(&tmp)
        .args(["--format", "id", "changes"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_import_missing_path_fails() {
    let tmp = setup_store();
    tir(&tmp)
        .args(["import", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

// ============================================================================
// Status, config, completions
// ============================================================================

#[test]
fn test_status_json_counts() {
    let tmp = setup_store();
    resolve_id(&tmp, &["sensor", "GPS"]);

    let output = tir(&tmp)
        .args(["--format", "json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["entities"]["sensor"], 1);
    assert_eq!(status["entities"]["sensor-type"], 1);
    assert_eq!(status["entities"]["privacy"], 1);
    assert_eq!(status["changes"], 1);
    assert_eq!(status["synonyms"], 0);
}

#[test]
fn test_config_show_reflects_overrides() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("tir.yaml");
    fs::write(&config, "defaults:\n  privacy: Public\n").unwrap();

    tir(&tmp)
        .env("TIR_CONFIG", &config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resolver: default"))
        .stdout(predicate::str::contains("privacy: Public"))
        .stdout(predicate::str::contains("author: tester"));
}

#[test]
fn test_configured_default_name_is_used() {
    let tmp = setup_store();
    let config = tmp.path().join("tir.yaml");
    fs::write(&config, "defaults:\n  privacy: Public\n").unwrap();

    tir(&tmp)
        .env("TIR_CONFIG", &config)
        .args(["resolve", "privacy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Public"));
}

#[test]
fn test_missing_config_override_fails() {
    let tmp = TempDir::new().unwrap();
    tir(&tmp)
        .env("TIR_CONFIG", tmp.path().join("missing.yaml"))
        .args(["config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    tir(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tir"));
}
