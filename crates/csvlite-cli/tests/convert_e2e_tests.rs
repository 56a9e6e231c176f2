//! End-to-end tests for the csvlite binary
//!
//! These tests run the built binary against files in a temporary directory:
//! - Conversion with a types file, a default type and environment defaults
//! - Text and JSON output
//! - Reruns, dry runs and exit codes

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SALES: &str = "\
name,price,paid,qty
widget,$4.23,TRUE,3
gadget,\"1,250.00\",false
gizmo,cheap,true,2
\"doohickey, large\",7,FALSE,
";

const TYPES: &str = "\
default: TEXT
columns:
  price: REAL
  paid: BOOLEAN
  qty: INTEGER
";

fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("sales.csv"), SALES).unwrap();
    std::fs::write(temp.path().join("types.yml"), TYPES).unwrap();
    temp
}

/// Binary with a non-terminal stdin and no inherited configuration
fn csvlite(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("csvlite").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("CSVLITE_TARGET_DIR")
        .env_remove("CSVLITE_DEFAULT_TYPE")
        .env_remove("CSVLITE_LOG_LEVEL")
        .write_stdin("");
    cmd
}

// ============================================================================
// Conversion Tests
// ============================================================================

#[test]
fn test_convert_with_types_file() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "types.yml", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded table 'sales' (4 columns)"))
        .stdout(predicate::str::contains("Received: 4"))
        .stdout(predicate::str::contains("Inserted: 2"))
        .stdout(predicate::str::contains("Failed:   2"))
        .stdout(predicate::str::contains("line 3: "));

    let out = temp.path().join("out");
    assert!(out.join("sales.db").is_file());
    assert_eq!(
        std::fs::read_to_string(out.join("sales-bad.csv")).unwrap(),
        "gadget,\"1,250.00\",false\ngizmo,cheap,true,2\n"
    );
    assert_eq!(
        std::fs::read_to_string(out.join("sales.log")).unwrap(),
        "Number of records received: 4\n\
         Number of records successfully inserted: 2\n\
         Number of records failed: 2\n"
    );
}

#[test]
fn test_rerun_skips_existing_table() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "types.yml"])
        .assert()
        .success();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--default-type", "TEXT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    assert_eq!(
        std::fs::read_to_string(temp.path().join("sales-bad.csv")).unwrap(),
        "gadget,\"1,250.00\",false\ngizmo,cheap,true,2\n"
    );
}

#[test]
fn test_convert_json_output() {
    let temp = setup();

    let output = csvlite(temp.path())
        .args(["convert", "sales.csv", "--default-type", "text", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["table"], "sales");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["stats"]["received"], 4);
    assert_eq!(report["stats"]["accepted"], 3);
    assert_eq!(report["stats"]["rejected"], 1);
    assert_eq!(report["columns"][0]["declared_type"], "TEXT");
}

#[test]
fn test_target_dir_from_environment() {
    let temp = setup();

    csvlite(temp.path())
        .env("CSVLITE_TARGET_DIR", "tables")
        .env("CSVLITE_DEFAULT_TYPE", "TEXT")
        .args(["convert", "sales.csv"])
        .assert()
        .success();

    assert!(temp.path().join("tables").join("sales.db").is_file());
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "types.yml", "--dry-run", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checked table 'sales'"))
        .stdout(predicate::str::contains("Dry run, no files written"));

    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_dry_run_after_load_reports_existing_table() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "types.yml"])
        .assert()
        .success();
    let stats = std::fs::read_to_string(temp.path().join("sales.log")).unwrap();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "types.yml", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"))
        .stdout(predicate::str::contains("Checked").not());

    assert_eq!(
        std::fs::read_to_string(temp.path().join("sales.log")).unwrap(),
        stats
    );
}

#[test]
fn test_strip_line_edges() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("flags.csv"), "name,ok\nwidget,true,\n gadget,TRUE \n").unwrap();

    csvlite(temp.path())
        .args(["convert", "flags.csv", "--default-type", "TEXT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted: 1"))
        .stdout(predicate::str::contains("Failed:   1"));

    csvlite(temp.path())
        .args(["convert", "flags.csv", "--default-type", "TEXT", "--strip-line-edges", "-o", "stripped"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted: 2"))
        .stdout(predicate::str::contains("Failed:   0"));
}

#[test]
fn test_undecodable_row_is_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("names.csv"), b"name\nalpha\ncaf\xE9\nbeta\n").unwrap();

    csvlite(temp.path())
        .args(["convert", "names.csv", "--default-type", "TEXT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted: 2"))
        .stdout(predicate::str::contains("line 3: line is not valid UTF-8"));

    assert!(temp.path().join("names.db").is_file());
}

#[test]
fn test_semicolon_delimiter() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("eu.csv"), "item;price\ntea;3.50\n").unwrap();

    csvlite(temp.path())
        .args(["convert", "eu.csv", "--default-type", "TEXT", "--delimiter", ";"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(2 columns)"))
        .stdout(predicate::str::contains("Inserted: 1"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_source() {
    let temp = TempDir::new().unwrap();

    csvlite(temp.path())
        .args(["convert", "missing.csv", "--default-type", "TEXT"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_no_types_without_terminal() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--default-type"));

    assert!(!temp.path().join("sales.db").exists());
}

#[test]
fn test_unmapped_column_fails() {
    let temp = setup();
    std::fs::write(temp.path().join("partial.yml"), "columns:\n  price: REAL\n").unwrap();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "partial.yml"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("no type configured for column 'name'"));
}

#[test]
fn test_invalid_types_file() {
    let temp = setup();
    std::fs::write(temp.path().join("bad.yml"), "columns:\n  price: DECIMAL\n").unwrap();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--types", "bad.yml"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid types file"));
}

#[test]
fn test_delimiter_equal_to_quote() {
    let temp = setup();

    csvlite(temp.path())
        .args(["convert", "sales.csv", "--default-type", "TEXT", "--delimiter", "\""])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_empty_source() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("empty.csv"), "").unwrap();

    csvlite(temp.path())
        .args(["convert", "empty.csv", "--default-type", "TEXT"])
        .assert()
        .failure()
        .code(2);
}

// ============================================================================
// Other Commands
// ============================================================================

#[test]
fn test_types_command() {
    let temp = TempDir::new().unwrap();

    csvlite(temp.path())
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("BINARY_IMAGE"))
        .stdout(predicate::str::contains("BLOB"));
}

#[test]
fn test_no_arguments_prints_help() {
    let temp = TempDir::new().unwrap();

    csvlite(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
