use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_csvault")
}

fn run(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env("CSVAULT_DATA_DIR", data_dir)
        .env_remove("CSVAULT_CONFIG")
        .env_remove("CSVAULT_HISTORY_KEY")
        .env("RUST_LOG", "off")
        .output()
        .expect("csvault should run")
}

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("fixture should be written");
    path.to_string_lossy().into_owned()
}

fn history(data_dir: &Path) -> Vec<serde_json::Value> {
    let output = run(data_dir, &["history"]);
    assert_eq!(output.status.code(), Some(0));
    serde_json::from_slice(&output.stdout).expect("history should emit a json array")
}

#[test]
fn unknown_command_prints_usage() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let output = run(dir.path(), &["simulate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: csvault"));
}

#[test]
fn validate_reports_clean_and_broken_files() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let good = write_fixture(&dir, "good.csv", "name,price\ntea,2.5\ncoffee,3\n");
    let empty = write_fixture(&dir, "empty.csv", "name,price\n");

    let output = run(dir.path(), &["validate", good.as_str()]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("CSV file is valid"));

    let output = run(dir.path(), &["validate", empty.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Critical Issues:"));
    assert!(stdout.contains("- No data found in CSV file"));
}

#[test]
fn import_replaces_only_with_confirmation() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let first = write_fixture(&dir, "sales.csv", "item,amount\npen,2\n");

    let output = run(dir.path(), &["import", first.as_str()]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("import complete"));
    let original_id = history(dir.path())[0]["id"].clone();

    // stdin is closed, so the replace prompt reads as "no".
    let output = run(dir.path(), &["import", first.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("import cancelled"));
    assert_eq!(history(dir.path())[0]["id"], original_id);

    let output = run(dir.path(), &["import", first.as_str(), "--yes"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("(replaced)"));

    let entries = history(dir.path());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["filename"], "sales.csv");
    assert_ne!(entries[0]["id"], original_id);
}

#[test]
fn import_with_name_override_and_rejection() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let header_only = write_fixture(&dir, "blank.csv", "a,b\n");
    let good = write_fixture(&dir, "upload-1.csv", "a,b\n1,2\n");

    let output = run(dir.path(), &["import", header_only.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("import rejected"));
    assert!(history(dir.path()).is_empty());

    let output = run(dir.path(), &["import", "--name", "report.csv", good.as_str()]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(history(dir.path())[0]["filename"], "report.csv");
}

#[test]
fn import_rejects_non_csv_files() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let notes = write_fixture(&dir, "notes.txt", "a,b\n1,2\n");

    let output = run(dir.path(), &["import", notes.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Please upload a CSV file"));
}

#[test]
fn delete_and_clear_need_confirmation() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let a = write_fixture(&dir, "a.csv", "x\n1\n");
    let b = write_fixture(&dir, "b.csv", "x\n2\n");
    assert_eq!(run(dir.path(), &["import", a.as_str()]).status.code(), Some(0));
    assert_eq!(run(dir.path(), &["import", b.as_str()]).status.code(), Some(0));

    let output = run(dir.path(), &["delete", "does-not-exist", "--yes"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no dataset with id"));

    let id = history(dir.path())[0]["id"]
        .as_str()
        .expect("id should be a string")
        .to_string();
    let output = run(dir.path(), &["delete", id.as_str()]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("delete cancelled"));
    assert_eq!(history(dir.path()).len(), 2);

    let output = run(dir.path(), &["delete", id.as_str(), "--yes"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("deleted 'a.csv'"));
    let remaining = history(dir.path());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["filename"], "b.csv");

    let output = run(dir.path(), &["clear", "--yes"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("history cleared"));
    assert!(history(dir.path()).is_empty());
    assert!(!dir.path().join("usage_history.json").exists());
}
