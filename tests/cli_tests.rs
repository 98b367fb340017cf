//! Tests for the `vsql` binary

use assert_cmd::Command;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Writes a database with one table and a config pointing at it
fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cli.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch(
            "CREATE TABLE items (id INTEGER, label TEXT);
             INSERT INTO items VALUES (1, 'one'), (2, 'two');",
        )
        .unwrap();

    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[connection]\nhost = \"localhost\"\ndatabase = \"{}\"\nuser = \"cli\"\npassword = \"secret\"\n\n[adapter]\ndefault_schema = \"main\"\n",
            db.display()
        ),
    )
    .unwrap();
    (dir, config)
}

#[test]
fn test_query_prints_json_lines() {
    let (_dir, config) = setup();
    let output = Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["SELECT", "id, label FROM items ORDER BY id"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        lines,
        vec![
            serde_json::json!({"id": 1, "label": "one"}),
            serde_json::json!({"id": 2, "label": "two"}),
        ]
    );
}

#[test]
fn test_describe() {
    let (_dir, config) = setup();
    Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["--describe", "items"])
        .assert()
        .success()
        .stdout("id\tINTEGER\nlabel\tTEXT\n");
}

#[test]
fn test_describe_hints_at_default_schema() {
    let (dir, config) = setup();
    let content = fs::read_to_string(&config).unwrap();
    let without_schema = dir.path().join("public.toml");
    fs::write(
        &without_schema,
        content.replace("[adapter]\ndefault_schema = \"main\"\n", ""),
    )
    .unwrap();

    let output = Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&without_schema)
        .args(["--describe", "items"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("default schema 'public'"), "{}", stderr);
    assert!(stderr.contains("default_schema"));

    Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&without_schema)
        .args(["--describe", "main.items"])
        .assert()
        .success()
        .stdout("id\tINTEGER\nlabel\tTEXT\n");
}

#[test]
fn test_ping() {
    let (_dir, config) = setup();
    Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--ping")
        .assert()
        .success()
        .stdout("ok\n");
}

#[test]
fn test_bad_sql_fails() {
    let (_dir, config) = setup();
    let output = Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("SELEC 1")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("SELEC 1"));
}

#[test]
fn test_incomplete_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[connection]\nhost = \"localhost\"\n").unwrap();

    let output = Command::cargo_bin("vsql")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("SELECT 1")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_action_prints_usage() {
    Command::cargo_bin("vsql")
        .unwrap()
        .assert()
        .code(2);
}
