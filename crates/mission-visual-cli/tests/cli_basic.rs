//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify its JSON output.

use std::path::Path;
use std::process::Command;

use chrono::{Duration, Utc};
use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_mission-visual"))
        .args(args)
        .env("MISSION_VISUAL_DATA_DIR", data_dir)
        .env("MISSION_VISUAL_USER", "tester")
        .env_remove("MISSION_VISUAL_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn create(data_dir: &Path, title: &str, start: &str) -> Value {
    run_json(data_dir, &["challenge", "create", title, "--start", start])
}

fn day_id(challenge: &Value, number: usize) -> String {
    challenge["days"][number - 1]["id"].as_str().unwrap().to_string()
}

#[test]
fn test_config_list_and_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_json(dir.path(), &["config", "list"]);
    assert_eq!(config["timezone"], "UTC");
    assert_eq!(config["notifications"]["capacity"], 50);

    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timezone", "Asia/Tokyo"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timezone"]);
    assert_eq!(stdout.trim(), "Asia/Tokyo");

    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "timezone", "Mars/Base"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_challenge_create_and_complete_day() {
    let dir = tempfile::tempdir().unwrap();
    let challenge = create(dir.path(), "Read", "2030-01-01T09:00:00Z");
    let id = challenge["id"].as_str().unwrap().to_string();
    assert_eq!(challenge["status"], "active");
    assert_eq!(challenge["total_days"], 30);
    assert_eq!(challenge["days"].as_array().unwrap().len(), 30);

    let list = run_json(dir.path(), &["challenge", "list", "--status", "active"]);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &["day", "complete", &id, "1", "--note", "done", "--attachment", "a.png"],
    );
    assert_eq!(code, 0, "{stderr}");
    let updated: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(updated["days"][0]["status"], "completed");
    assert_eq!(updated["days"][0]["note"], "done");
    assert!(stderr.contains("Day 1 Completed!"));

    let progress = run_json(dir.path(), &["challenge", "progress", &id]);
    assert_eq!(progress["completed"], 1);
    assert_eq!(progress["pending"], 29);

    let (_, _, code) = run_cli(dir.path(), &["day", "complete", &id, "1"]);
    assert_ne!(code, 0);
}

#[test]
fn test_missed_day_compensation_flow() {
    let dir = tempfile::tempdir().unwrap();
    let start = (Utc::now() - Duration::days(3)).to_rfc3339();
    let challenge = create(dir.path(), "Run", &start);
    let id = challenge["id"].as_str().unwrap().to_string();

    let checked = run_json(dir.path(), &["day", "check", &id]);
    let missed = checked["missed_days"].as_array().unwrap().len();
    assert!(missed >= 3, "expected at least 3 missed days, got {missed}");
    assert_eq!(checked["days"][0]["status"], "missed");
    assert_eq!(checked["status"], "active");

    let extended = run_json(dir.path(), &["makeup", "add", &id, "--count", "1"]);
    assert_eq!(extended["total_days"], 31);
    let makeup = day_id(&extended, 31);
    assert_eq!(extended["days"][30]["is_extension_day"], true);

    let (stdout, stderr, code) = run_cli(dir.path(), &["makeup", "compensate", &id, &makeup]);
    assert_eq!(code, 0, "{stderr}");
    let compensated: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(compensated["days"][0]["status"], "compensated");
    assert_eq!(compensated["days"][0]["compensates_day"], makeup.as_str());
    assert_eq!(compensated["missed_days"].as_array().unwrap().len(), missed - 1);
    assert!(stderr.contains("Make-up Day Completed!"));
}

#[test]
fn test_restart_and_fail() {
    let dir = tempfile::tempdir().unwrap();
    let first = create(dir.path(), "Write", "2030-01-01T09:00:00Z");
    let first_id = first["id"].as_str().unwrap().to_string();

    let fresh = run_json(dir.path(), &["challenge", "restart", &first_id]);
    assert_ne!(fresh["id"], first["id"]);
    assert_eq!(fresh["title"], "Write");

    let archived = run_json(dir.path(), &["challenge", "show", &first_id]);
    assert_eq!(archived["status"], "archived");

    let fresh_id = fresh["id"].as_str().unwrap().to_string();
    let failed = run_json(dir.path(), &["challenge", "fail", &fresh_id]);
    assert_eq!(failed["status"], "failed");

    let (_, _, code) = run_cli(dir.path(), &["challenge", "fail", &fresh_id]);
    assert_ne!(code, 0);
}

#[test]
fn test_session_init_reports_missed_days() {
    let dir = tempfile::tempdir().unwrap();
    create(dir.path(), "Stretch", "2020-03-01T09:00:00Z");

    let events = run_json(dir.path(), &["session", "init"]);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 30);
    assert!(events.iter().all(|e| e["type"] == "DayMissed"));

    let again = run_json(dir.path(), &["session", "init"]);
    assert!(again.as_array().unwrap().is_empty());
}

#[test]
fn test_overdue_day_cannot_be_completed() {
    let dir = tempfile::tempdir().unwrap();
    let challenge = create(dir.path(), "Swim", "2020-01-01T09:00:00Z");
    let id = challenge["id"].as_str().unwrap().to_string();

    let (stdout, stderr, code) = run_cli(dir.path(), &["day", "complete", &id, "1"]);
    assert_ne!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("cannot move from missed to completed"), "{stderr}");

    let shown = run_json(dir.path(), &["challenge", "show", &id]);
    assert_eq!(shown["days"][0]["status"], "missed");
    assert_eq!(shown["missed_days"].as_array().unwrap().len(), 30);
}

#[test]
fn test_timezone_is_kept_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let alice = run_json(dir.path(), &["--user", "alice", "settings", "timezone", "Asia/Tokyo"]);
    assert_eq!(alice["user_id"], "alice");
    assert_eq!(alice["timezone"], "Asia/Tokyo");

    let bob = run_json(dir.path(), &["--user", "bob", "settings", "show"]);
    assert_eq!(bob["timezone"], "UTC");

    let alice = run_json(dir.path(), &["--user", "alice", "settings", "show"]);
    assert_eq!(alice["timezone"], "Asia/Tokyo");

    let (_, _, code) = run_cli(dir.path(), &["--user", "bob", "settings", "timezone", "Mars/Base"]);
    assert_ne!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timezone"]);
    assert_eq!(stdout.trim(), "UTC");
}

#[test]
fn test_other_user_cannot_see_challenge() {
    let dir = tempfile::tempdir().unwrap();
    let challenge = create(dir.path(), "Read", "2030-01-01T09:00:00Z");
    let id = challenge["id"].as_str().unwrap();

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "intruder", "challenge", "show", id]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));

    let list = run_json(dir.path(), &["--user", "intruder", "challenge", "list"]);
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_invalid_command() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["nonexistent"]);
    assert_ne!(code, 0);
}
