//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with `HOME` pointed at a temporary
//! directory, so config and state never touch the real profile.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusmunk"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("FOCUSMUNK_ENV")
        .env_remove("FOCUSMUNK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "server.url"]);
    assert_eq!(code, 0, "Config get failed");
    assert_eq!(stdout.trim(), "http://localhost:5000");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&home, &["config", "set", "sync.interval_secs", "30"]);
    assert_eq!(code, 0, "Config set failed");
    let (_, stdout, _) = run_cli(&home, &["config", "get", "sync.interval_secs"]);
    assert_eq!(stdout.trim(), "30");
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "set", "sync.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_config_list_is_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["gate"]["sweep_interval_secs"], 60);
}

#[test]
fn test_status_when_unpaired() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["status"]);
    assert_eq!(code, 0, "Status failed");
    assert!(stdout.starts_with("Not paired"));

    let (code, stdout, _) = run_cli(&home, &["status", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["configured"], false);
}

#[test]
fn test_check_unpaired_blocks() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["check", "https://example.com", "--json"]);
    assert_eq!(code, 0, "Check failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["decision"]["verdict"], "block");
    assert_eq!(parsed["decision"]["reason"], "unconfigured");
    assert!(parsed["redirect"]
        .as_str()
        .unwrap()
        .starts_with("chrome-extension://focusmunk/blocked.html?url="));
}

#[test]
fn test_check_special_page_allowed() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["check", "chrome://extensions"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "allow (specialPage)");
}

#[test]
fn test_free_time_requires_pairing() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["free-time", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not paired"));
}

#[test]
fn test_pair_with_unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    run_cli(&home, &["config", "set", "server.url", "http://127.0.0.1:1"]);
    let (code, _, stderr) = run_cli(&home, &["pair", "ABCD-1234"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));

    let (_, stdout, _) = run_cli(&home, &["status"]);
    assert!(stdout.starts_with("Not paired"));
}

#[test]
fn test_setup_with_unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    run_cli(&home, &["config", "set", "server.url", "http://127.0.0.1:1"]);
    let (code, _, stderr) = run_cli(
        &home,
        &["setup", "--setup-code", "code", "--password", "secret"],
    );
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));

    let (_, stdout, _) = run_cli(&home, &["status"]);
    assert!(stdout.starts_with("Not paired"));
}

#[test]
fn test_sync_when_unpaired_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["sync"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not paired"));
}
