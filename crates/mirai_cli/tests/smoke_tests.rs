//! CLI smoke tests: basic binary behavior without a backend.

use std::process::Command;

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mirai"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--settings-dir"));
    assert!(stdout.contains("--mute"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mirai"), "Expected binary name in --version output");
}

#[test]
fn test_missing_api_key_exits_with_error() {
    let dir = std::env::temp_dir().join(format!("mirai-smoke-{}", std::process::id()));
    let output = cli_bin()
        .arg("--settings-dir")
        .arg(&dir)
        .arg("--mute")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("LLM_PROVIDER")
        .env_remove("MIRAI_CONFIG")
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"), "stderr was: {}", stderr);
    let _ = std::fs::remove_dir_all(&dir);
}
