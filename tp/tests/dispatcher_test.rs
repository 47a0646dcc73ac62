//! Integration tests for the tool dispatcher
//!
//! These drive `ToolExecutor::dispatch` end to end against real processes
//! and a real filesystem, the way an orchestration loop would.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use termpilot::config::Config;
use termpilot::shell::Session;
use termpilot::tools::{ToolContext, ToolExecutor};
use tempfile::TempDir;

fn setup() -> (TempDir, ToolExecutor, ToolContext) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let session = Session::new(temp_dir.path()).expect("Failed to create session");
    let ctx = ToolContext::new(session);
    (temp_dir, ToolExecutor::standard(), ctx)
}

fn canonical(path: &Path) -> String {
    path.canonicalize().unwrap().display().to_string()
}

// =============================================================================
// Working directory
// =============================================================================

#[tokio::test]
async fn test_pwd_after_cd_tmp() {
    let (_temp, executor, mut ctx) = setup();

    let cd = executor.dispatch("run_command", "cd /tmp", &mut ctx).await;
    assert!(!cd.is_error, "cd failed: {}", cd.content);

    let pwd = executor.dispatch("run_command", "pwd", &mut ctx).await;
    assert!(!pwd.is_error);
    let tmp = canonical(Path::new("/tmp"));
    assert!(pwd.content.contains(&format!("Working directory: {}", tmp)));
    assert!(pwd.content.contains(&format!("Output:\n{}", tmp)));
}

#[tokio::test]
async fn test_cd_nonexistent_leaves_directory() {
    let (temp, executor, mut ctx) = setup();

    let result = executor.dispatch("run_command", "cd /no/such/dir", &mut ctx).await;
    assert!(result.is_error);
    assert!(result.content.contains("no such file or directory"));

    let pwd = executor.dispatch("get_current_directory", "", &mut ctx).await;
    assert_eq!(pwd.content, format!("Current working directory: {}", canonical(temp.path())));
}

#[tokio::test]
async fn test_change_directory_tool_and_relative_listing() {
    let (temp, executor, mut ctx) = setup();
    fs::create_dir_all(temp.path().join("a/b")).unwrap();
    fs::write(temp.path().join("a/b/file.txt"), "x").unwrap();

    let cd = executor.dispatch("change_directory", "a", &mut ctx).await;
    assert!(!cd.is_error);

    let listing = executor.dispatch("list_directory", "b", &mut ctx).await;
    assert!(!listing.is_error);
    assert!(listing.content.contains("file.txt"));

    let up = executor.dispatch("change_directory", "..", &mut ctx).await;
    assert!(!up.is_error);
    assert_eq!(ctx.working_directory(), temp.path().canonicalize().unwrap());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (temp_a, executor, mut ctx_a) = setup();
    let (temp_b, _, mut ctx_b) = setup();
    fs::create_dir(temp_a.path().join("only_a")).unwrap();

    let cd = executor.dispatch("change_directory", "only_a", &mut ctx_a).await;
    assert!(!cd.is_error);

    let pwd_b = executor.dispatch("get_current_directory", "", &mut ctx_b).await;
    assert!(pwd_b.content.ends_with(&canonical(temp_b.path())));
}

// =============================================================================
// Command execution
// =============================================================================

#[tokio::test]
async fn test_echo_and_false() {
    let (_temp, executor, mut ctx) = setup();

    let echo = executor.dispatch("run_command", "echo hello", &mut ctx).await;
    assert!(!echo.is_error);
    assert!(echo.content.contains("hello"));

    let fail = executor.dispatch("run_command", "false", &mut ctx).await;
    assert!(fail.is_error);
    assert!(fail.content.contains("Failed (exit code 1)"));
}

#[tokio::test]
async fn test_timeout_leaves_no_child() {
    let (temp, executor, ctx) = setup();
    let mut config = Config::default();
    config.command.timeout_ms = 500;
    let mut ctx = ctx.with_commands(termpilot::shell::CommandExecutor::from_config(&config));

    let result = executor
        .dispatch("run_command", "sleep 1000; touch marker", &mut ctx)
        .await;
    assert!(result.is_error);
    assert!(result.content.contains("timed out"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!temp.path().join("marker").exists());
}

#[tokio::test]
async fn test_privileged_without_credential_is_fast() {
    let (temp, executor, mut ctx) = setup();
    let started = Instant::now();

    let result = executor.dispatch("run_command", "sudo touch marker", &mut ctx).await;

    assert!(result.is_error);
    assert!(result.content.contains("credential unavailable"));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!temp.path().join("marker").exists());
}

#[tokio::test]
async fn test_privileged_keyword_from_config_with_credential() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("secret.txt"), "hunter2\n").unwrap();

    // `env` stands in for the privileged keyword: no prompt, runs the rest
    let mut config = Config::default();
    config.privileged.keyword = "env".to_string();
    config.privileged.credential_file = "secret.txt".into();
    config.privileged.password_timeout_ms = 500;
    config.privileged.confirmation_timeout_ms = 2_000;
    config.privileged.timeout_ms = 10_000;

    let session = Session::new(temp_dir.path()).unwrap();
    let mut ctx = ToolContext::from_config(&config, session, temp_dir.path()).unwrap();
    let executor = ToolExecutor::standard();

    let result = executor.dispatch("run_command", "env echo elevated", &mut ctx).await;
    assert!(!result.is_error, "unexpected failure: {}", result.content);
    assert!(result.content.contains("elevated"));
    assert!(!result.content.contains("hunter2"));
}

#[tokio::test]
async fn test_empty_command() {
    let (_temp, executor, mut ctx) = setup();
    let result = executor.dispatch("run_command", "   ", &mut ctx).await;
    assert!(result.is_error);
    assert_eq!(result.content, "Error: Empty command provided");
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_empty_vs_missing_vs_populated() {
    let (temp, executor, mut ctx) = setup();
    fs::create_dir(temp.path().join("empty")).unwrap();
    fs::create_dir(temp.path().join("full")).unwrap();
    fs::write(temp.path().join("full/B"), "").unwrap();
    fs::write(temp.path().join("full/a"), "").unwrap();
    fs::create_dir(temp.path().join("full/C")).unwrap();

    let empty = executor.dispatch("list_directory", "empty", &mut ctx).await;
    assert!(!empty.is_error);
    assert!(empty.content.ends_with("is empty."));

    let missing = executor.dispatch("list_directory", "missing", &mut ctx).await;
    assert!(missing.is_error);

    let full = executor.dispatch("list_directory", "full", &mut ctx).await;
    assert!(!full.is_error);
    let lines: Vec<&str> = full.content.lines().skip(1).collect();
    assert_eq!(lines, vec!["B", "C/", "a"]);
}

// =============================================================================
// Dispatcher
// =============================================================================

#[tokio::test]
async fn test_unknown_tool() {
    let (_temp, executor, mut ctx) = setup();
    let result = executor.dispatch("rm_rf", "/", &mut ctx).await;
    assert!(result.is_error);
    assert_eq!(result.content, "Unknown tool: rm_rf");
}

#[tokio::test]
async fn test_calculator_and_system_tools() {
    let (_temp, executor, mut ctx) = setup();

    let calc = executor.dispatch("calculator", "(2 + 3) * 4", &mut ctx).await;
    assert_eq!(calc.into_envelope(), ("Result: 20".to_string(), true));

    let detect = executor.dispatch("detect_system", "", &mut ctx).await;
    assert!(!detect.is_error);
    assert!(!detect.content.is_empty());

    let info = executor.dispatch("get_system_info", "", &mut ctx).await;
    assert!(info.content.starts_with("System: "));
}
