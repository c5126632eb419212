//! Integration tests for a complete feedback session
#![cfg(unix)]

use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use feedback_app::config::{load_project_config, PROJECT_CONFIG_FILENAME};
use feedback_app::{FeedbackHistory, SessionController, SessionOptions, SessionState};
use feedback_core::{FeedbackResult, LogLevel};
use user_feedback::write_result;

/// Helper to create a project with a saved run command
fn create_project(run_command: &str, execute_automatically: bool) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(PROJECT_CONFIG_FILENAME),
        format!(
            r#"{{
  "run_command": "{}",
  "execute_automatically": {}
}}"#,
            run_command, execute_automatically
        ),
    )
    .unwrap();
    temp
}

async fn run_to_exit(session: &mut SessionController) {
    timeout(Duration::from_secs(10), session.wait_for_exit())
        .await
        .expect("command did not exit in time");
}

#[tokio::test]
async fn test_configured_command_runs_and_result_is_written() {
    let project = create_project("echo building; echo 'error: missing semicolon' >&2", true);
    let config = load_project_config(project.path());
    let command = config.auto_start_command().expect("auto start configured");

    let mut session = SessionController::new(SessionOptions::new(project.path()));
    session.start(command).unwrap();
    run_to_exit(&mut session).await;
    assert_eq!(session.state(), SessionState::Idle);

    let store = session.store();
    assert_eq!(store.lines()[0].raw(), format!("$ {}", command));
    assert!(store.lines().iter().any(|l| l.raw() == "building"));
    let error_line = store
        .lines()
        .iter()
        .find(|l| l.raw() == "error: missing semicolon")
        .expect("stderr captured");
    assert_eq!(error_line.level(), LogLevel::Error);
    assert!(store
        .lines()
        .iter()
        .any(|l| l.raw() == "Process exited with code 0"));

    let result = session.submit("  please fix the error  ").unwrap();
    assert_eq!(result.user_feedback, "please fix the error");
    assert!(result.logs.starts_with(&format!("$ {}\n", command)));

    let output = project.path().join("out").join("result.json");
    write_result(&output, &result).unwrap();
    let written: FeedbackResult =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, result);
}

#[tokio::test]
async fn test_manual_start_is_not_configured_for_auto_run() {
    let project = create_project("echo hi", false);
    let config = load_project_config(project.path());

    assert_eq!(config.run_command, "echo hi");
    assert!(config.auto_start_command().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_while_running_still_produces_result() {
    let project = create_project("echo started; sleep 30", false);
    let config = load_project_config(project.path());

    let mut session = SessionController::new(SessionOptions::new(project.path()));
    session.start(&config.run_command).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !session.store().lines().iter().any(|l| l.raw() == "started") {
        assert!(tokio::time::Instant::now() < deadline, "no output seen");
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.tick();
    }

    let result = session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_running());
    assert_eq!(result.user_feedback, "");
    assert!(result.logs.contains("started\n"));
}

#[tokio::test]
async fn test_history_survives_reload() {
    let project = TempDir::new().unwrap();

    let mut history = FeedbackHistory::load(project.path());
    assert!(history.record("first", "prompt one").unwrap());
    assert!(history.record("second", "prompt two").unwrap());
    assert!(!history.record("   ", "ignored").unwrap());

    let reloaded = FeedbackHistory::load(project.path());
    let recent: Vec<_> = reloaded.recent(5).map(|e| e.feedback.as_str()).collect();
    assert_eq!(recent, vec!["second", "first"]);
}
