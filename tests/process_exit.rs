//! Exit behaviour of a real process driven by the kernel.

use std::fs;
use std::path::Path;

mod common;

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_config(base: &Path, contents: &str) {
    fs::create_dir_all(base.join("config")).unwrap();
    fs::write(base.join("config").join("kernel.toml"), contents).unwrap();
}

#[test]
fn test_clean_exit_runs_shutdown_actions() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "hi\nshutdown complete\n");
    assert!(!stderr(&output).contains("***System error***"));
}

#[test]
fn test_panic_aborts_without_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &["--crash", "panic"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "hi\n");
    assert!(stderr(&output).contains("***System error***\ndemo panic requested"));
}

#[test]
fn test_panic_caught_by_host_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &["--crash", "recovered"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "hi\nrecovered: true\nshutdown complete\n");
    assert!(!stderr(&output).contains("***System error***"));
}

#[test]
fn test_escaped_error_aborts_without_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &["--crash", "error"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("shutdown complete"));
    assert!(stderr(&output).contains("***System error***\ndemo error requested"));
}

#[test]
fn test_severe_condition_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &["--crash", "condition"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("shutdown complete"));
    assert!(stderr(&output).contains("demo runtime error"));
}

#[test]
fn test_fatal_condition_detected_at_exit() {
    let dir = tempfile::tempdir().unwrap();
    let output = common::run_demo(dir.path(), &["--crash", "fatal"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "hi\n");
    let err = stderr(&output);
    assert!(err.contains("demo fatal condition"));
    assert!(err.contains("kind: fatal"));
}

#[test]
fn test_config_file_actions_and_json_render() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        r#"
        name = "demo"

        [failure]
        render_format = "json"
        exit_code = 3

        [[run]]
        type = "NamedDispatch"
        target_name = "greeter"
        method_name = "hello"
        "#,
    );

    let output = common::run_demo(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "hi\nhi\nshutdown complete\n");

    let output = common::run_demo(dir.path(), &["--crash", "error"]);
    assert_eq!(output.status.code(), Some(3));
    let line = stderr(&output);
    let record: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(record["message"], "demo error requested");
    assert_eq!(record["kind"], "recoverable");
}

#[test]
fn test_invalid_config_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "[[terminate]]\ntype = \"DirectCall\"\n");

    let output = common::run_demo(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("terminate[0]"));
}
