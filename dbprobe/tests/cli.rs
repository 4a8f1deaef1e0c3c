//! Command-line behaviour of the dbprobe binary.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn properties_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write properties");
    file
}

fn dbprobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbprobe"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("DBPROBE_ECHO")
        .env_remove("DBPROBE_STRICT")
        .output()
        .expect("run dbprobe")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_no_arguments_is_usage_error() {
    let output = dbprobe(&[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_two_arguments_is_usage_error() {
    let output = dbprobe(&["a.properties", "b.properties"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unreadable_file_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("nope.properties");
    let output = dbprobe(&[missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("Failed to read properties file"));
}

#[test]
fn test_missing_url_is_fatal_without_timing_lines() {
    let file = properties_file("user=scott\nquery=SELECT 1\n");
    let output = dbprobe(&[file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert_eq!(out, "user: scott\nquery: SELECT 1\n");
    assert!(stderr(&output).contains("missing url property"));
}

#[test]
fn test_unknown_scheme_is_fatal() {
    let file = properties_file("url=jdbc:db2://host:50000/sample\nquery=SELECT 1\n");
    let output = dbprobe(&[file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("Connection established took"));
    assert!(stderr(&output).contains("No driver available for 'db2'"));
}

#[cfg(feature = "sqlite")]
#[test]
fn test_sqlite_probe_echoes_then_reports() {
    let file = properties_file("url=sqlite::memory:\nuser=scott\npassword=tiger\nquery=SELECT 1\n");
    let output = dbprobe(&[file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 7, "{out}");
    assert_eq!(
        lines[..4],
        [
            "url: sqlite::memory:",
            "user: scott",
            "password: tiger",
            "query: SELECT 1",
        ]
    );
    assert!(lines[4].starts_with("Connection established took : "));
    assert!(lines[5].starts_with("Executed statement took : "));
    assert_eq!(lines[6], "1");
}

#[cfg(feature = "sqlite")]
#[test]
fn test_echo_redacted_masks_password() {
    let file = properties_file("url=sqlite::memory:\npassword=tiger\nquery=SELECT 1\n");
    let output = dbprobe(&["--echo", "redacted", file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("password: ****"));
    assert!(!out.contains("tiger"));
}

#[cfg(feature = "sqlite")]
#[test]
fn test_echo_off_prints_only_report() {
    let file = properties_file("url=sqlite::memory:\nquery=SELECT 'ok'\n");
    let output = dbprobe(&["--echo", "off", file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert_eq!(out.lines().count(), 3, "{out}");
    assert_eq!(out.lines().last(), Some("ok"));
}

#[cfg(feature = "sqlite")]
#[test]
fn test_diagnosability_traces_to_stderr_and_keeps_stdout() {
    let file = properties_file("url=sqlite::memory:\nquery=SELECT 1\ndiagnosability=true\n");
    let output = dbprobe(&[file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6, "{out}");
    assert_eq!(
        lines[..3],
        [
            "url: sqlite::memory:",
            "query: SELECT 1",
            "diagnosability: true",
        ]
    );
    assert!(lines[3].starts_with("Connection established took : "));
    assert!(lines[4].starts_with("Executed statement took : "));
    assert_eq!(lines[5], "1");

    let err = stderr(&output);
    let statement_trace = regex::Regex::new(
        r"(?m)^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3} TRACE sqlx::query: .+\.rs:\d+: ",
    )
    .unwrap();
    assert!(statement_trace.is_match(&err), "{err}");
    assert!(err.contains("SELECT 1"), "{err}");
    assert!(!err.contains('\u{1b}'), "{err}");
}

#[cfg(feature = "postgresql")]
#[test]
fn test_connection_failure_is_swallowed() {
    let file = properties_file("url=jdbc:postgresql://127.0.0.1:1/app\nuser=u\npassword=p\nquery=SELECT 1\n");
    let output = dbprobe(&[file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!stdout(&output).contains("took"));
    assert!(stderr(&output).contains("Connect step failed"));
}

#[cfg(feature = "postgresql")]
#[test]
fn test_strict_turns_connection_failure_into_exit_one() {
    let file = properties_file("url=jdbc:postgresql://127.0.0.1:1/app\nquery=SELECT 1\n");
    let output = dbprobe(&["--strict", file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Connect step failed"));
}
