use std::{
    path::PathBuf,
    process::{Command, Output, Stdio},
};

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn run_check(fixture: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hadesc"))
        .current_dir(root())
        .arg("check")
        .arg(format!("tests/fixtures/{fixture}/main.hds"))
        .env_remove("HADES_MAX_ERRORS")
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run hadesc check")
}

#[test]
fn well_typed_program_passes() {
    let output = run_check("ok");
    assert!(
        output.status.success(),
        "hadesc check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("No type errors found."));
}

#[test]
fn type_errors_are_rendered_and_fail() {
    let output = run_check("errors");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("match does not cover every case"), "{stderr}");
    assert!(stderr.contains("value is not mutable"), "{stderr}");
    assert!(stderr.contains("too many arguments: expected 1"), "{stderr}");
    assert!(stderr.contains("3 type error(s) found."), "{stderr}");
}

#[test]
fn error_limit_comes_from_the_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_hadesc"))
        .current_dir(root())
        .args(["check", "tests/fixtures/errors/main.hds"])
        .env("HADES_MAX_ERRORS", "1")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run hadesc check");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("3 type error(s) found, showing the first 1."), "{stderr}");
    assert!(stderr.contains("match does not cover every case"), "{stderr}");
    assert!(!stderr.contains("value is not mutable"), "{stderr}");
}

#[test]
fn syntax_errors_stop_before_checking() {
    let output = run_check("syntax");
    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("type error"));
}

#[test]
fn wrong_extension_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_hadesc"))
        .current_dir(root())
        .args(["check", "Cargo.toml"])
        .output()
        .expect("failed to run hadesc check");
    assert_eq!(output.status.code(), Some(2));
}
