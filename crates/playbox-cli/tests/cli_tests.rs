//! Integration tests for playbox-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use playbox_core::test_utils::ZipBuilder;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

fn playbox_cmd() -> Command {
    cargo_bin_cmd!("playbox")
}

fn write_archive(dir: &Path, name: &str, bytes: Vec<u8>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("failed to write archive");
    path
}

fn toolchain_zip() -> Vec<u8> {
    ZipBuilder::new()
        .deflated()
        .add_directory("bin/")
        .add_file_with_mode("bin/go", b"#!/bin/sh\necho go\n", 0o755)
        .add_file("VERSION", b"go1.22.0\n")
        .build()
}

#[test]
fn test_version_flag() {
    playbox_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("playbox"));
}

#[test]
fn test_help_flag() {
    playbox_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bootstrap"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_bootstrap_help() {
    playbox_cmd()
        .args(["bootstrap", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unpack a toolchain zip archive"));
}

#[test]
fn test_bootstrap_creates_files() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(temp.path(), "go.zip", toolchain_zip());
    let out = temp.path().join("go");

    playbox_cmd()
        .arg("bootstrap")
        .arg(&archive)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Unpacked"))
        .stdout(predicate::str::contains("VERSION"));

    assert_eq!(fs::read(out.join("VERSION")).unwrap(), b"go1.22.0\n");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(out.join("bin/go")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_bootstrap_json_output() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(temp.path(), "go.zip", toolchain_zip());

    let output = playbox_cmd()
        .arg("--json")
        .arg("bootstrap")
        .arg(&archive)
        .arg(temp.path().join("go"))
        .output()
        .expect("failed to run");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["operation"], "bootstrap");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["files_extracted"], 2);
    assert_eq!(json["data"]["top_level_entries"][0], "VERSION");
    assert_eq!(json["data"]["top_level_entries"][1], "bin");
}

#[test]
fn test_bootstrap_rejects_traversal() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(
        temp.path(),
        "evil.zip",
        ZipBuilder::new()
            .add_file("ok.txt", b"fine")
            .add_file("../escaped.txt", b"pwned")
            .build(),
    );
    let out = temp.path().join("out");

    playbox_cmd()
        .arg("bootstrap")
        .arg(&archive)
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("path traversal"))
        .stderr(predicate::str::contains("HINT"));

    assert!(!temp.path().join("escaped.txt").exists());
}

#[test]
fn test_bootstrap_quota_hint() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(temp.path(), "go.zip", toolchain_zip());

    playbox_cmd()
        .arg("bootstrap")
        .arg(&archive)
        .arg(temp.path().join("go"))
        .args(["--max-files", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-files"));
}

#[test]
fn test_bootstrap_nonexistent_archive() {
    let temp = TempDir::new().expect("failed to create temp dir");

    playbox_cmd()
        .arg("bootstrap")
        .arg(temp.path().join("missing.zip"))
        .arg(temp.path().join("go"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.zip"));
}

#[test]
fn test_bootstrap_not_a_zip() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(temp.path(), "junk.zip", b"not a zip at all".to_vec());

    playbox_cmd()
        .arg("bootstrap")
        .arg(&archive)
        .arg(temp.path().join("go"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid archive"));
}

#[test]
fn test_completion_bash() {
    playbox_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("playbox"));
}

#[test]
fn test_missing_config_file() {
    let temp = TempDir::new().expect("failed to create temp dir");

    playbox_cmd()
        .current_dir(temp.path())
        .args(["--config", "nope.toml", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[cfg(unix)]
mod pipeline {
    use super::*;

    const CONFIG: &str = r#"
workspace_dir = "pg"
main_file = "main.go"

[init]
program = "true"

[build]
program = "sh"
args = ["-c", "echo compiling"]

[run]
program = "sh"
args = ["-c", "echo hello from run"]

[format]
program = "sh"
args = ["-c", "tr -s ' ' < main.go > fmt.tmp && mv fmt.tmp main.go"]
"#;

    fn workspace() -> TempDir {
        let temp = TempDir::new().expect("failed to create temp dir");
        fs::write(temp.path().join("playbox.toml"), CONFIG).unwrap();
        playbox_cmd()
            .current_dir(temp.path())
            .arg("init")
            .assert()
            .success();
        temp
    }

    #[test]
    fn test_init_writes_starter() {
        let temp = workspace();
        let main = fs::read_to_string(temp.path().join("pg/main.go")).unwrap();
        assert!(main.contains("package main"));
    }

    #[test]
    fn test_run_builds_first() {
        let temp = workspace();

        playbox_cmd()
            .current_dir(temp.path())
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("$ sh -c echo compiling"))
            .stdout(predicate::str::contains("compiling\n"))
            .stdout(predicate::str::contains("hello from run\n"));
    }

    #[test]
    fn test_failed_build_exit_code_and_no_run() {
        let temp = workspace();
        let config = CONFIG.replace(
            "args = [\"-c\", \"echo compiling\"]",
            "args = [\"-c\", \"echo 'main.go:4: undefined: y' >&2; exit 3\"]",
        );
        fs::write(temp.path().join("playbox.toml"), config).unwrap();

        playbox_cmd()
            .current_dir(temp.path())
            .arg("run")
            .assert()
            .failure()
            .code(3)
            .stdout(predicate::str::contains("hello from run").not())
            .stderr(predicate::str::contains("main.go:4: undefined: y"))
            .stderr(predicate::str::contains("Cannot run"));
    }

    #[test]
    fn test_run_json_captures_output() {
        let temp = workspace();

        let output = playbox_cmd()
            .current_dir(temp.path())
            .args(["run", "--json"])
            .output()
            .expect("failed to run");

        assert!(output.status.success());
        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
        assert_eq!(json["operation"], "run");
        assert_eq!(json["status"], "success");
        let stdout = json["data"]["stdout"].as_str().unwrap();
        assert!(stdout.contains("compiling\n"));
        assert!(stdout.ends_with("hello from run\n"));
    }

    #[test]
    fn test_edit_from_stdin_then_fmt() {
        let temp = workspace();

        playbox_cmd()
            .current_dir(temp.path())
            .arg("edit")
            .write_stdin("package    main\n")
            .assert()
            .success();
        assert_eq!(
            fs::read_to_string(temp.path().join("pg/main.go")).unwrap(),
            "package    main\n"
        );

        playbox_cmd()
            .current_dir(temp.path())
            .args(["--quiet", "fmt"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("package main\n"));
        assert_eq!(
            fs::read_to_string(temp.path().join("pg/main.go")).unwrap(),
            "package main\n"
        );
    }

    #[test]
    fn test_dir_flag_overrides_config() {
        let temp = workspace();

        playbox_cmd()
            .current_dir(temp.path())
            .args(["--dir", "other", "init"])
            .assert()
            .success();
        assert!(temp.path().join("other/main.go").is_file());
    }
}
