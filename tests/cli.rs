// ABOUTME: Integration tests for the deckhand CLI commands.
// ABOUTME: Runs the binary against temporary machines with their own deckhand.yml.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn deckhand_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("deckhand"))
}

/// A temp directory with a deckhand.yml pointing every location inside it.
fn machine() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().display();
    let yaml = format!(
        "journal: {root}/journal/DeploymentJournal.json\n\
         lock_directory: {root}/locks\n\
         applications_directory: {root}/apps\n\
         package_cache: {root}/cache\n"
    );
    fs::write(dir.path().join("deckhand.yml"), yaml).unwrap();
    dir
}

fn write_package(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    for (file, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(file).unwrap();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, contents.as_bytes()).unwrap();
    }
    builder.finish().unwrap();
    path
}

fn write_variables(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("variables.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn help_shows_commands() {
    deckhand_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy-package"))
        .stdout(predicate::str::contains("run-script"))
        .stdout(predicate::str::contains("apply-retention"));
}

#[test]
fn deploy_package_extracts_and_journals() {
    let m = machine();
    let package = write_package(m.path(), "Acme.Web.1.0.0.tar", &[("index.html", "<html/>")]);
    let vars = write_variables(m.path(), r#"{"Deckhand.RetentionPolicySet": "set-1"}"#);

    deckhand_cmd()
        .current_dir(m.path())
        .arg("deploy-package")
        .arg("--package")
        .arg(&package)
        .arg("--variables")
        .arg(&vars)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployed"));

    assert!(m.path().join("apps/Acme.Web/1.0.0/index.html").is_file());
    let journal = fs::read_to_string(m.path().join("journal/DeploymentJournal.json")).unwrap();
    assert!(journal.contains("\"packageId\": \"Acme.Web\""));
    assert!(journal.contains("\"retentionPolicySet\": \"set-1\""));
}

#[test]
fn deploy_package_reports_missing_package() {
    let m = machine();
    deckhand_cmd()
        .current_dir(m.path())
        .args(["deploy-package", "--package", "Missing.1.0.0.tar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package file not found"));
}

#[test]
fn failing_script_exits_non_zero() {
    let m = machine();
    let package = write_package(
        m.path(),
        "Acme.Web.2.0.0.tar",
        &[("index.html", "<html/>"), ("Deploy.sh", "exit 4\n")],
    );

    deckhand_cmd()
        .current_dir(m.path())
        .arg("deploy-package")
        .arg("--package")
        .arg(&package)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("exited with code 4"))
        .stderr(predicate::str::contains("Some(").not());
}

#[test]
fn run_script_executes_with_variables_in_environment() {
    let m = machine();
    let marker = m.path().join("greeting.txt");
    let script = m.path().join("greet.sh");
    fs::write(
        &script,
        format!("echo \"$DECKHAND_GREETING\" > '{}'\n", marker.display()),
    )
    .unwrap();
    let vars = write_variables(m.path(), r#"{"Greeting": "ahoy"}"#);

    deckhand_cmd()
        .current_dir(m.path())
        .arg("run-script")
        .arg("--script")
        .arg(&script)
        .arg("--variables")
        .arg(&vars)
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    assert_eq!(fs::read_to_string(&marker).unwrap().trim(), "ahoy");
    assert!(!m.path().join("journal/DeploymentJournal.json").exists());
}

#[test]
fn run_script_rejects_unsupported_extension() {
    let m = machine();
    let script = m.path().join("step.ps1");
    fs::write(&script, "Write-Host hi").unwrap();

    deckhand_cmd()
        .current_dir(m.path())
        .arg("run-script")
        .arg("--script")
        .arg(&script)
        .assert()
        .failure();
}

#[test]
fn apply_retention_purges_old_releases() {
    let m = machine();
    for version in ["1.0.0", "1.0.1", "1.0.2"] {
        let package = write_package(
            m.path(),
            &format!("Acme.Web.{version}.tar"),
            &[("index.html", version)],
        );
        let vars = write_variables(m.path(), r#"{"Deckhand.RetentionPolicySet": "set-1"}"#);
        deckhand_cmd()
            .current_dir(m.path())
            .arg("deploy-package")
            .arg("--package")
            .arg(&package)
            .arg("--variables")
            .arg(&vars)
            .assert()
            .success();
    }

    deckhand_cmd()
        .current_dir(m.path())
        .args(["apply-retention", "--policy-set", "set-1", "--releases", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purged 1 release(s), kept 2"));

    assert!(!m.path().join("apps/Acme.Web/1.0.0").exists());
    assert!(!m.path().join("Acme.Web.1.0.0.tar").exists());
    assert!(m.path().join("apps/Acme.Web/1.0.1").exists());
    assert!(m.path().join("apps/Acme.Web/1.0.2").exists());
}

#[test]
fn apply_retention_without_journal_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("deckhand.yml"), "").unwrap();

    deckhand_cmd()
        .current_dir(dir.path())
        .args(["apply-retention", "--policy-set", "set-1", "--days", "30"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No deployment journal is configured"));
}

#[test]
fn days_and_releases_are_mutually_exclusive() {
    deckhand_cmd()
        .args([
            "apply-retention",
            "--policy-set",
            "set-1",
            "--days",
            "30",
            "--releases",
            "3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn json_mode_prints_events() {
    let m = machine();
    deckhand_cmd()
        .current_dir(m.path())
        .args(["--json", "apply-retention", "--policy-set", "set-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"success""#));
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    deckhand_cmd()
        .current_dir(dir.path())
        .args([
            "--config",
            "missing.yml",
            "apply-retention",
            "--policy-set",
            "set-1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}
