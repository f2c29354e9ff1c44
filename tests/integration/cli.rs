//! The `keepup` binary: output and exit status.

use crate::common::{installed_1_0_0, release_1_2_0, serve_release_blocking};
use assert_cmd::Command;
use keepup_cli::test_utils::{ArchiveEntry, ProjectFixture, build_archive};
use predicates::prelude::*;

fn keepup(project: &ProjectFixture) -> Command {
    let mut cmd = Command::cargo_bin("keepup").unwrap();
    cmd.arg("--project-dir")
        .arg(project.root())
        .env("KEEPUP_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_update_yes_installs_release() {
    let mut server = mockito::Server::new();
    serve_release_blocking(&mut server, "v1.2.0", release_1_2_0());
    let project = installed_1_0_0(&server);

    keepup(&project)
        .args(["update", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available: 1.0.0 -> 1.2.0"))
        .stdout(predicate::str::contains("Updated 1.0.0 -> 1.2.0"))
        .stdout(predicate::str::contains("critical file(s) kept: config.json"));

    assert_eq!(project.read("app.bin"), "app 1.2.0");
    assert_eq!(project.read("config.json"), r#"{"theme": "user choice"}"#);
    assert!(!project.path(".backup").exists());
}

#[test]
fn test_update_without_terminal_declines() {
    let mut server = mockito::Server::new();
    serve_release_blocking(&mut server, "v1.2.0", release_1_2_0());
    let project = installed_1_0_0(&server);

    keepup(&project)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("pass --yes"))
        .stdout(predicate::str::contains("declined"));

    assert_eq!(project.read("app.bin"), "app 1.0.0");
}

#[test]
fn test_update_on_latest_version() {
    let mut server = mockito::Server::new();
    serve_release_blocking(&mut server, "1.0", release_1_2_0());
    let project = installed_1_0_0(&server);

    keepup(&project)
        .args(["update", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You are on the latest version (1.0.0)"));
}

#[test]
fn test_failed_update_exits_nonzero_and_reports_rollback() {
    let mut server = mockito::Server::new();
    let archive = build_archive(&[ArchiveEntry::file("loose-file.txt", b"no root directory")]);
    serve_release_blocking(&mut server, "v1.2.0", archive);
    let project = installed_1_0_0(&server);

    keepup(&project)
        .args(["update", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("rolled back"))
        .stderr(predicate::str::contains("Update failed while applying"))
        .stderr(predicate::str::contains("Rollback complete"));

    assert_eq!(project.read("app.bin"), "app 1.0.0");
}

#[test]
fn test_update_without_descriptor_is_config_error() {
    let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:1/latest", &[]);
    std::fs::remove_file(project.path("version.json")).unwrap();

    keepup(&project)
        .args(["update", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("version.json"));
}

#[test]
fn test_check_reports_newer_release() {
    let mut server = mockito::Server::new();
    serve_release_blocking(&mut server, "v1.2.0", release_1_2_0());
    let project = installed_1_0_0(&server);

    keepup(&project)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version 1.2.0 is available"));
}

#[test]
fn test_check_never_fails() {
    let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:1/latest", &[]);

    keepup(&project)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No update available"));

    std::fs::write(project.path("version.json"), "{ not json").unwrap();
    keepup(&project).arg("check").assert().success();
}

#[test]
fn test_rollback_restores_leftover_backup() {
    let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:1/latest", &["config.json"]);
    project.write("config.json", "half-written");
    project.write(".backup/config.json", "original");

    keepup(&project)
        .arg("rollback")
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 critical file(s)"));

    assert_eq!(project.read("config.json"), "original");
    assert!(!project.path(".backup").exists());
}

#[test]
fn test_rollback_without_backup_fails() {
    let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:1/latest", &[]);

    keepup(&project)
        .arg("rollback")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backup found"));
}
