//! Update transactions driven through the library API.

use crate::common::{installed_1_0_0, release_1_2_0, serve_release};
use keepup_cli::core::{KeepupError, find_kind, root_kind};
use keepup_cli::test_utils::{ArchiveEntry, ProjectFixture, build_archive, init_test_logging};
use keepup_cli::update::{
    Confirmation, TransactionOutcome, TransactionState, UpdateTransaction, notify_check,
};

#[tokio::test]
async fn test_update_preserves_critical_files() {
    init_test_logging(None);
    let mut server = mockito::Server::new_async().await;
    serve_release(&mut server, "v1.2.0", release_1_2_0()).await;
    let project = installed_1_0_0(&server);

    let outcome = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap();

    let TransactionOutcome::Committed(summary) = outcome else {
        panic!("expected a committed update, got {outcome:?}");
    };
    assert_eq!(summary.from.to_string(), "1.0.0");
    assert_eq!(summary.to.to_string(), "1.2.0");
    assert_eq!(summary.files.skipped_critical, vec!["config.json"]);
    assert_eq!(summary.files.skipped_reserved, vec![".gitignore"]);

    assert_eq!(project.read("app.bin"), "app 1.2.0");
    assert_eq!(project.read("config.json"), r#"{"theme": "user choice"}"#);
    assert_eq!(project.read("notes.txt"), "local only");
    assert!(!project.path(".gitignore").exists());
    assert!(!project.path(".backup").exists());
    assert!(!project.path(".update").exists());
}

#[tokio::test]
async fn test_equal_version_skips_every_phase() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(r#"{{"tag_name": "v1.0.0", "zipball_url": "{}/archive.zip"}}"#, server.url());
    server.mock("GET", "/latest").with_body(body).create_async().await;
    let download = server.mock("GET", "/archive.zip").expect(0).create_async().await;
    let project = installed_1_0_0(&server);

    let outcome = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap();

    assert!(matches!(outcome, TransactionOutcome::UpToDate { .. }));
    download.assert_async().await;
    assert_eq!(project.read("app.bin"), "app 1.0.0");
    assert!(!project.path(".backup").exists());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_not_an_error() {
    let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:1/latest", &[]);

    let outcome = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap();

    assert!(matches!(outcome, TransactionOutcome::CheckUnavailable { .. }));
}

#[tokio::test]
async fn test_two_root_archive_is_rejected_and_rolled_back() {
    let mut server = mockito::Server::new_async().await;
    let archive = build_archive(&[
        ArchiveEntry::file("repo-1.2.0/app.bin", b"app 1.2.0"),
        ArchiveEntry::file("docs/README.md", b"readme"),
    ]);
    serve_release(&mut server, "v1.2.0", archive).await;
    let project = installed_1_0_0(&server);

    let err = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap_err();

    assert!(matches!(
        find_kind(&err),
        Some(KeepupError::TransactionFailed {
            state: TransactionState::RolledBack,
            ..
        })
    ));
    assert!(matches!(root_kind(&err), Some(KeepupError::StructuralError { .. })));
    assert_eq!(project.read("app.bin"), "app 1.0.0");
    assert_eq!(project.read("config.json"), r#"{"theme": "user choice"}"#);
    assert!(!project.path("docs").exists());
    assert!(!project.path(".update").exists());
}

#[tokio::test]
async fn test_failed_download_leaves_tree_untouched() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(r#"{{"tag_name": "v2.0", "zipball_url": "{}/archive.zip"}}"#, server.url());
    server.mock("GET", "/latest").with_body(body).create_async().await;
    server.mock("GET", "/archive.zip").with_status(503).create_async().await;
    let project = installed_1_0_0(&server);

    let err = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap_err();

    assert!(matches!(
        find_kind(&err),
        Some(KeepupError::TransactionFailed {
            phase: TransactionState::Downloading,
            state: TransactionState::Failed,
            rollback: None,
            ..
        })
    ));
    assert!(root_kind(&err).is_some_and(KeepupError::is_network));
    assert_eq!(project.read("app.bin"), "app 1.0.0");
    assert!(!project.path(".backup").exists());
}

#[tokio::test]
async fn test_missing_descriptor_is_config_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = keepup_cli::config::UpdaterConfig::with_defaults(temp.path()).unwrap();

    let err = UpdateTransaction::open(config).err().unwrap();
    assert!(find_kind(&err).is_some_and(KeepupError::is_config));
}

#[tokio::test]
async fn test_notifier_reports_newer_release() {
    let mut server = mockito::Server::new_async().await;
    serve_release(&mut server, "v1.2.0", release_1_2_0()).await;
    let project = installed_1_0_0(&server);

    let release = notify_check(&project.config()).await.unwrap();
    assert_eq!(release.tag, "v1.2.0");
    assert_eq!(project.read("app.bin"), "app 1.0.0");
}

#[tokio::test]
async fn test_custom_settings_relocate_transient_dirs() {
    let mut server = mockito::Server::new_async().await;
    serve_release(&mut server, "v1.2.0", release_1_2_0()).await;
    let project = installed_1_0_0(&server);
    project.write(
        "keepup.toml",
        "staging_dir = \"var/staging\"\nbackup_dir = \"var/backup\"\nstrict_rollback = false\n",
    );

    let outcome = UpdateTransaction::open(project.config())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap();

    assert!(matches!(outcome, TransactionOutcome::Committed(_)));
    assert_eq!(project.read("app.bin"), "app 1.2.0");
    assert!(!project.path("var/staging").exists());
    assert!(!project.path("var/backup").exists());
}
