//! Shared helpers for the integration suite.

use keepup_cli::test_utils::{ArchiveEntry, ProjectFixture, build_archive};
use mockito::ServerGuard;

/// The release used by most scenarios: `config.json` and `app.bin` under a
/// single `repo-1.2.0/` root.
pub fn release_1_2_0() -> Vec<u8> {
    build_archive(&[
        ArchiveEntry::dir("repo-1.2.0/"),
        ArchiveEntry::file("repo-1.2.0/config.json", br#"{"theme": "release default"}"#),
        ArchiveEntry::file("repo-1.2.0/app.bin", b"app 1.2.0"),
        ArchiveEntry::file("repo-1.2.0/.gitignore", b"*.log\n"),
    ])
}

fn release_json(server: &ServerGuard, tag: &str) -> String {
    format!(r#"{{"tag_name": "{tag}", "zipball_url": "{}/archive.zip"}}"#, server.url())
}

/// Serves `/latest` with `tag` and `/archive.zip` with `archive`.
pub async fn serve_release(server: &mut ServerGuard, tag: &str, archive: Vec<u8>) {
    let body = release_json(server, tag);
    server
        .mock("GET", "/latest")
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    server.mock("GET", "/archive.zip").with_body(archive).create_async().await;
}

/// Blocking variant of [`serve_release`] for tests that run the binary.
pub fn serve_release_blocking(server: &mut ServerGuard, tag: &str, archive: Vec<u8>) {
    let body = release_json(server, tag);
    server
        .mock("GET", "/latest")
        .with_header("content-type", "application/json")
        .with_body(body)
        .create();
    server.mock("GET", "/archive.zip").with_body(archive).create();
}

/// An installation at 1.0.0 with a user-edited `config.json`.
pub fn installed_1_0_0(server: &ServerGuard) -> ProjectFixture {
    let project =
        ProjectFixture::new("1.0.0", &format!("{}/latest", server.url()), &["config.json"]);
    project.write("config.json", r#"{"theme": "user choice"}"#);
    project.write("app.bin", "app 1.0.0");
    project.write("notes.txt", "local only");
    project
}
