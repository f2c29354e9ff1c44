//! In-memory release archives.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// One entry of a test archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Option<Vec<u8>>,
    pub mode: Option<u32>,
}

impl ArchiveEntry {
    /// A regular file.
    pub fn file(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            content: Some(content.to_vec()),
            mode: None,
        }
    }

    /// A directory entry; `name` should end with `/`.
    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            content: None,
            mode: None,
        }
    }

    /// Sets Unix permission bits, e.g. `0o755`.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Builds a zip archive holding `entries`, in order.
///
/// # Panics
///
/// Panics if the zip writer fails, which only happens on invalid input.
pub fn build_archive(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        let mut options = SimpleFileOptions::default();
        if let Some(mode) = entry.mode {
            options = options.unix_permissions(mode);
        }
        match &entry.content {
            Some(content) => {
                writer.start_file(entry.name.as_str(), options).expect("start zip entry");
                writer.write_all(content).expect("write zip entry");
            }
            None => {
                writer.add_directory(entry.name.as_str(), options).expect("add zip directory");
            }
        }
    }

    writer.finish().expect("finish zip archive").into_inner()
}
