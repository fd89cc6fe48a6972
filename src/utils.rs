use std::fs::{self, DirBuilder};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Local file types the ingestion run knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "pdf" => Some(SourceKind::Pdf),
            "txt" => Some(SourceKind::Text),
            _ => None,
        }
    }
}

/// Creates a directory if it doesn't exist
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    DirBuilder::new().recursive(true).create(path)?;
    Ok(())
}

/// Lists the `.pdf` and `.txt` files directly inside `dir_path`, sorted by name.
///
/// Subdirectories are not descended into. A missing directory is a
/// `NotFound` error, so a mistyped path never produces an empty index.
pub fn source_files(dir_path: impl AsRef<Path>) -> Result<Vec<(PathBuf, SourceKind)>> {
    let dir_path = dir_path.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match SourceKind::from_path(&path) {
            Some(kind) => files.push((path, kind)),
            None => debug!("Skipping unsupported file {}", path.display()),
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
