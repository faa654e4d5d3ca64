//! File records: one file's identity and metadata.

use crate::error::{Result, SortError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot of a single file's identity and metadata.
///
/// `path` always holds the file's current believed location. Actions update
/// it in place after they succeed, so later rules in the same pass see where
/// the file actually is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// File name without extension.
    pub name: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    pub created_at: DateTime<Local>,
    pub modified_at: DateTime<Local>,
}

impl FileRecord {
    /// Reads metadata for the file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SortError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(SortError::FileNotFound(path.to_path_buf()));
        }

        let modified = metadata.modified()?;
        // Not every filesystem tracks birth time.
        let created = metadata.created().unwrap_or(modified);
        let (name, extension) = split_file_name(path);

        Ok(Self {
            name,
            extension,
            path: std::path::absolute(path)?,
            size: metadata.len(),
            created_at: DateTime::<Local>::from(created),
            modified_at: DateTime::<Local>::from(modified),
        })
    }

    /// Returns the full file name (`name` + `extension`).
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }

    /// Returns the directory currently containing the file.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Points the record at a new location, keeping name and extension in sync.
    pub fn relocate(&mut self, path: PathBuf) {
        let (name, extension) = split_file_name(&path);
        self.name = name;
        self.extension = extension;
        self.path = path;
    }
}

/// Splits a path's file name into stem and dotted extension.
pub(crate) fn split_file_name(path: &Path) -> (String, String) {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (name, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.final.pdf");
        fs::write(&path, b"twelve bytes").unwrap();

        let record = FileRecord::from_path(&path).unwrap();

        assert_eq!(record.name, "report.final");
        assert_eq!(record.extension, ".pdf");
        assert_eq!(record.size, 12);
        assert_eq!(record.file_name(), "report.final.pdf");
        assert!(record.path.is_absolute());
        assert!(record.created_at <= Local::now());
    }

    #[test]
    fn test_from_path_without_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, b"all:").unwrap();

        let record = FileRecord::from_path(&path).unwrap();

        assert_eq!(record.name, "Makefile");
        assert_eq!(record.extension, "");
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileRecord::from_path(dir.path().join("nope.txt")).unwrap_err();

        assert!(matches!(err, SortError::FileNotFound(_)));
    }

    #[test]
    fn test_relocate_updates_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"x").unwrap();

        let mut record = FileRecord::from_path(&path).unwrap();
        record.relocate(dir.path().join("b.jpeg"));

        assert_eq!(record.name, "b");
        assert_eq!(record.extension, ".jpeg");
        assert_eq!(record.parent(), Some(dir.path()));
    }
}
