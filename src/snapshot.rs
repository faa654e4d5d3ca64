//! In-memory folder snapshots produced by a depth-bounded directory scan.

use crate::error::{Result, SortError};
use crate::record::FileRecord;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default number of directory levels read by [`FolderSnapshot::scan`].
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// A child of a folder: either a file or a nested folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    File(FileRecord),
    Folder(FolderSnapshot),
}

/// A tree of file records and nested folders.
///
/// Only the node passed to [`FolderSnapshot::scan`] as the scan root may be
/// marked as a target root; every descendant is created as non-root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSnapshot {
    pub name: String,
    pub path: PathBuf,
    pub is_target_root: bool,
    pub children: Vec<Node>,
}

impl FolderSnapshot {
    /// Creates an empty snapshot node for `path`.
    pub fn new(path: impl Into<PathBuf>, is_target_root: bool) -> Self {
        let path = path.into();
        Self {
            name: folder_name(&path),
            path,
            is_target_root,
            children: Vec::new(),
        }
    }

    /// Scans `path` into a snapshot, reading at most `max_depth` levels.
    ///
    /// Folders at the depth limit are kept as empty nodes. Entries that cannot
    /// be read (permissions, races with deletion) are skipped, not fatal.
    pub fn scan(path: impl AsRef<Path>, is_target_root: bool, max_depth: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(SortError::FileNotFound(path.to_path_buf()));
        }
        let root = std::path::absolute(path)?;
        Ok(Self::scan_level(&root, is_target_root, 0, max_depth))
    }

    fn scan_level(path: &Path, is_target_root: bool, depth: usize, max_depth: usize) -> Self {
        let mut folder = Self::new(path, is_target_root);

        let entries = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                let child = if depth + 1 < max_depth {
                    Self::scan_level(entry.path(), false, depth + 1, max_depth)
                } else {
                    Self::new(entry.path(), false)
                };
                folder.children.push(Node::Folder(child));
            } else if file_type.is_file() {
                match FileRecord::from_path(entry.path()) {
                    Ok(record) => folder.children.push(Node::File(record)),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                    }
                }
            }
        }

        folder
    }

    /// Returns every file in the tree, depth first, in child order.
    pub fn files(&self) -> Vec<&FileRecord> {
        let mut files = Vec::new();
        self.collect_files(&mut files);
        files
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileRecord>) {
        for child in &self.children {
            match child {
                Node::File(file) => out.push(file),
                Node::Folder(folder) => folder.collect_files(out),
            }
        }
    }

    /// Returns the number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::File(_) => 1,
                Node::Folder(folder) => folder.file_count(),
            })
            .sum()
    }

    /// Renders the tree as an indented listing.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, level: usize) {
        let indent = "  ".repeat(level);
        let _ = writeln!(out, "{}- {}/ (target={})", indent, self.name, self.is_target_root);
        for child in &self.children {
            match child {
                Node::Folder(folder) => folder.write_tree(out, level + 1),
                Node::File(file) => {
                    let _ = writeln!(
                        out,
                        "{}- {} ({}B)",
                        "  ".repeat(level + 1),
                        file.file_name(),
                        file.size
                    );
                }
            }
        }
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
