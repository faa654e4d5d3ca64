//! Undo history and restore points.
//!
//! The [`UndoManager`] keeps a bounded stack of executed batches together
//! with the actions that reverse them, plus a single folder snapshot that can
//! be rolled back to. Both undo and rollback are best effort: each file is
//! handled on its own and failures are collected, never propagated.

use crate::action::{Action, ExecuteOutcome};
use crate::error::{Result, SortError};
use crate::record::FileRecord;
use crate::snapshot::FolderSnapshot;
use chrono::{DateTime, Local};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Number of batches kept by [`UndoManager::new`].
pub const MAX_UNDO: usize = 5;

/// One executed action together with what is needed to undo it.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    forward: Action,
    reverse: Option<Action>,
    file: FileRecord,
    original_path: PathBuf,
    result_path: PathBuf,
}

impl ActionRecord {
    /// Creates a record for `file` as it stands after the forward action ran.
    pub fn new(
        forward: Action,
        reverse: Option<Action>,
        file: FileRecord,
        original_path: impl Into<PathBuf>,
    ) -> Self {
        let result_path = file.path.clone();
        Self {
            forward,
            reverse,
            file,
            original_path: original_path.into(),
            result_path,
        }
    }

    pub fn forward_action(&self) -> &Action {
        &self.forward
    }

    /// The undoing action, absent for irreversible kinds.
    pub fn reverse_action(&self) -> Option<&Action> {
        self.reverse.as_ref()
    }

    pub fn file(&self) -> &FileRecord {
        &self.file
    }

    /// Where the file was before the forward action.
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Where the forward action put the file.
    pub fn result_path(&self) -> &Path {
        &self.result_path
    }
}

/// The records of one sorting run.
#[derive(Debug, Clone)]
pub struct UndoBatch {
    pub description: String,
    pub timestamp: DateTime<Local>,
    pub actions: Vec<ActionRecord>,
}

/// Result of [`UndoManager::undo_last`].
#[derive(Debug)]
pub enum UndoOutcome {
    NothingToUndo,
    Undone(UndoReport),
}

/// What an undo managed to revert.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub description: String,
    /// Paths the files were returned to.
    pub reverted: Vec<PathBuf>,
    /// Files that could not be reverted, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`UndoManager::rollback_to_restore_point`].
#[derive(Debug)]
pub enum RollbackOutcome {
    NoRestorePoint,
    RolledBack(RollbackReport),
}

/// What a rollback found and restored.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Files already at their saved location.
    pub in_place: Vec<PathBuf>,
    /// Files moved back, as `(found at, restored to)`.
    pub restored: Vec<(PathBuf, PathBuf)>,
    /// Files that could not be located under the snapshot root.
    pub missing: Vec<PathBuf>,
    /// Files that were located but could not be moved back.
    pub failures: Vec<(PathBuf, String)>,
}

impl RollbackReport {
    pub fn is_complete_success(&self) -> bool {
        self.missing.is_empty() && self.failures.is_empty()
    }
}

/// Bounded undo history plus a single restore point.
#[derive(Debug)]
pub struct UndoManager {
    stack: VecDeque<UndoBatch>,
    capacity: usize,
    restore_point: Option<FolderSnapshot>,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    /// Creates a manager keeping the last [`MAX_UNDO`] batches.
    pub fn new() -> Self {
        Self::with_capacity(MAX_UNDO)
    }

    /// Creates a manager keeping the last `capacity` batches (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stack: VecDeque::new(),
            capacity: capacity.max(1),
            restore_point: None,
        }
    }

    /// Pushes a batch, evicting the oldest one when over capacity.
    pub fn record_batch(&mut self, records: Vec<ActionRecord>, description: impl Into<String>) {
        let batch = UndoBatch {
            description: description.into(),
            timestamp: Local::now(),
            actions: records,
        };
        tracing::info!(
            "Recorded undo batch \"{}\" with {} action(s)",
            batch.description,
            batch.actions.len()
        );
        self.stack.push_back(batch);

        while self.stack.len() > self.capacity {
            if let Some(evicted) = self.stack.pop_front() {
                tracing::debug!("Evicted undo batch \"{}\"", evicted.description);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Batches from oldest to newest.
    pub fn batches(&self) -> impl Iterator<Item = &UndoBatch> {
        self.stack.iter()
    }

    /// The batch [`UndoManager::undo_last`] would revert.
    pub fn last_batch(&self) -> Option<&UndoBatch> {
        self.stack.back()
    }

    /// Reverts the most recent batch, newest action first.
    ///
    /// A failing reversal is reported and the remaining ones still run.
    pub fn undo_last(&mut self) -> UndoOutcome {
        let Some(batch) = self.stack.pop_back() else {
            tracing::info!("No operations to undo.");
            return UndoOutcome::NothingToUndo;
        };

        tracing::info!("Undoing: {}", batch.description);
        let mut report = UndoReport {
            description: batch.description,
            ..UndoReport::default()
        };

        for mut record in batch.actions.into_iter().rev() {
            let path = record.file.path.clone();
            match revert(&mut record) {
                Ok(()) => {
                    tracing::debug!(
                        "Undid {} -> {}",
                        record.forward.kind(),
                        record.file.path.display()
                    );
                    report.reverted.push(record.file.path);
                }
                Err(e) => {
                    tracing::warn!("Failed to undo {}: {}", path.display(), e);
                    report.failures.push((path, e.to_string()));
                }
            }
        }

        UndoOutcome::Undone(report)
    }

    /// Stores a deep copy of `folder`, replacing any previous restore point.
    pub fn save_restore_point(&mut self, folder: &FolderSnapshot) {
        tracing::info!("Restore point saved for {}", folder.path.display());
        self.restore_point = Some(folder.clone());
    }

    pub fn restore_point(&self) -> Option<&FolderSnapshot> {
        self.restore_point.as_ref()
    }

    /// Moves files back to where the restore point saw them.
    ///
    /// Files already in place are left alone. Missing files are searched for
    /// by name under the snapshot root; a file found elsewhere is moved back
    /// into its saved parent folder, which is recreated if needed.
    pub fn rollback_to_restore_point(&self) -> RollbackOutcome {
        let Some(snapshot) = &self.restore_point else {
            tracing::info!("No restore point saved.");
            return RollbackOutcome::NoRestorePoint;
        };

        tracing::info!("Rolling back to restore point {}", snapshot.path.display());
        let files = snapshot.files();
        let expected: HashSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();
        let mut report = RollbackReport::default();

        for &file in &files {
            if file.path.exists() {
                report.in_place.push(file.path.clone());
                continue;
            }

            let Some(found) = locate(&snapshot.path, &file.file_name(), &expected) else {
                tracing::warn!("Could not locate {} for restore", file.path.display());
                report.missing.push(file.path.clone());
                continue;
            };

            match restore_file(&found, file) {
                Ok(()) => {
                    tracing::debug!("Restored {} -> {}", found.display(), file.path.display());
                    report.restored.push((found, file.path.clone()));
                }
                Err(e) => {
                    tracing::warn!("Failed to restore {}: {}", file.path.display(), e);
                    report.failures.push((file.path.clone(), e.to_string()));
                }
            }
        }

        RollbackOutcome::RolledBack(report)
    }
}

fn revert(record: &mut ActionRecord) -> Result<()> {
    let reverse = record.reverse.as_ref().ok_or_else(|| {
        SortError::UnsupportedOperation(format!("{} cannot be undone", record.forward.kind()))
    })?;

    match reverse.execute(&mut record.file, None)? {
        ExecuteOutcome::Applied => Ok(()),
        ExecuteOutcome::Skipped => Err(SortError::OverwriteNotSupported(
            reverse
                .target_path(&record.file)
                .unwrap_or_else(|| record.original_path.clone()),
        )),
    }
}

/// Finds a file named `name` under `root` that is not itself a saved location.
fn locate(root: &Path, name: &str, expected: &HashSet<&Path>) -> Option<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| e.file_name().to_string_lossy() == name && !expected.contains(e.path()))
        .map(|e| e.into_path())
}

fn restore_file(found: &Path, saved: &FileRecord) -> Result<()> {
    let parent = saved.parent().ok_or_else(|| {
        SortError::Configuration(format!("{} has no parent directory", saved.path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let mut current = FileRecord::from_path(found)?;
    match Action::move_to(parent)?.execute(&mut current, None)? {
        ExecuteOutcome::Applied => Ok(()),
        ExecuteOutcome::Skipped => Err(SortError::OverwriteNotSupported(saved.path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn moved_record(dir: &Path, name: &str) -> ActionRecord {
        let source = dir.join(name);
        fs::write(&source, name.as_bytes()).unwrap();
        let dest = dir.join("out");
        fs::create_dir_all(&dest).unwrap();

        let mut file = FileRecord::from_path(&source).unwrap();
        let action = Action::move_to(&dest).unwrap();
        action.prepare(&file).unwrap().execute(&mut file, None).unwrap().unwrap()
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut undo = UndoManager::new();
        for i in 0..6 {
            undo.record_batch(Vec::new(), format!("batch {}", i));
        }

        assert_eq!(undo.len(), MAX_UNDO);
        let descriptions: Vec<&str> = undo.batches().map(|b| b.description.as_str()).collect();
        assert_eq!(descriptions, vec!["batch 1", "batch 2", "batch 3", "batch 4", "batch 5"]);
        assert_eq!(undo.last_batch().unwrap().description, "batch 5");
    }

    #[test]
    fn test_custom_capacity() {
        let mut undo = UndoManager::with_capacity(2);
        for i in 0..4 {
            undo.record_batch(Vec::new(), format!("batch {}", i));
        }
        assert_eq!(undo.len(), 2);
        assert_eq!(UndoManager::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_undo_empty_stack() {
        let mut undo = UndoManager::new();
        assert!(matches!(undo.undo_last(), UndoOutcome::NothingToUndo));
    }

    #[test]
    fn test_undo_reverts_in_reverse_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let source = dir.path().join("x.txt");
        fs::write(&source, b"x").unwrap();

        // x.txt -> a/x.txt -> b/x.txt, unwinding must go through a/
        let mut file = FileRecord::from_path(&source).unwrap();
        let first = Action::move_to(dir.path().join("a")).unwrap();
        let second = Action::move_to(dir.path().join("b")).unwrap();
        let r1 = first.prepare(&file).unwrap().execute(&mut file, None).unwrap().unwrap();
        let r2 = second.prepare(&file).unwrap().execute(&mut file, None).unwrap().unwrap();

        let mut undo = UndoManager::new();
        undo.record_batch(vec![r1, r2], "chain");

        let UndoOutcome::Undone(report) = undo.undo_last() else {
            panic!("expected an undo report");
        };
        assert!(report.is_complete_success());
        assert_eq!(report.description, "chain");
        assert!(source.exists());
        assert!(!dir.path().join("b/x.txt").exists());
        assert!(undo.is_empty());
    }

    #[test]
    fn test_undo_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let r1 = moved_record(dir.path(), "one.txt");
        let r2 = moved_record(dir.path(), "two.txt");
        fs::remove_file(dir.path().join("out/two.txt")).unwrap();

        let mut undo = UndoManager::new();
        undo.record_batch(vec![r1, r2], "partial");

        let UndoOutcome::Undone(report) = undo.undo_last() else {
            panic!("expected an undo report");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.reverted, vec![dir.path().join("one.txt")]);
        assert!(dir.path().join("one.txt").exists());
    }

    #[test]
    fn test_undo_blocked_by_new_file_at_origin() {
        let dir = TempDir::new().unwrap();
        let record = moved_record(dir.path(), "report.txt");
        // something new took the old spot
        fs::write(dir.path().join("report.txt"), b"newer").unwrap();

        let mut undo = UndoManager::new();
        undo.record_batch(vec![record], "blocked");

        let UndoOutcome::Undone(report) = undo.undo_last() else {
            panic!("expected an undo report");
        };
        assert!(report.reverted.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, dir.path().join("out/report.txt"));
        assert!(report.failures[0].1.contains("Overwriting existing file is not supported"));
        assert!(dir.path().join("out/report.txt").exists());
        assert_eq!(fs::read(dir.path().join("report.txt")).unwrap(), b"newer");
    }

    #[test]
    fn test_undo_record_without_reverse_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, b"x").unwrap();
        let file = FileRecord::from_path(&path).unwrap();

        let mut undo = UndoManager::new();
        undo.record_batch(vec![ActionRecord::new(Action::recycle(), None, file, &path)], "recycle");

        let UndoOutcome::Undone(report) = undo.undo_last() else {
            panic!("expected an undo report");
        };
        assert!(report.failures[0].1.contains("cannot be undone"));
    }

    #[test]
    fn test_restore_point_is_replaced() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("one")).unwrap();
        fs::create_dir(dir.path().join("two")).unwrap();

        let mut undo = UndoManager::new();
        assert!(matches!(undo.rollback_to_restore_point(), RollbackOutcome::NoRestorePoint));

        let first = FolderSnapshot::scan(dir.path().join("one"), true, 3).unwrap();
        let second = FolderSnapshot::scan(dir.path().join("two"), true, 3).unwrap();
        undo.save_restore_point(&first);
        undo.save_restore_point(&second);

        assert_eq!(undo.restore_point().unwrap().name, "two");
    }

    #[test]
    fn test_rollback_relocates_moved_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("a.png"), b"a").unwrap();
        fs::write(root.join("docs/b.txt"), b"b").unwrap();
        fs::write(root.join("c.md"), b"c").unwrap();

        let mut undo = UndoManager::new();
        undo.save_restore_point(&FolderSnapshot::scan(root, true, 3).unwrap());

        fs::create_dir_all(root.join("sorted/deep")).unwrap();
        fs::rename(root.join("a.png"), root.join("sorted/deep/a.png")).unwrap();
        fs::rename(root.join("docs/b.txt"), root.join("sorted/b.txt")).unwrap();
        fs::remove_dir(root.join("docs")).unwrap();
        fs::remove_file(root.join("c.md")).unwrap();

        let RollbackOutcome::RolledBack(report) = undo.rollback_to_restore_point() else {
            panic!("expected a rollback report");
        };

        assert!(root.join("a.png").exists());
        assert!(root.join("docs/b.txt").exists());
        assert_eq!(report.restored.len(), 2);
        assert_eq!(report.missing, vec![root.join("c.md")]);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_rollback_leaves_files_in_place() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("x")).unwrap();
        fs::write(root.join("same.txt"), b"top").unwrap();
        fs::write(root.join("x/same.txt"), b"nested").unwrap();

        let mut undo = UndoManager::new();
        undo.save_restore_point(&FolderSnapshot::scan(root, true, 3).unwrap());
        fs::remove_file(root.join("same.txt")).unwrap();

        let RollbackOutcome::RolledBack(report) = undo.rollback_to_restore_point() else {
            panic!("expected a rollback report");
        };

        // the nested file has the same name but belongs where it is
        assert_eq!(report.in_place, vec![root.join("x/same.txt")]);
        assert_eq!(report.missing, vec![root.join("same.txt")]);
        assert_eq!(fs::read(root.join("x/same.txt")).unwrap(), b"nested");
    }
}
