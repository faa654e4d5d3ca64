//! Sorting jobs: run rulesets over every file of a folder snapshot.

use crate::error::{Result, SortError};
use crate::log::ActionLog;
use crate::ruleset::{Firing, Ruleset};
use crate::snapshot::FolderSnapshot;
use crate::undo::UndoManager;
use std::path::PathBuf;

/// Description used for undo batches when none is given.
pub const DEFAULT_DESCRIPTION: &str = "Sorting Job";

/// Summary of a sorting run.
#[derive(Debug, Default)]
pub struct JobReport {
    /// Files taken from the snapshot.
    pub files_seen: usize,
    /// Files some ruleset acted on.
    pub fired: usize,
    /// Files no ruleset matched.
    pub unmatched: usize,
    /// Undo records pushed as one batch.
    pub recorded: usize,
    /// Files whose evaluation failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// The audit log written during the run.
    pub log_path: Option<PathBuf>,
}

impl JobReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builder for a sorting run.
///
/// Rulesets are tried in order for each file and the first one that fires
/// wins. A failure on one file is logged and the run moves on.
pub struct SortingJob {
    rulesets: Vec<Ruleset>,
    description: String,
    log_dir: Option<PathBuf>,
}

impl Default for SortingJob {
    fn default() -> Self {
        Self::new()
    }
}

impl SortingJob {
    pub fn new() -> Self {
        Self {
            rulesets: Vec::new(),
            description: DEFAULT_DESCRIPTION.to_string(),
            log_dir: None,
        }
    }

    /// Adds a ruleset.
    pub fn ruleset(mut self, ruleset: Ruleset) -> Self {
        self.rulesets.push(ruleset);
        self
    }

    /// Adds several rulesets.
    pub fn rulesets(mut self, rulesets: impl IntoIterator<Item = Ruleset>) -> Self {
        self.rulesets.extend(rulesets);
        self
    }

    /// Sets the undo batch description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Writes an action log into `dir`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Runs every ruleset over the snapshot's files and records one undo batch.
    pub fn run(&self, folder: &FolderSnapshot, undo: &mut UndoManager) -> Result<JobReport> {
        if !folder.is_target_root {
            return Err(SortError::Configuration(format!(
                "{} is not a sort target root",
                folder.path.display()
            )));
        }

        let mut log = match &self.log_dir {
            Some(dir) => Some(ActionLog::create_in(dir)?),
            None => None,
        };
        let mut report = JobReport {
            log_path: log.as_ref().and_then(|l| l.path().map(PathBuf::from)),
            ..JobReport::default()
        };
        let mut records = Vec::new();

        for mut file in folder.files().into_iter().cloned() {
            report.files_seen += 1;
            let mut handled = false;

            for ruleset in &self.rulesets {
                match ruleset.apply(&mut file, log.as_mut()) {
                    Ok(Firing::NoMatch) => {}
                    Ok(Firing::Fired(record)) => {
                        report.fired += 1;
                        records.extend(record);
                        handled = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to sort {}: {}", file.path.display(), e);
                        report.failures.push((file.path.clone(), e.to_string()));
                        handled = true;
                        break;
                    }
                }
            }

            if !handled {
                report.unmatched += 1;
            }
        }

        report.recorded = records.len();
        if !records.is_empty() {
            undo.record_batch(records, self.description.clone());
        }

        tracing::info!(
            "{}: {} file(s), {} sorted, {} unmatched, {} failed",
            self.description,
            report.files_seen,
            report.fired,
            report.unmatched,
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::{Condition, ConditionOperator};
    use crate::rule::SortingRule;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FolderSnapshot) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Photos")).unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();
        fs::write(dir.path().join("b.txt"), b"txt").unwrap();
        fs::write(dir.path().join("c.bin"), b"bin").unwrap();
        let folder = FolderSnapshot::scan(dir.path(), true, 1).unwrap();
        (dir, folder)
    }

    fn ext_rule(ext: &str, dest: PathBuf) -> SortingRule {
        SortingRule::new(
            Condition::extension(ConditionOperator::Equals, ext),
            Action::move_to(dest).unwrap(),
        )
    }

    #[test]
    fn test_run_tries_rulesets_in_order() {
        let (dir, folder) = setup();
        let photos = Ruleset::new(&folder).rule(ext_rule(".png", dir.path().join("Photos")));
        let docs = Ruleset::new(&folder).rule(ext_rule(".txt", dir.path().join("Docs")));

        let mut undo = UndoManager::new();
        let report = SortingJob::new()
            .ruleset(photos)
            .ruleset(docs)
            .description("Test sort")
            .run(&folder, &mut undo)
            .unwrap();

        assert_eq!(report.files_seen, 3);
        assert_eq!(report.fired, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.recorded, 2);
        assert!(dir.path().join("Photos/a.png").exists());
        assert!(dir.path().join("Docs/b.txt").exists());
        assert_eq!(undo.last_batch().unwrap().description, "Test sort");
    }

    #[test]
    fn test_failure_does_not_abort_run() {
        let (dir, folder) = setup();
        // vanishes between scan and sort
        fs::remove_file(dir.path().join("a.png")).unwrap();

        let ruleset = Ruleset::new(&folder)
            .rule(ext_rule(".png", dir.path().join("Photos")))
            .rule(ext_rule(".txt", dir.path().join("Docs")));

        let mut undo = UndoManager::new();
        let report = SortingJob::new().ruleset(ruleset).run(&folder, &mut undo).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].1.contains("File not found"));
        assert_eq!(report.fired, 1);
        assert!(dir.path().join("Docs/b.txt").exists());
        assert_eq!(undo.len(), 1);
    }

    #[test]
    fn test_nothing_recorded_when_nothing_matches() {
        let (dir, folder) = setup();
        let ruleset = Ruleset::new(&folder).rule(ext_rule(".mp4", dir.path().join("Docs")));

        let mut undo = UndoManager::new();
        let report = SortingJob::new().ruleset(ruleset).run(&folder, &mut undo).unwrap();

        assert_eq!(report.unmatched, 3);
        assert!(undo.is_empty());
    }

    #[test]
    fn test_run_writes_action_log() {
        let (dir, folder) = setup();
        let ruleset = Ruleset::new(&folder).rule(ext_rule(".png", dir.path().join("Photos")));

        let mut undo = UndoManager::new();
        let report = SortingJob::new()
            .ruleset(ruleset)
            .log_dir(dir.path().join("logs"))
            .run(&folder, &mut undo)
            .unwrap();

        let content = fs::read_to_string(report.log_path.unwrap()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("MOVE"));
    }

    #[test]
    fn test_requires_target_root() {
        let (dir, _) = setup();
        let folder = FolderSnapshot::scan(dir.path(), false, 1).unwrap();

        let mut undo = UndoManager::new();
        let err = SortingJob::new().run(&folder, &mut undo).unwrap_err();
        assert!(matches!(err, SortError::Configuration(_)));
    }
}
