//! Sorting rules: a condition paired with the action it triggers.

use crate::action::{Action, ActionKind};
use crate::condition::Condition;
use crate::error::Result;
use crate::log::ActionLog;
use crate::record::FileRecord;
use crate::undo::ActionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// "If the condition holds for a file, perform the action."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortingRule {
    condition: Condition,
    action: Action,
}

impl SortingRule {
    pub fn new(condition: Condition, action: Action) -> Self {
        Self { condition, action }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Tests the rule's condition against `file`.
    pub fn matches(&self, file: &FileRecord) -> Result<bool> {
        self.condition.evaluate(file)
    }

    /// Runs the action when the condition holds.
    pub fn run(
        &self,
        file: &mut FileRecord,
        log: Option<&mut ActionLog>,
    ) -> Result<Option<ActionRecord>> {
        if self.matches(file)? {
            fire(&self.action, file, log)
        } else {
            Ok(None)
        }
    }
}

impl fmt::Display for SortingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "If file {}, {}.", self.condition, self.action)
    }
}

/// Executes `action` on `file`, returning an undo record when there is
/// something to undo. Recycling never produces one.
pub(crate) fn fire(
    action: &Action,
    file: &mut FileRecord,
    log: Option<&mut ActionLog>,
) -> Result<Option<ActionRecord>> {
    if action.kind() == ActionKind::Recycle {
        action.execute(file, log)?;
        return Ok(None);
    }
    let prepared = action.prepare(file)?;
    if let Some(target) = prepared.target() {
        tracing::debug!("{} {} -> {}", action.kind(), file.path.display(), target.display());
    }
    prepared.execute(file, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionOperator;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_display() {
        let dir = TempDir::new().unwrap();
        let rule = SortingRule::new(
            Condition::extension(ConditionOperator::Equals, ".png"),
            Action::move_to(dir.path()).unwrap(),
        );

        assert_eq!(
            rule.to_string(),
            format!("If file extension is equal to .png, move file to {}.", dir.path().display())
        );

        let rule = SortingRule::new(
            Condition::size(ConditionOperator::GreaterThan, 100).unwrap(),
            Action::recycle(),
        );
        assert_eq!(rule.to_string(), "If file size is greater than 100, recycle file.");
    }

    #[test]
    fn test_run_only_when_matching() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"n").unwrap();
        fs::write(dir.path().join("image.png"), b"i").unwrap();

        let rule = SortingRule::new(
            Condition::extension(ConditionOperator::Equals, ".txt"),
            Action::move_to(dir.path().join("Docs")).unwrap(),
        );

        let mut txt = FileRecord::from_path(dir.path().join("notes.txt")).unwrap();
        let mut png = FileRecord::from_path(dir.path().join("image.png")).unwrap();

        let record = rule.run(&mut txt, None).unwrap().unwrap();
        assert_eq!(record.result_path(), dir.path().join("Docs/notes.txt"));
        assert!(rule.run(&mut png, None).unwrap().is_none());
        assert!(dir.path().join("image.png").exists());
    }

    #[test]
    fn test_json_shape() {
        let rule = SortingRule::new(
            Condition::name(ConditionOperator::Includes, "invoice"),
            Action::rename("invoice").unwrap(),
        );

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "condition": { "type": "name", "operation": "includes", "value": "invoice" },
                "action": { "type": "rename", "newName": "invoice" }
            })
        );

        let decoded: SortingRule = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, rule);
    }
}
