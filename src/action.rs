//! Actions: filesystem mutations a rule performs on a matching file.
//!
//! Every action knows where it will put a file and how to derive the action
//! that undoes it. Derivation must happen before execution, because it reads
//! the file's pre-mutation location; [`Action::prepare`] makes that ordering
//! explicit.

use crate::error::{Result, SortError};
use crate::log::ActionLog;
use crate::record::FileRecord;
use crate::undo::ActionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The kind of filesystem mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Copy,
    Rename,
    /// Send to the platform recycle bin. Not reversible.
    Recycle,
}

impl ActionKind {
    /// Returns the persisted key for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Rename => "rename",
            Self::Recycle => "recycle",
        }
    }

    /// Upper-case label used in the action log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::Copy => "COPY",
            Self::Rename => "RENAME",
            Self::Recycle => "RECYCLE",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when an action ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The filesystem was changed.
    Applied,
    /// A move found its destination occupied and left the file in place.
    Skipped,
}

/// A parameterized filesystem mutation.
///
/// The destination folder, when present, is checked to be an existing
/// directory when the action is built, not when it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ActionSpec", into = "ActionSpec")]
pub struct Action {
    kind: ActionKind,
    destination: Option<PathBuf>,
    new_name: Option<String>,
}

impl Action {
    /// Creates an action, validating the arguments its kind requires.
    pub fn new(
        kind: ActionKind,
        destination: Option<PathBuf>,
        new_name: Option<String>,
    ) -> Result<Self> {
        if let Some(dir) = &destination
            && !dir.is_dir()
        {
            return Err(SortError::Configuration(format!(
                "destination must be an existing directory: {}",
                dir.display()
            )));
        }

        match kind {
            ActionKind::Move | ActionKind::Copy if destination.is_none() => {
                return Err(SortError::Configuration(format!(
                    "{} requires a destination folder",
                    kind
                )));
            }
            ActionKind::Rename if new_name.as_deref().is_none_or(str::is_empty) => {
                return Err(SortError::Configuration(
                    "rename requires a new name".to_string(),
                ));
            }
            ActionKind::Rename if new_name.as_deref().is_some_and(|n| !is_plain_name(n)) => {
                return Err(SortError::Configuration(format!(
                    "rename target must be a plain file name: {}",
                    new_name.as_deref().unwrap_or_default()
                )));
            }
            _ => {}
        }

        Ok(Self {
            kind,
            destination,
            new_name,
        })
    }

    /// Moves files into `dir`.
    pub fn move_to(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(ActionKind::Move, Some(dir.into()), None)
    }

    /// Copies files into `dir`.
    pub fn copy_to(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(ActionKind::Copy, Some(dir.into()), None)
    }

    /// Renames files in place, keeping their extension.
    pub fn rename(new_name: impl Into<String>) -> Result<Self> {
        Self::new(ActionKind::Rename, None, Some(new_name.into()))
    }

    /// Sends files to the recycle bin.
    pub fn recycle() -> Self {
        Self {
            kind: ActionKind::Recycle,
            destination: None,
            new_name: None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn new_name(&self) -> Option<&str> {
        self.new_name.as_deref()
    }

    /// Returns where the file will end up, or `None` for recycle.
    pub fn target_path(&self, file: &FileRecord) -> Option<PathBuf> {
        match self.kind {
            ActionKind::Move | ActionKind::Copy => self
                .destination
                .as_ref()
                .map(|dir| dir.join(file.file_name())),
            ActionKind::Rename => self
                .new_name
                .as_ref()
                .map(|name| file.path.with_file_name(format!("{}{}", name, file.extension))),
            ActionKind::Recycle => None,
        }
    }

    /// Derives the action that undoes this one for `file` in its current state.
    ///
    /// Move goes back to the current parent, copy recycles the copy and rename
    /// restores the current name. Recycle cannot be undone.
    pub fn reverse_action(&self, file: &FileRecord) -> Result<Action> {
        match self.kind {
            ActionKind::Move => {
                let parent = file.parent().ok_or_else(|| {
                    SortError::Configuration(format!(
                        "{} has no parent directory",
                        file.path.display()
                    ))
                })?;
                tracing::debug!(
                    "Reverse destination for {} is {}",
                    file.path.display(),
                    parent.display()
                );
                Action::move_to(parent)
            }
            ActionKind::Copy => Ok(Action::recycle()),
            ActionKind::Rename => Action::rename(file.name.clone()),
            ActionKind::Recycle => Err(SortError::UnsupportedOperation(
                "recycled files cannot be restored without a backup".to_string(),
            )),
        }
    }

    /// Captures the reverse action and target path, ready to execute.
    pub fn prepare(&self, file: &FileRecord) -> Result<PreparedAction<'_>> {
        let reverse = match self.kind {
            ActionKind::Recycle => None,
            _ => Some(self.reverse_action(file)?),
        };
        Ok(PreparedAction {
            action: self,
            reverse,
            target: self.target_path(file),
        })
    }

    /// Runs the action against `file`, then points the record at the result.
    ///
    /// The log entry is only written once the mutation has succeeded.
    pub fn execute(
        &self,
        file: &mut FileRecord,
        log: Option<&mut ActionLog>,
    ) -> Result<ExecuteOutcome> {
        if !file.path.exists() {
            return Err(SortError::FileNotFound(file.path.clone()));
        }

        tracing::debug!("Executing {} on {}", self.kind, file.path.display());
        let target = self.target_path(file);

        match self.kind {
            ActionKind::Move => {
                let dest = self.require_target(target.as_deref())?;
                if dest.exists() {
                    tracing::debug!("Skipping move, {} already exists", dest.display());
                    return Ok(ExecuteOutcome::Skipped);
                }
                move_file(&file.path, dest)?;
            }
            ActionKind::Copy => {
                let dest = self.require_target(target.as_deref())?;
                if dest.exists() {
                    return Err(SortError::OverwriteNotSupported(dest.to_path_buf()));
                }
                fs::copy(&file.path, dest)?;
            }
            ActionKind::Rename => {
                let dest = self.require_target(target.as_deref())?;
                if dest.exists() {
                    return Err(SortError::OverwriteNotSupported(dest.to_path_buf()));
                }
                fs::rename(&file.path, dest)?;
            }
            ActionKind::Recycle => {
                let resolved = fs::canonicalize(&file.path)?;
                trash::delete(&resolved)?;
            }
        }

        let from = file.path.clone();
        if let Some(target) = &target {
            file.relocate(target.clone());
        }

        // Log failures are not fatal once the file has changed.
        if let Some(log) = log
            && let Err(e) = log.record(self.kind, &from, target.as_deref())
        {
            tracing::warn!("Failed to write action log entry for {}: {}", from.display(), e);
        }

        Ok(ExecuteOutcome::Applied)
    }

    fn require_target<'a>(&self, target: Option<&'a Path>) -> Result<&'a Path> {
        target.ok_or_else(|| {
            SortError::Configuration(format!("{} action has no target path", self.kind))
        })
    }

    /// Describes the action as the tail of a rule sentence.
    pub fn describe(&self) -> String {
        match self.kind {
            ActionKind::Move => format!("move file to {}", display_opt(self.destination())),
            ActionKind::Copy => format!("copy file to {}", display_opt(self.destination())),
            ActionKind::Rename => {
                format!("rename file to {}", self.new_name.as_deref().unwrap_or(""))
            }
            ActionKind::Recycle => "recycle file".to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A single normal path component, so a rename stays in its folder.
fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

/// Renames across directories, copying when the move crosses filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// An action whose undo has already been derived from the file's current state.
#[derive(Debug)]
pub struct PreparedAction<'a> {
    action: &'a Action,
    reverse: Option<Action>,
    target: Option<PathBuf>,
}

impl PreparedAction<'_> {
    /// Where the file is expected to end up.
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Executes the action and returns an undo record when something changed
    /// and the action can be reversed.
    pub fn execute(
        self,
        file: &mut FileRecord,
        log: Option<&mut ActionLog>,
    ) -> Result<Option<ActionRecord>> {
        let original_path = file.path.clone();
        match self.action.execute(file, log)? {
            ExecuteOutcome::Skipped => Ok(None),
            ExecuteOutcome::Applied => Ok(self.reverse.map(|reverse| {
                ActionRecord::new(self.action.clone(), Some(reverse), file.clone(), original_path)
            })),
        }
    }
}

/// Persisted form of an [`Action`]; unset fields are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActionSpec {
    #[serde(rename = "type")]
    kind: ActionKind,
    #[serde(rename = "finalFolder", default, skip_serializing_if = "Option::is_none")]
    final_folder: Option<PathBuf>,
    #[serde(rename = "newName", default, skip_serializing_if = "Option::is_none")]
    new_name: Option<String>,
}

impl TryFrom<ActionSpec> for Action {
    type Error = SortError;

    fn try_from(spec: ActionSpec) -> Result<Self> {
        Self::new(spec.kind, spec.final_folder, spec.new_name)
    }
}

impl From<Action> for ActionSpec {
    fn from(action: Action) -> Self {
        Self {
            kind: action.kind,
            final_folder: action.destination,
            new_name: action.new_name,
        }
    }
}
