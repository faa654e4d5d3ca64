//! Persisted sorting configuration.

use crate::error::{Result, SortError};
use crate::job::{DEFAULT_DESCRIPTION, SortingJob};
use crate::ruleset::Ruleset;
use crate::snapshot::{DEFAULT_MAX_DEPTH, FolderSnapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A target folder with the rulesets to run over it.
///
/// Can be saved to and loaded from YAML or JSON files. Actions are validated
/// while loading, so every destination folder must already exist.
///
/// # Example YAML
///
/// ```yaml
/// target: /home/me/Downloads
/// log_dir: /home/me/.qwiksort/logs
/// rulesets:
///   - folder: /home/me/Downloads
///     match_all: false
///     rules:
///       - condition: { type: extension, operation: "==", value: ".png" }
///         action: { type: move, finalFolder: /home/me/Pictures }
///       - condition: { type: name, operation: includes, value: photo }
///         action: { type: move, finalFolder: /home/me/Pictures }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Folder to scan and sort.
    pub target: PathBuf,

    /// Directory levels read when scanning the target.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Where action logs are written; no log when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Description recorded with the undo batch.
    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default)]
    pub rulesets: Vec<Ruleset>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl SortConfig {
    /// Creates an empty configuration for `target`.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            log_dir: None,
            description: default_description(),
            rulesets: Vec::new(),
        }
    }

    /// Adds a ruleset.
    pub fn with_ruleset(mut self, ruleset: Ruleset) -> Self {
        self.rulesets.push(ruleset);
        self
    }

    /// Loads YAML or JSON, chosen by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_json(path) {
            Self::from_json(path)
        } else {
            Self::from_yaml(path)
        }
    }

    /// Saves as YAML or JSON, chosen by file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_json(path) {
            self.to_json(path)
        } else {
            self.to_yaml(path)
        }
    }

    /// Load config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml::from_str(&content).map_err(|e| {
            SortError::Configuration(format!("Failed to parse YAML config: {}", e))
        })
    }

    /// Load config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            SortError::Configuration(format!("Failed to parse JSON config: {}", e))
        })
    }

    /// Save config to a YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| {
            SortError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        write_config(path.as_ref(), &content)
    }

    /// Save config to a JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_config(path.as_ref(), &content)
    }

    /// Scans the target folder as a sort root.
    pub fn snapshot(&self) -> Result<FolderSnapshot> {
        FolderSnapshot::scan(&self.target, true, self.max_depth)
    }

    /// Builds the sorting job described by this configuration.
    pub fn job(&self) -> SortingJob {
        let job = SortingJob::new()
            .rulesets(self.rulesets.iter().cloned())
            .description(self.description.clone());
        match &self.log_dir {
            Some(dir) => job.log_dir(dir),
            None => job,
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        SortError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read config file {}: {}", path.display(), e),
        ))
    })
}

fn write_config(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| {
        SortError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write config file {}: {}", path.display(), e),
        ))
    })
}
