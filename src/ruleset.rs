//! Rulesets: ordered rules bound to a target folder.

use crate::error::{Result, SortError};
use crate::log::ActionLog;
use crate::record::FileRecord;
use crate::rule::{SortingRule, fire};
use crate::snapshot::FolderSnapshot;
use crate::undo::ActionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How many rules must hold and which action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// The first matching rule runs; later rules are not consulted.
    #[default]
    FirstMatch,
    /// Every rule must match; only the last rule's action runs.
    MatchAll,
}

/// Result of running a ruleset against one file.
#[derive(Debug)]
pub enum Firing {
    /// No rule applied.
    NoMatch,
    /// A rule applied; the record is absent for skipped or irreversible actions.
    Fired(Option<ActionRecord>),
}

impl Firing {
    pub fn fired(&self) -> bool {
        matches!(self, Self::Fired(_))
    }

    pub fn into_record(self) -> Option<ActionRecord> {
        match self {
            Self::NoMatch => None,
            Self::Fired(record) => record,
        }
    }
}

/// An ordered collection of rules for one folder.
///
/// Under [`MatchPolicy::MatchAll`] every rule must use the same action kind,
/// since only the final rule's action is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RulesetSpec", into = "RulesetSpec")]
pub struct Ruleset {
    folder: PathBuf,
    rules: Vec<SortingRule>,
    policy: MatchPolicy,
}

impl Ruleset {
    /// Creates an empty first-match ruleset for a scanned folder.
    pub fn new(folder: &FolderSnapshot) -> Self {
        Self::for_path(&folder.path)
    }

    /// Creates an empty first-match ruleset for a folder path.
    pub fn for_path(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            rules: Vec::new(),
            policy: MatchPolicy::FirstMatch,
        }
    }

    /// Creates a ruleset holding `rules`.
    pub fn from_rules(folder: &FolderSnapshot, rules: Vec<SortingRule>) -> Self {
        Self {
            rules,
            ..Self::new(folder)
        }
    }

    /// Sets the match policy.
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Requires every rule to match.
    pub fn match_all(self) -> Self {
        self.with_policy(MatchPolicy::MatchAll)
    }

    /// Appends a rule.
    pub fn rule(mut self, rule: SortingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add_rule(&mut self, rule: SortingRule) {
        self.rules.push(rule);
    }

    /// Removes the first rule equal to `rule`.
    pub fn remove_rule(&mut self, rule: &SortingRule) -> Result<SortingRule> {
        let index = self.rules.iter().position(|r| r == rule).ok_or_else(|| {
            SortError::Configuration("the rule does not exist in the ruleset".to_string())
        })?;
        Ok(self.rules.remove(index))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn rules(&self) -> &[SortingRule] {
        &self.rules
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs the ruleset against `file` and returns the undo record, if any.
    pub fn evaluate(
        &self,
        file: &mut FileRecord,
        log: Option<&mut ActionLog>,
    ) -> Result<Option<ActionRecord>> {
        self.apply(file, log).map(Firing::into_record)
    }

    /// Runs the ruleset against `file`, reporting whether any rule fired.
    pub fn apply(&self, file: &mut FileRecord, log: Option<&mut ActionLog>) -> Result<Firing> {
        match self.policy {
            MatchPolicy::FirstMatch => {
                for rule in &self.rules {
                    if rule.matches(file)? {
                        return Ok(Firing::Fired(fire(rule.action(), file, log)?));
                    }
                }
                Ok(Firing::NoMatch)
            }
            MatchPolicy::MatchAll => {
                let Some(last) = self.rules.last() else {
                    return Ok(Firing::NoMatch);
                };
                let kind = last.action().kind();
                if self.rules.iter().any(|r| r.action().kind() != kind) {
                    return Err(SortError::InconsistentActionTypes);
                }

                for rule in &self.rules {
                    if !rule.matches(file)? {
                        return Ok(Firing::NoMatch);
                    }
                }
                Ok(Firing::Fired(fire(last.action(), file, log)?))
            }
        }
    }

    fn name(&self) -> String {
        self.folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.folder.display().to_string())
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Ruleset for {} with {} rules>", self.name(), self.rules.len())
    }
}

/// Persisted form of a [`Ruleset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RulesetSpec {
    folder: PathBuf,
    #[serde(default)]
    match_all: bool,
    #[serde(default)]
    rules: Vec<SortingRule>,
}

impl From<RulesetSpec> for Ruleset {
    fn from(spec: RulesetSpec) -> Self {
        let policy = if spec.match_all {
            MatchPolicy::MatchAll
        } else {
            MatchPolicy::FirstMatch
        };
        Self {
            folder: spec.folder,
            rules: spec.rules,
            policy,
        }
    }
}

impl From<Ruleset> for RulesetSpec {
    fn from(ruleset: Ruleset) -> Self {
        Self {
            folder: ruleset.folder,
            match_all: ruleset.policy == MatchPolicy::MatchAll,
            rules: ruleset.rules,
        }
    }
}
