//! # qwiksort
//!
//! Rule-driven file organization with reversible actions.
//!
//! This crate provides:
//! - Folder snapshots with per-file metadata (name, extension, size, timestamps)
//! - Typed conditions over that metadata, validated when they are built
//! - Move, copy, rename and recycle actions that derive their own reversal
//! - Rulesets with first-match or match-all evaluation
//! - A bounded undo history plus a whole-folder restore point
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qwiksort::prelude::*;
//!
//! // Move every PNG in Downloads into Pictures
//! let folder = FolderSnapshot::scan("./Downloads", true, 3)?;
//! let photos = Ruleset::new(&folder).rule(SortingRule::new(
//!     Condition::extension(ConditionOperator::Equals, ".png"),
//!     Action::move_to("./Pictures")?,
//! ));
//!
//! let mut undo = UndoManager::new();
//! undo.save_restore_point(&folder);
//!
//! let report = SortingJob::new().ruleset(photos).run(&folder, &mut undo)?;
//! println!("sorted {} of {} files", report.fired, report.files_seen);
//!
//! // Changed our mind
//! undo.undo_last();
//! # Ok::<(), qwiksort::error::SortError>(())
//! ```
//!
//! ## Match-all Rulesets
//!
//! ```rust,no_run
//! use qwiksort::prelude::*;
//!
//! // Only large videos are archived
//! let folder = FolderSnapshot::scan("./Movies", true, 1)?;
//! let archive = Ruleset::new(&folder)
//!     .match_all()
//!     .rule(SortingRule::new(
//!         Condition::extension(ConditionOperator::Equals, ".mp4"),
//!         Action::move_to("./Archive")?,
//!     ))
//!     .rule(SortingRule::new(
//!         Condition::size(ConditionOperator::GreaterThan, 1_000_000_000)?,
//!         Action::move_to("./Archive")?,
//!     ));
//! # Ok::<(), qwiksort::error::SortError>(())
//! ```
//!
//! ## Configuration Files
//!
//! ```rust,no_run
//! use qwiksort::prelude::*;
//!
//! let config = SortConfig::load("qwiksort.yaml")?;
//! let mut undo = UndoManager::new();
//! let report = config.job().run(&config.snapshot()?, &mut undo)?;
//! # Ok::<(), qwiksort::error::SortError>(())
//! ```

pub mod action;
pub mod condition;
pub mod config;
pub mod error;
pub mod job;
pub mod log;
pub mod record;
pub mod rule;
pub mod ruleset;
pub mod snapshot;
pub mod undo;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::action::{Action, ActionKind, ExecuteOutcome, PreparedAction};
    pub use crate::condition::{Condition, ConditionAttribute, ConditionOperator, ConditionValue};
    pub use crate::config::SortConfig;
    pub use crate::error::{Result, SortError};
    pub use crate::job::{JobReport, SortingJob};
    pub use crate::log::ActionLog;
    pub use crate::record::FileRecord;
    pub use crate::rule::SortingRule;
    pub use crate::ruleset::{Firing, MatchPolicy, Ruleset};
    pub use crate::snapshot::{FolderSnapshot, Node};
    pub use crate::undo::{
        ActionRecord, RollbackOutcome, RollbackReport, UndoBatch, UndoManager, UndoOutcome,
        UndoReport,
    };
}

pub use prelude::*;
