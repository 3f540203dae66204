//! Per-user progression record.
//!
//! # Responsibility
//! - Define the user record: xp/level, today's daily assignment and
//!   user-authored (ad-hoc) tasks.
//! - Encode the one-way `Pending -> Completed` task transition.
//!
//! # Invariants
//! - `level == level_for(xp)` after every mutation that touches `xp`.
//! - A user owns its assignment and ad-hoc list exclusively.
//! - `version` only moves forward and is bumped by storage on each save.

use super::{EpochMillis, ModelValidationError};
use crate::engine::progression::level_for;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,63}$").expect("valid username regex"));

/// Stable identifier of an ad-hoc task.
pub type AdHocTaskId = Uuid;

/// Daily quest snapshot taken from the pool at assignment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedTask {
    pub title: String,
    pub completed: bool,
}

impl AssignedTask {
    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }

    /// Moves the task to `Completed`.
    ///
    /// Returns `false` when it already was, so callers award XP only once.
    pub fn complete(&mut self) -> bool {
        mark_completed(&mut self.completed)
    }
}

/// Today's quest set of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAssignment {
    pub tasks: Vec<AssignedTask>,
    pub assigned_at: EpochMillis,
}

impl DailyAssignment {
    pub fn new(tasks: Vec<AssignedTask>, assigned_at: EpochMillis) -> Self {
        Self { tasks, assigned_at }
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }
}

/// User-authored task, independent of the daily rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdHocTask {
    pub id: AdHocTaskId,
    pub title: String,
    pub description: Option<String>,
    /// Optional due date in epoch milliseconds.
    pub due_at: Option<EpochMillis>,
    pub completed: bool,
}

impl AdHocTask {
    /// Creates a pending task with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            due_at: None,
            completed: false,
        }
    }

    /// Same contract as [`AssignedTask::complete`].
    pub fn complete(&mut self) -> bool {
        mark_completed(&mut self.completed)
    }
}

/// Caller-provided fields for a new ad-hoc task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAdHocTask {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<EpochMillis>,
}

/// Progression state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub username: String,
    pub xp: u64,
    /// Cached `level_for(xp)`; never written independently.
    pub level: u64,
    /// `None` until the first daily rotation.
    pub daily: Option<DailyAssignment>,
    pub ad_hoc_tasks: Vec<AdHocTask>,
    pub completed_ad_hoc_count: u64,
    /// Optimistic concurrency revision assigned by storage.
    pub version: u64,
}

impl UserProgress {
    /// Creates a fresh level-1 record with no assignment.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            xp: 0,
            level: level_for(0),
            daily: None,
            ad_hoc_tasks: Vec::new(),
            completed_ad_hoc_count: 0,
            version: 0,
        }
    }

    pub fn ad_hoc_task_mut(&mut self, id: AdHocTaskId) -> Option<&mut AdHocTask> {
        self.ad_hoc_tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_username(&self.username)?;

        let expected = level_for(self.xp);
        if self.level != expected {
            return Err(ModelValidationError::LevelMismatch {
                xp: self.xp,
                level: self.level,
                expected,
            });
        }

        if let Some(daily) = &self.daily {
            if daily.tasks.iter().any(|task| task.title.trim().is_empty()) {
                return Err(ModelValidationError::BlankTitle);
            }
        }

        let mut seen = std::collections::HashSet::with_capacity(self.ad_hoc_tasks.len());
        for task in &self.ad_hoc_tasks {
            if task.title.trim().is_empty() {
                return Err(ModelValidationError::BlankTitle);
            }
            if !seen.insert(task.id) {
                return Err(ModelValidationError::DuplicateTaskId(task.id));
            }
        }

        Ok(())
    }
}

/// Checks the accepted username shape: 1-64 chars of `[A-Za-z0-9_.-]`,
/// starting with an alphanumeric.
pub fn validate_username(username: &str) -> Result<(), ModelValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ModelValidationError::InvalidUsername(username.to_string()))
    }
}

fn mark_completed(completed: &mut bool) -> bool {
    if *completed {
        return false;
    }
    *completed = true;
    true
}
