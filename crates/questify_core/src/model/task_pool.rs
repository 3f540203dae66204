//! Shared daily quest catalog.
//!
//! # Invariants
//! - Entries are immutable once stored; edits are remove + add.
//! - `title` is never blank.

use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a pool entry.
pub type PoolEntryId = Uuid;

/// XP reward recorded for entries created without an explicit value.
pub const DEFAULT_XP_REWARD: u32 = 10;

/// Quests shipped with a fresh installation, all worth 15 XP.
const DEFAULT_POOL_TITLES: [&str; 15] = [
    "Meditate for 10 minutes",
    "Drink 8 glasses of water",
    "Take a 15-minute walk",
    "Read 10 pages of a book",
    "Write in a journal",
    "Stretch for 5 minutes",
    "Practice a new skill",
    "Call a friend or family member",
    "Clean your workspace",
    "Plan your meals for tomorrow",
    "Do 20 push-ups or sit-ups",
    "Listen to a new podcast",
    "Try a new healthy recipe",
    "Declutter one small area",
    "Practice deep breathing for 5 minutes",
];
const DEFAULT_POOL_XP_REWARD: u32 = 15;

/// One quest candidate the daily sampler can draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPoolEntry {
    pub id: PoolEntryId,
    pub title: String,
    /// Empty when the quest has no extra description.
    pub description: String,
    /// Informational; daily completion awards the configured flat bonus.
    pub xp_reward: u32,
}

impl TaskPoolEntry {
    /// Creates an entry with a generated id.
    pub fn new(title: impl Into<String>, description: impl Into<String>, xp_reward: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            xp_reward,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::BlankTitle);
        }
        Ok(())
    }
}

/// Builds the built-in quest catalog with fresh ids.
pub fn default_pool_entries() -> Vec<TaskPoolEntry> {
    DEFAULT_POOL_TITLES
        .iter()
        .map(|title| TaskPoolEntry::new(*title, "", DEFAULT_POOL_XP_REWARD))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{default_pool_entries, TaskPoolEntry};
    use crate::model::ModelValidationError;
    use std::collections::HashSet;

    #[test]
    fn default_pool_has_fifteen_distinct_titles() {
        let entries = default_pool_entries();
        assert_eq!(entries.len(), 15);
        let titles: HashSet<_> = entries.iter().map(|entry| entry.title.as_str()).collect();
        assert_eq!(titles.len(), 15);
        assert!(entries.iter().all(|entry| entry.validate().is_ok()));
    }

    #[test]
    fn blank_title_is_rejected() {
        let entry = TaskPoolEntry::new("   ", "", 5);
        assert_eq!(entry.validate(), Err(ModelValidationError::BlankTitle));
    }
}
