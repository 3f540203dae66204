//! Task pool use-case service.
//!
//! # Responsibility
//! - Provide catalog listing and maintenance entry points.
//! - Seed the built-in quest catalog.
//!
//! # Invariants
//! - Pool changes never rewrite quests already assigned to users.

use super::{ServiceError, ServiceResult};
use crate::model::task_pool::{
    default_pool_entries, PoolEntryId, TaskPoolEntry, DEFAULT_XP_REWARD,
};
use crate::repo::task_pool_repo::TaskPoolRepository;
use log::info;

/// Use-case service wrapper for task pool operations.
pub struct TaskPoolService<P: TaskPoolRepository> {
    repo: P,
}

impl<P: TaskPoolRepository> TaskPoolService<P> {
    pub fn new(repo: P) -> Self {
        Self { repo }
    }

    pub fn list_task_pool(&self) -> ServiceResult<Vec<TaskPoolEntry>> {
        Ok(self.repo.list_task_pool()?)
    }

    /// Adds one quest to the catalog.
    ///
    /// `xp_reward` defaults to [`DEFAULT_XP_REWARD`] when absent.
    pub fn add_pool_entry(
        &self,
        title: &str,
        description: Option<&str>,
        xp_reward: Option<u32>,
    ) -> ServiceResult<TaskPoolEntry> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "quest title must not be blank".to_string(),
            ));
        }

        let entry = TaskPoolEntry::new(
            title,
            description.unwrap_or_default().trim(),
            xp_reward.unwrap_or(DEFAULT_XP_REWARD),
        );
        self.repo.add_pool_entry(&entry)?;
        info!(
            "event=task_pool_add module=service status=ok entry_id={}",
            entry.id
        );
        Ok(entry)
    }

    pub fn remove_pool_entry(&self, id: PoolEntryId) -> ServiceResult<()> {
        self.repo.remove_pool_entry(id)?;
        info!(
            "event=task_pool_remove module=service status=ok entry_id={}",
            id
        );
        Ok(())
    }

    /// Replaces the catalog with the built-in quests and returns their count.
    pub fn seed_default_pool(&self) -> ServiceResult<usize> {
        Ok(self.repo.replace_task_pool(&default_pool_entries())?)
    }
}
