//! Progression use-case service.
//!
//! # Responsibility
//! - Serve today's quests, rotating them when the stored set is stale.
//! - Apply daily-quest and ad-hoc completions and award XP exactly once.
//! - Create users and manage their ad-hoc task lists.
//!
//! # Invariants
//! - Every mutation is a versioned read-modify-write: load, mutate, save with
//!   compare-and-swap, and start over from a fresh load on `Conflict`.
//! - Completing an already completed task (daily or ad-hoc) is a successful
//!   no-op that awards nothing.
//! - XP only changes through `engine::progression::award_xp`.

use super::{ServiceError, ServiceResult};
use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::engine::progression::award_xp;
use crate::engine::rotation::needs_refresh;
use crate::engine::sampler;
use crate::model::credentials::{Credentials, SALT_LEN};
use crate::model::progress::{
    validate_username, AdHocTask, AdHocTaskId, DailyAssignment, NewAdHocTask, UserProgress,
};
use crate::model::EpochMillis;
use crate::repo::task_pool_repo::TaskPoolRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{debug, info, warn};
use rand::Rng;

/// Progression service over injected storage, time and randomness.
pub struct ProgressService<U, P, C, G>
where
    U: UserRepository,
    P: TaskPoolRepository,
    C: Clock,
    G: Rng,
{
    users: U,
    pool: P,
    clock: C,
    rng: G,
    config: EngineConfig,
}

impl<U, P, C, G> ProgressService<U, P, C, G>
where
    U: UserRepository,
    P: TaskPoolRepository,
    C: Clock,
    G: Rng,
{
    /// Creates a service after validating `config`.
    pub fn new(
        users: U,
        pool: P,
        clock: C,
        rng: G,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            users,
            pool,
            clock,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a new level-1 user with a salted password digest.
    ///
    /// # Errors
    /// - `InvalidArgument` for a malformed username or a short password.
    /// - `AlreadyExists` when the username is taken.
    pub fn create_user(&mut self, username: &str, password: &str) -> ServiceResult<UserProgress> {
        validate_username(username)
            .map_err(|err| ServiceError::InvalidArgument(err.to_string()))?;
        if password.chars().count() < self.config.min_password_len {
            return Err(ServiceError::InvalidArgument(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt);
        let credentials = Credentials::derive(password, &salt);

        let mut user = UserProgress::new(username);
        user.version = self.users.insert_user(&user, &credentials)?;
        info!(
            "event=user_create module=service status=ok username={}",
            username
        );
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> ServiceResult<UserProgress> {
        load_user(&self.users, username)
    }

    /// Checks `password` against the stored digest of `username`.
    pub fn verify_password(&self, username: &str, password: &str) -> ServiceResult<bool> {
        let credentials = self
            .users
            .find_credentials(username)?
            .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))?;
        Ok(credentials.verify(password))
    }

    /// Returns today's quests, rotating them first when stale.
    pub fn get_or_rotate_daily_tasks(&mut self, username: &str) -> ServiceResult<DailyAssignment> {
        let now = self.clock.now();
        self.get_or_rotate_daily_tasks_at(username, now)
    }

    /// Same as [`Self::get_or_rotate_daily_tasks`] with an explicit `now`.
    pub fn get_or_rotate_daily_tasks_at(
        &mut self,
        username: &str,
        now: EpochMillis,
    ) -> ServiceResult<DailyAssignment> {
        self.rotate(username, now, false)
    }

    /// Replaces today's quests unconditionally, discarding completion flags.
    pub fn force_refresh_daily_tasks(
        &mut self,
        username: &str,
    ) -> ServiceResult<DailyAssignment> {
        let now = self.clock.now();
        self.force_refresh_daily_tasks_at(username, now)
    }

    pub fn force_refresh_daily_tasks_at(
        &mut self,
        username: &str,
        now: EpochMillis,
    ) -> ServiceResult<DailyAssignment> {
        self.rotate(username, now, true)
    }

    /// Marks today's quest at `index` completed and awards the daily bonus.
    ///
    /// # Errors
    /// - `UserNotFound` for an unknown user.
    /// - `InvalidArgument` when there is no assignment for today or `index`
    ///   is out of range.
    pub fn complete_daily_task(
        &self,
        username: &str,
        index: usize,
    ) -> ServiceResult<UserProgress> {
        let now = self.clock.now();
        self.complete_daily_task_at(username, index, now)
    }

    /// Same as [`Self::complete_daily_task`] with an explicit `now`.
    ///
    /// An assignment from an earlier day counts as absent; callers fetch
    /// today's quests first.
    pub fn complete_daily_task_at(
        &self,
        username: &str,
        index: usize,
        now: EpochMillis,
    ) -> ServiceResult<UserProgress> {
        let bonus = self.config.daily_quest_xp;
        let zone = self.config.day_zone();
        let user = update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "daily_complete",
            username,
            |user| {
                if fresh_assignment(user, now, zone).is_none() {
                    return Err(ServiceError::InvalidArgument(
                        "no daily assignment for today".to_string(),
                    ));
                }
                let daily = user.daily.as_mut().ok_or_else(|| {
                    ServiceError::InvalidArgument("no daily assignment for today".to_string())
                })?;
                let len = daily.tasks.len();
                let task = daily.tasks.get_mut(index).ok_or_else(|| {
                    ServiceError::InvalidArgument(format!(
                        "daily task index {index} out of range for {len} tasks"
                    ))
                })?;

                if !task.complete() {
                    return Ok(false);
                }
                let award = award_xp(user, bonus);
                if award.leveled_up() {
                    info!(
                        "event=level_up module=service status=ok username={} level={}",
                        user.username, award.level
                    );
                }
                Ok(true)
            },
        )?;
        info!(
            "event=daily_complete module=service status=ok username={} index={} xp={} level={}",
            username, index, user.xp, user.level
        );
        Ok(user)
    }

    /// Adds `xp_delta` to the user's XP; negative deltas are rejected.
    pub fn award_progress(&self, username: &str, xp_delta: i64) -> ServiceResult<UserProgress> {
        let delta = u64::try_from(xp_delta).map_err(|_| {
            ServiceError::InvalidArgument(format!("xp delta must not be negative, got {xp_delta}"))
        })?;

        let user = update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "award_progress",
            username,
            |user| {
                if delta == 0 {
                    return Ok(false);
                }
                award_xp(user, delta);
                Ok(true)
            },
        )?;
        info!(
            "event=award_progress module=service status=ok username={} delta={} xp={} level={}",
            username, delta, user.xp, user.level
        );
        Ok(user)
    }

    /// Appends a pending ad-hoc task to the user's list.
    pub fn add_ad_hoc_task(
        &self,
        username: &str,
        task: NewAdHocTask,
    ) -> ServiceResult<UserProgress> {
        let title = task.title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "task title must not be blank".to_string(),
            ));
        }

        update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "ad_hoc_add",
            username,
            |user| {
                let mut created = AdHocTask::new(title);
                created.description = task.description.clone();
                created.due_at = task.due_at;
                user.ad_hoc_tasks.push(created);
                Ok(true)
            },
        )
    }

    /// Completes one ad-hoc task and awards the ad-hoc bonus once.
    pub fn complete_ad_hoc_task(
        &self,
        username: &str,
        task_id: AdHocTaskId,
    ) -> ServiceResult<UserProgress> {
        let bonus = self.config.ad_hoc_task_xp;
        let user = update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "ad_hoc_complete",
            username,
            |user| {
                let task = user
                    .ad_hoc_task_mut(task_id)
                    .ok_or(ServiceError::TaskNotFound(task_id))?;
                if !task.complete() {
                    return Ok(false);
                }
                user.completed_ad_hoc_count += 1;
                award_xp(user, bonus);
                Ok(true)
            },
        )?;
        info!(
            "event=ad_hoc_complete module=service status=ok username={} xp={} level={}",
            username, user.xp, user.level
        );
        Ok(user)
    }

    /// Removes one ad-hoc task; XP and completion count are kept.
    pub fn delete_ad_hoc_task(
        &self,
        username: &str,
        task_id: AdHocTaskId,
    ) -> ServiceResult<UserProgress> {
        update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "ad_hoc_delete",
            username,
            |user| {
                let position = user
                    .ad_hoc_tasks
                    .iter()
                    .position(|task| task.id == task_id)
                    .ok_or(ServiceError::TaskNotFound(task_id))?;
                user.ad_hoc_tasks.remove(position);
                Ok(true)
            },
        )
    }

    fn rotate(
        &mut self,
        username: &str,
        now: EpochMillis,
        force: bool,
    ) -> ServiceResult<DailyAssignment> {
        let zone = self.config.day_zone();
        let count = self.config.daily_task_count;

        // Cheap path: most calls find a fresh assignment and never list the pool.
        if !force {
            let user = load_user(&self.users, username)?;
            if let Some(daily) = fresh_assignment(&user, now, zone) {
                debug!(
                    "event=daily_rotate module=service status=noop username={}",
                    username
                );
                return Ok(daily);
            }
        }

        let pool = self.pool.list_task_pool()?;
        if pool.is_empty() {
            warn!(
                "event=daily_rotate module=service status=empty_pool username={}",
                username
            );
        }

        let rng = &mut self.rng;
        let user = update_with_retry(
            &self.users,
            self.config.max_write_attempts,
            "daily_rotate",
            username,
            |user| {
                if !force && fresh_assignment(user, now, zone).is_some() {
                    return Ok(false);
                }
                let tasks = sampler::sample(&pool, count, &mut *rng);
                user.daily = Some(DailyAssignment::new(tasks, now));
                Ok(true)
            },
        )?;

        let daily = user
            .daily
            .unwrap_or_else(|| DailyAssignment::new(Vec::new(), now));
        info!(
            "event=daily_rotate module=service status=ok username={} forced={} tasks={}",
            username,
            force,
            daily.tasks.len()
        );
        Ok(daily)
    }
}

fn fresh_assignment(
    user: &UserProgress,
    now: EpochMillis,
    zone: chrono::FixedOffset,
) -> Option<DailyAssignment> {
    let daily = user.daily.as_ref();
    let stale = needs_refresh(
        daily.map(|daily| daily.assigned_at),
        now,
        daily.is_some_and(|daily| !daily.tasks.is_empty()),
        zone,
    );
    if stale {
        None
    } else {
        daily.cloned()
    }
}

fn load_user<U: UserRepository>(users: &U, username: &str) -> ServiceResult<UserProgress> {
    users
        .find_user(username)?
        .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))
}

/// Runs `apply` against a freshly loaded user and saves with version check.
///
/// `apply` returns `Ok(false)` when nothing changed, which skips the write.
/// A version conflict reloads and reapplies, up to `max_attempts` times.
fn update_with_retry<U: UserRepository>(
    users: &U,
    max_attempts: u32,
    operation: &str,
    username: &str,
    mut apply: impl FnMut(&mut UserProgress) -> ServiceResult<bool>,
) -> ServiceResult<UserProgress> {
    for attempt in 1..=max_attempts {
        let mut user = load_user(users, username)?;
        if !apply(&mut user)? {
            debug!(
                "event={} module=service status=noop username={}",
                operation, username
            );
            return Ok(user);
        }

        match users.save_user(&user) {
            Ok(version) => {
                user.version = version;
                return Ok(user);
            }
            Err(RepoError::Conflict { .. }) => {
                warn!(
                    "event={} module=service status=retry username={} attempt={} max_attempts={}",
                    operation, username, attempt, max_attempts
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(username.to_string()))
}
