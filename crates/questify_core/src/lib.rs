//! Core domain logic for Questify.
//! This crate is the single source of truth for progression invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, parse_config, ConfigError, EngineConfig};
pub use engine::progression::{award_xp, level_for, XpAward};
pub use engine::rotation::needs_refresh;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::progress::{
    AdHocTask, AdHocTaskId, AssignedTask, DailyAssignment, NewAdHocTask, UserProgress,
};
pub use model::task_pool::{PoolEntryId, TaskPoolEntry};
pub use model::{EpochMillis, ModelValidationError};
pub use repo::task_pool_repo::{SqliteTaskPoolRepository, TaskPoolRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::progress_service::ProgressService;
pub use service::task_pool_service::TaskPoolService;
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
