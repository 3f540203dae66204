//! Domain model for quest pools and per-user progression.
//!
//! # Responsibility
//! - Define canonical data structures used by the progression engine.
//! - Own value-level invariants (`validate()`), independent of storage.
//!
//! # Invariants
//! - Assigned daily tasks are title snapshots, never references into the pool.
//! - A user's `level` is always the progression formula applied to `xp`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod credentials;
pub mod progress;
pub mod task_pool;

/// Unix epoch milliseconds, the timestamp unit used across core.
pub type EpochMillis = i64;

/// Invariant violation detected on a model value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Username does not match the accepted handle shape.
    InvalidUsername(String),
    /// Task or pool entry title is blank after trim.
    BlankTitle,
    /// Stored level disagrees with the level derived from xp.
    LevelMismatch { xp: u64, level: u64, expected: u64 },
    /// Two ad-hoc tasks of one user share an id.
    DuplicateTaskId(uuid::Uuid),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername(value) => write!(f, "invalid username: `{value}`"),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::LevelMismatch {
                xp,
                level,
                expected,
            } => write!(
                f,
                "level {level} does not match xp {xp} (expected level {expected})"
            ),
            Self::DuplicateTaskId(id) => write!(f, "duplicate task id: {id}"),
        }
    }
}

impl Error for ModelValidationError {}
