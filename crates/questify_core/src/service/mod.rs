//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the progression use-cases.
//! - Translate persistence failures into the caller-facing error taxonomy.
//!
//! # Invariants
//! - Services never retry anything except optimistic version conflicts.
//! - A failed operation leaves stored state unchanged.

use crate::model::progress::AdHocTaskId;
use crate::model::task_pool::PoolEntryId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod progress_service;
pub mod task_pool_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse failure category callers route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    AlreadyExists,
    Unavailable,
    Conflict,
}

/// Service error for progression use-cases.
#[derive(Debug)]
pub enum ServiceError {
    UserNotFound(String),
    TaskNotFound(AdHocTaskId),
    PoolEntryNotFound(PoolEntryId),
    InvalidArgument(String),
    AlreadyExists(String),
    /// Storage could not serve the request (I/O failure or corrupted rows).
    Unavailable(RepoError),
    /// Concurrent writers kept winning until the retry budget ran out.
    Conflict(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::TaskNotFound(_) | Self::PoolEntryNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(username) => write!(f, "user not found: {username}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::PoolEntryNotFound(id) => write!(f, "task pool entry not found: {id}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::AlreadyExists(username) => write!(f, "user already exists: {username}"),
            Self::Unavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Conflict(username) => {
                write!(f, "too many concurrent updates for user {username}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UserNotFound(username) => Self::UserNotFound(username),
            RepoError::UserAlreadyExists(username) => Self::AlreadyExists(username),
            RepoError::Conflict { username, .. } => Self::Conflict(username),
            RepoError::PoolEntryNotFound(id) => Self::PoolEntryNotFound(id),
            RepoError::Validation(err) => Self::InvalidArgument(err.to_string()),
            other @ (RepoError::Db(_) | RepoError::InvalidData(_)) => Self::Unavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::model::ModelValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_to_caller_kinds() {
        let cases = [
            (RepoError::UserNotFound("a".into()), ErrorKind::NotFound),
            (
                RepoError::UserAlreadyExists("a".into()),
                ErrorKind::AlreadyExists,
            ),
            (
                RepoError::Conflict {
                    username: "a".into(),
                    expected_version: 3,
                },
                ErrorKind::Conflict,
            ),
            (
                RepoError::Validation(ModelValidationError::BlankTitle),
                ErrorKind::InvalidArgument,
            ),
            (
                RepoError::InvalidData("bad row".into()),
                ErrorKind::Unavailable,
            ),
        ];

        for (repo_error, expected) in cases {
            assert_eq!(ServiceError::from(repo_error).kind(), expected);
        }
    }
}
