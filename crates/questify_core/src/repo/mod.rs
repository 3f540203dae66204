//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contracts the progress service consumes.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must call `validate()` on model values before SQL
//!   mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - User saves are optimistic: a stale `version` yields `Conflict`, never a
//!   silent overwrite.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task_pool::PoolEntryId;
use crate::model::ModelValidationError;
use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod task_pool_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user progress and task pool persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    UserNotFound(String),
    UserAlreadyExists(String),
    /// The stored record moved past the version the caller loaded.
    Conflict {
        username: String,
        expected_version: u64,
    },
    PoolEntryNotFound(PoolEntryId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UserNotFound(username) => write!(f, "user not found: {username}"),
            Self::UserAlreadyExists(username) => write!(f, "user already exists: {username}"),
            Self::Conflict {
                username,
                expected_version,
            } => write!(
                f,
                "user {username} was modified concurrently (expected version {expected_version})"
            ),
            Self::PoolEntryNotFound(id) => write!(f, "task pool entry not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_db*`.
fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if version != latest_version() {
        return Err(RepoError::InvalidData(format!(
            "schema version {version} does not match expected {}",
            latest_version()
        )));
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn u64_to_db(value: u64, column: &str) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value {value} out of range for {column}")))
}

fn u64_from_db(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative value `{value}` in {column}")))
}
