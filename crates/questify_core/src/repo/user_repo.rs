//! User progress repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and store whole `UserProgress` aggregates (user row, daily quest
//!   rows, ad-hoc task rows).
//! - Enforce optimistic concurrency on every save.
//!
//! # Invariants
//! - `save_user` is a compare-and-swap on `users.version`; child rows are
//!   replaced in the same IMMEDIATE transaction, so a failed save changes
//!   nothing.
//! - `daily_assigned_at IS NULL` means "never assigned"; a non-null value
//!   with zero `daily_tasks` rows is an empty assignment.

use super::{
    bool_to_int, ensure_schema_ready, int_to_bool, is_unique_violation, u64_from_db, u64_to_db,
    RepoError, RepoResult,
};
use crate::model::credentials::Credentials;
use crate::model::progress::{AdHocTask, AssignedTask, DailyAssignment, UserProgress};
use crate::model::EpochMillis;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Persistence contract for per-user progress.
pub trait UserRepository {
    /// Loads one user aggregate; `None` when the username is unknown.
    fn find_user(&self, username: &str) -> RepoResult<Option<UserProgress>>;
    /// Inserts a new user and returns its initial version.
    fn insert_user(&self, user: &UserProgress, credentials: &Credentials) -> RepoResult<u64>;
    /// Writes `user` if the stored version still equals `user.version`.
    ///
    /// Returns the new version on success and `RepoError::Conflict` when the
    /// record moved in between.
    fn save_user(&self, user: &UserProgress) -> RepoResult<u64>;
    fn find_credentials(&self, username: &str) -> RepoResult<Option<Credentials>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

struct UserRow {
    xp: u64,
    level: u64,
    completed_ad_hoc_count: u64,
    daily_assigned_at: Option<EpochMillis>,
    version: u64,
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_user(&self, username: &str) -> RepoResult<Option<UserProgress>> {
        // One read transaction so the three selects observe the same version.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let Some(row) = load_user_row(&tx, username)? else {
            return Ok(None);
        };

        let daily = match row.daily_assigned_at {
            Some(assigned_at) => Some(DailyAssignment::new(
                load_daily_tasks(&tx, username)?,
                assigned_at,
            )),
            None => None,
        };
        let ad_hoc_tasks = load_ad_hoc_tasks(&tx, username)?;
        tx.commit()?;

        let user = UserProgress {
            username: username.to_string(),
            xp: row.xp,
            level: row.level,
            daily,
            ad_hoc_tasks,
            completed_ad_hoc_count: row.completed_ad_hoc_count,
            version: row.version,
        };
        user.validate().map_err(|err| {
            RepoError::InvalidData(format!("user `{username}` failed validation: {err}"))
        })?;
        Ok(Some(user))
    }

    fn insert_user(&self, user: &UserProgress, credentials: &Credentials) -> RepoResult<u64> {
        user.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "INSERT INTO users (
                username,
                password_hash,
                password_salt,
                xp,
                level,
                completed_ad_hoc_count,
                daily_assigned_at,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0);",
            params![
                user.username.as_str(),
                credentials.password_hash.as_str(),
                credentials.password_salt.as_str(),
                u64_to_db(user.xp, "users.xp")?,
                u64_to_db(user.level, "users.level")?,
                u64_to_db(user.completed_ad_hoc_count, "users.completed_ad_hoc_count")?,
                user.daily.as_ref().map(|daily| daily.assigned_at),
            ],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(RepoError::UserAlreadyExists(user.username.clone()));
            }
            return Err(err.into());
        }

        replace_child_rows(&tx, user)?;
        tx.commit()?;
        debug!(
            "event=user_insert module=repo status=ok username={}",
            user.username
        );
        Ok(0)
    }

    fn save_user(&self, user: &UserProgress) -> RepoResult<u64> {
        user.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let next_version = user.version + 1;
        let changed = tx.execute(
            "UPDATE users
             SET
                xp = ?1,
                level = ?2,
                completed_ad_hoc_count = ?3,
                daily_assigned_at = ?4,
                version = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE username = ?6
               AND version = ?7;",
            params![
                u64_to_db(user.xp, "users.xp")?,
                u64_to_db(user.level, "users.level")?,
                u64_to_db(user.completed_ad_hoc_count, "users.completed_ad_hoc_count")?,
                user.daily.as_ref().map(|daily| daily.assigned_at),
                u64_to_db(next_version, "users.version")?,
                user.username.as_str(),
                u64_to_db(user.version, "users.version")?,
            ],
        )?;

        if changed == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1);",
                [user.username.as_str()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(RepoError::UserNotFound(user.username.clone()));
            }
            warn!(
                "event=user_save module=repo status=conflict username={} expected_version={}",
                user.username, user.version
            );
            return Err(RepoError::Conflict {
                username: user.username.clone(),
                expected_version: user.version,
            });
        }

        replace_child_rows(&tx, user)?;
        tx.commit()?;
        debug!(
            "event=user_save module=repo status=ok username={} version={}",
            user.username, next_version
        );
        Ok(next_version)
    }

    fn find_credentials(&self, username: &str) -> RepoResult<Option<Credentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT password_hash, password_salt FROM users WHERE username = ?1;",
                [username],
                |row| {
                    Ok(Credentials {
                        password_hash: row.get(0)?,
                        password_salt: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }
}

fn load_user_row(conn: &Connection, username: &str) -> RepoResult<Option<UserRow>> {
    let raw = conn
        .query_row(
            "SELECT xp, level, completed_ad_hoc_count, daily_assigned_at, version
             FROM users
             WHERE username = ?1;",
            [username],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((xp, level, completed_ad_hoc_count, daily_assigned_at, version)) = raw else {
        return Ok(None);
    };

    Ok(Some(UserRow {
        xp: u64_from_db(xp, "users.xp")?,
        level: u64_from_db(level, "users.level")?,
        completed_ad_hoc_count: u64_from_db(
            completed_ad_hoc_count,
            "users.completed_ad_hoc_count",
        )?,
        daily_assigned_at,
        version: u64_from_db(version, "users.version")?,
    }))
}

fn load_daily_tasks(conn: &Connection, username: &str) -> RepoResult<Vec<AssignedTask>> {
    let mut stmt = conn.prepare(
        "SELECT title, completed
         FROM daily_tasks
         WHERE username = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([username])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(AssignedTask {
            title: row.get(0)?,
            completed: int_to_bool(row.get(1)?, "daily_tasks.completed")?,
        });
    }
    Ok(tasks)
}

fn load_ad_hoc_tasks(conn: &Connection, username: &str) -> RepoResult<Vec<AdHocTask>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, due_at, completed
         FROM ad_hoc_tasks
         WHERE username = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([username])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        let id = Uuid::parse_str(&id_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{id_text}` in ad_hoc_tasks.id"))
        })?;
        tasks.push(AdHocTask {
            id,
            title: row.get(1)?,
            description: row.get(2)?,
            due_at: row.get(3)?,
            completed: int_to_bool(row.get(4)?, "ad_hoc_tasks.completed")?,
        });
    }
    Ok(tasks)
}

fn replace_child_rows(tx: &Transaction<'_>, user: &UserProgress) -> RepoResult<()> {
    let username = user.username.as_str();

    tx.execute("DELETE FROM daily_tasks WHERE username = ?1;", [username])?;
    if let Some(daily) = &user.daily {
        let mut insert = tx.prepare(
            "INSERT INTO daily_tasks (username, position, title, completed)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for (position, task) in daily.tasks.iter().enumerate() {
            insert.execute(params![
                username,
                position as i64,
                task.title.as_str(),
                bool_to_int(task.completed),
            ])?;
        }
    }

    tx.execute("DELETE FROM ad_hoc_tasks WHERE username = ?1;", [username])?;
    let mut insert = tx.prepare(
        "INSERT INTO ad_hoc_tasks (id, username, position, title, description, due_at, completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
    )?;
    for (position, task) in user.ad_hoc_tasks.iter().enumerate() {
        insert.execute(params![
            task.id.to_string(),
            username,
            position as i64,
            task.title.as_str(),
            task.description.as_deref(),
            task.due_at,
            bool_to_int(task.completed),
        ])?;
    }

    Ok(())
}
