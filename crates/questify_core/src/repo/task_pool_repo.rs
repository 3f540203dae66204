//! Task pool repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Pool rows are insert-only; removing an entry never touches daily
//!   assignments, which hold title snapshots.
//! - Listing order is insertion order.

use super::{ensure_schema_ready, u64_from_db, RepoError, RepoResult};
use crate::model::task_pool::{PoolEntryId, TaskPoolEntry};
use log::info;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Persistence contract for the shared quest catalog.
pub trait TaskPoolRepository {
    fn list_task_pool(&self) -> RepoResult<Vec<TaskPoolEntry>>;
    fn add_pool_entry(&self, entry: &TaskPoolEntry) -> RepoResult<PoolEntryId>;
    fn remove_pool_entry(&self, id: PoolEntryId) -> RepoResult<()>;
    /// Atomically swaps the whole catalog and returns the new entry count.
    fn replace_task_pool(&self, entries: &[TaskPoolEntry]) -> RepoResult<usize>;
}

/// SQLite-backed task pool repository.
pub struct SqliteTaskPoolRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskPoolRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskPoolRepository for SqliteTaskPoolRepository<'_> {
    fn list_task_pool(&self) -> RepoResult<Vec<TaskPoolEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, xp_reward
             FROM task_pool
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let id = Uuid::parse_str(&id_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{id_text}` in task_pool.id"))
            })?;
            let xp_reward = u64_from_db(row.get(3)?, "task_pool.xp_reward")?;
            let entry = TaskPoolEntry {
                id,
                title: row.get(1)?,
                description: row.get(2)?,
                xp_reward: u32::try_from(xp_reward).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "xp_reward {xp_reward} out of range in task_pool.xp_reward"
                    ))
                })?,
            };
            entry.validate()?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn add_pool_entry(&self, entry: &TaskPoolEntry) -> RepoResult<PoolEntryId> {
        entry.validate()?;
        insert_entry(self.conn, entry)?;
        Ok(entry.id)
    }

    fn remove_pool_entry(&self, id: PoolEntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_pool WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::PoolEntryNotFound(id));
        }
        Ok(())
    }

    fn replace_task_pool(&self, entries: &[TaskPoolEntry]) -> RepoResult<usize> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM task_pool;", [])?;
        for entry in entries {
            insert_entry(&tx, entry)?;
        }
        tx.commit()?;

        info!(
            "event=task_pool_replace module=repo status=ok entries={}",
            entries.len()
        );
        Ok(entries.len())
    }
}

fn insert_entry(conn: &Connection, entry: &TaskPoolEntry) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO task_pool (id, title, description, xp_reward)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            entry.id.to_string(),
            entry.title.as_str(),
            entry.description.as_str(),
            i64::from(entry.xp_reward),
        ],
    )?;
    Ok(())
}
