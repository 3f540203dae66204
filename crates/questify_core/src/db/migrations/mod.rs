//! Versioned schema for users, quests and the task pool.
//!
//! The on-disk schema version lives in `PRAGMA user_version`. Pending steps
//! run inside one transaction, so a database is either fully upgraded or
//! left at its previous version.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// `(schema version, SQL)`; versions start at 1 and increase by one.
const STEPS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Schema version a fully migrated database reports.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |&(version, _)| version)
}

/// Brings `conn` to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is newer than this build.
/// - `Migration` naming the step that failed; earlier steps of the same
///   batch are rolled back with it.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let to = latest_version();
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }
    if from == to {
        debug!(
            "event=db_migrate module=db status=noop version={}",
            from
        );
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(version, sql) in STEPS.iter().filter(|(version, _)| *version > from) {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from, to
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
