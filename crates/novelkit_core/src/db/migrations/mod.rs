//! Schema steps for the manuscript store.
//!
//! 1. `manuscript`: projects, chapters, scenes.
//! 2. `relation_graph`: entities and their ordered relation rows.
//!
//! All pending steps run in one transaction; `PRAGMA user_version` holds the
//! last applied step.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "manuscript",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "relation_graph",
        sql: include_str!("0002_entities.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Names of the steps `conn` still needs, oldest first.
pub fn pending_migrations(conn: &Connection) -> DbResult<Vec<&'static str>> {
    let current_version = current_user_version(conn)?;
    Ok(MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
        .map(|migration| migration.name)
        .collect())
}

/// Brings `conn` to the latest schema.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        debug!(
            "event=db_migration_step module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
