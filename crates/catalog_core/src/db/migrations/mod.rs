//! Catalog schema migrations.
//!
//! # Responsibility
//! - Own the `categories` / `items` schema history, one SQL file per step.
//! - Bring a connection from its stamped version up to `latest_version()`.
//!
//! # Invariants
//! - Steps are numbered from 1 without gaps; `PRAGMA user_version` holds the
//!   last applied step.
//! - All pending steps land in one transaction or none do.
//! - A database stamped newer than this binary is never touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "init_categories_items",
    sql: include_str!("0001_init.sql"),
}];

/// Returns the newest schema version this build knows how to create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades the catalog schema on `conn` to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this build.
/// - `Sqlite` when a step fails; nothing from this call is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stamped = current_user_version(conn)?;
    let latest = latest_version();
    if stamped > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stamped,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > stamped)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    for step in pending {
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.name
        );
    }
    Ok(())
}

/// Reads the schema version stamped on `conn`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
