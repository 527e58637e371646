//! Connection pool bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Build file-backed or in-memory r2d2 pools.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON`.
//! - Returned pools have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbPool, DbResult};
use log::{error, info};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const POOL_MAX_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens a pool over a SQLite database file and applies pending migrations.
///
/// # Side effects
/// - Creates the database file if missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_pool(path: impl AsRef<Path>) -> DbResult<DbPool> {
    let manager = SqliteConnectionManager::file(path.as_ref());
    bootstrap_pool(manager, "file")
}

/// Opens a pool over a private in-memory database and applies migrations.
///
/// Each call gets its own shared-cache database, so every connection of one
/// pool sees the same data while separate pools stay isolated.
pub fn open_pool_in_memory() -> DbResult<DbPool> {
    let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!(
        "file:catalog_mem_{}_{n}?mode=memory&cache=shared",
        std::process::id()
    );
    let manager = SqliteConnectionManager::file(uri);
    bootstrap_pool(manager, "memory")
}

fn bootstrap_pool(manager: SqliteConnectionManager, mode: &str) -> DbResult<DbPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let manager = manager.with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)
    });

    let pool = match r2d2::Pool::builder().max_size(POOL_MAX_SIZE).build(manager) {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let migrated = pool
        .get()
        .map_err(DbError::from)
        .and_then(|mut conn| apply_migrations(&mut conn));

    match migrated {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
