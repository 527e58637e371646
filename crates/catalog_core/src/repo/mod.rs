//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `NewItem::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to storage errors, and storage errors always carry the name of
//!   the failed operation.

use crate::db::DbError;
use crate::image_store::ImageError;
use crate::model::item::{ItemId, ValidationError};
use log::error;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub mod item_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item/category persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Connection checkout, statement or row decoding failure.
    Storage {
        op: &'static str,
        source: DbError,
    },
    Image(ImageError),
    NotFound(ItemId),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage { op, source } => write!(f, "storage error during {op}: {source}"),
            Self::Image(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage { source, .. } => Some(source),
            Self::Image(err) => Some(err),
            Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ImageError> for RepoError {
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

/// Attaches an operation name to low-level storage failures.
pub(crate) trait StorageContext<T> {
    fn storage(self, op: &'static str) -> RepoResult<T>;
}

impl<T, E: Into<DbError>> StorageContext<T> for Result<T, E> {
    fn storage(self, op: &'static str) -> RepoResult<T> {
        self.map_err(|err| {
            let source = err.into();
            error!("event=storage_error module=repo op={op} error={source}");
            RepoError::Storage { op, source }
        })
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )
        .storage("schema_check")?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .storage("schema_check")?;
    let mut rows = stmt.query([]).storage("schema_check")?;
    while let Some(row) = rows.next().storage("schema_check")? {
        let current: String = row.get(1).storage("schema_check")?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
