//! Category dictionary access.
//!
//! # Responsibility
//! - Map category names to stable ids, creating rows on first use.
//!
//! # Invariants
//! - Category names are unique and matched case-sensitively.
//! - `resolve_or_create` is a single conditional insert plus id read, so two
//!   writers racing on a new name both end up with the same id.
//! - Categories are never updated or deleted here.

use crate::model::item::{Category, CategoryId};
use crate::repo::{RepoResult, StorageContext};
use log::info;
use rusqlite::{Connection, OptionalExtension};

/// Resolves category names against one connection or open transaction.
pub struct CategoryResolver<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CategoryResolver<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns the id for `name`, inserting the category if it is new.
    pub fn resolve_or_create(&self, name: &str) -> RepoResult<CategoryId> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO categories (name) VALUES (?1)
                 ON CONFLICT (name) DO NOTHING;",
                [name],
            )
            .storage("resolve_category")?;

        let id: CategoryId = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .storage("resolve_category")?;

        if inserted > 0 {
            info!("event=category_create module=repo status=ok category_id={id}");
        }
        Ok(id)
    }

    /// Looks up an existing category id without creating one.
    pub fn find(&self, name: &str) -> RepoResult<Option<CategoryId>> {
        self.conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()
            .storage("find_category")
    }

    /// Lists the whole dictionary ordered by id.
    pub fn list(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY id ASC;")
            .storage("list_categories")?;
        let mut rows = stmt.query([]).storage("list_categories")?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next().storage("list_categories")? {
            categories.push(Category {
                id: row.get("id").storage("list_categories")?,
                name: row.get("name").storage("list_categories")?,
            });
        }
        Ok(categories)
    }
}
