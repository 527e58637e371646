//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the catalog CRUD surface over `items` storage.
//! - Compose category resolution and image storage on the write path.
//! - Materialize category names onto items on every read path.
//!
//! # Invariants
//! - Every read goes through the same `items ⋈ categories` join, so an item
//!   is only visible once its category row exists.
//! - Category resolution and the item row insert commit or roll back
//!   together.
//! - Images are written and compensated only while the insert transaction
//!   holds the database write lock. A file is removed after a failed insert
//!   only if this insert created it and no committed row references it.
//! - An image write failure fails the whole insert.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{DbPool, PooledConnection};
use crate::image_store::ImageStore;
use crate::model::item::{Item, ItemId, NewItem};
use crate::repo::category_repo::CategoryResolver;
use crate::repo::{table_exists, table_has_column, RepoError, RepoResult, StorageContext};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::time::Instant;

const ITEM_SELECT_SQL: &str = "SELECT
    items.id AS id,
    items.name AS name,
    categories.name AS category,
    items.image_name AS image_name
FROM items
INNER JOIN categories ON items.category_id = categories.id";

/// Default logical name of the catalog snapshot artifact.
pub const DEFAULT_CATALOG_FILE_NAME: &str = "items.json";

/// Repository interface for catalog item operations.
pub trait ItemRepository {
    /// Lists every item in storage order.
    fn get_items(&self) -> RepoResult<Vec<Item>>;
    /// Persists a new item, storing `image` first when supplied.
    fn insert(&self, item: &NewItem, image: Option<&[u8]>) -> RepoResult<ItemId>;
    /// Returns the configured catalog file name. Never touches storage.
    fn get_file_name(&self) -> &str;
    /// Lists items whose name equals `keyword` exactly.
    fn get_item_by_keyword(&self, keyword: &str) -> RepoResult<Vec<Item>>;
    fn get_item_by_id(&self, id: ItemId) -> RepoResult<Item>;
}

/// Read predicate shared by every item query.
#[derive(Debug, Clone, Copy)]
enum ItemFilter<'a> {
    All,
    Name(&'a str),
    Id(ItemId),
}

/// Image written during an insert, tracked for compensation.
struct StoredImage {
    name: String,
    created: bool,
}

/// SQLite-backed item repository over a shared connection pool.
pub struct SqliteItemRepository {
    pool: DbPool,
    images: ImageStore,
    file_name: String,
}

impl SqliteItemRepository {
    /// Constructs a repository from a migrated pool.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   lacks what the queries need.
    pub fn try_new(
        pool: DbPool,
        images: ImageStore,
        file_name: impl Into<String>,
    ) -> RepoResult<Self> {
        {
            let conn = pool.get().storage("open_repository")?;
            ensure_connection_ready(&conn)?;
        }
        Ok(Self {
            pool,
            images,
            file_name: file_name.into(),
        })
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    fn conn(&self, op: &'static str) -> RepoResult<PooledConnection> {
        self.pool.get().storage(op)
    }

    fn query_items(&self, op: &'static str, filter: ItemFilter<'_>) -> RepoResult<Vec<Item>> {
        let mut sql = String::from(ITEM_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        match filter {
            ItemFilter::All => {}
            ItemFilter::Name(name) => {
                sql.push_str(" WHERE items.name = ?");
                bind_values.push(Value::Text(name.to_string()));
            }
            ItemFilter::Id(id) => {
                sql.push_str(" WHERE items.id = ?");
                bind_values.push(Value::Integer(id));
            }
        }
        sql.push_str(" ORDER BY items.id ASC;");

        let conn = self.conn(op)?;
        let mut stmt = conn.prepare(&sql).storage(op)?;
        let mut rows = stmt.query(params_from_iter(bind_values)).storage(op)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().storage(op)? {
            items.push(parse_item_row(row, op)?);
        }

        debug!(
            "event=item_query module=repo status=ok op={op} count={}",
            items.len()
        );
        Ok(items)
    }

    fn store_image(&self, item: &NewItem, image: Option<&[u8]>) -> RepoResult<StoredImage> {
        let bytes = match image {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Ok(StoredImage {
                    name: item.image_name.clone(),
                    created: false,
                })
            }
        };

        let name = if item.image_name.is_empty() {
            ImageStore::content_name(bytes)
        } else {
            item.image_name.clone()
        };
        let created = !self.images.exists(&name)?;
        self.images.store(&name, bytes)?;
        Ok(StoredImage { name, created })
    }

    /// Writes the image and the item row under one IMMEDIATE transaction.
    fn insert_locked(
        &self,
        item: &NewItem,
        image: Option<&[u8]>,
    ) -> RepoResult<(ItemId, StoredImage)> {
        let mut conn = self.conn("insert_item")?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage("insert_item")?;

        let stored = self.store_image(item, image)?;
        let id = match insert_row(&tx, item, &stored.name) {
            Ok(id) => id,
            Err(err) => {
                self.discard_image(&tx, &stored);
                return Err(err);
            }
        };

        let committed = tx.commit().storage("insert_item");
        if committed.is_err() && stored.created {
            warn!(
                "event=image_compensate module=repo status=skipped reason=commit_failed orphan={}",
                stored.name
            );
        }
        committed?;
        Ok((id, stored))
    }

    fn discard_image(&self, conn: &Connection, image: &StoredImage) {
        if !image.created {
            return;
        }
        match image_referenced(conn, &image.name) {
            Ok(false) => {}
            Ok(true) => {
                info!("event=image_compensate module=repo status=skipped reason=referenced");
                return;
            }
            Err(_) => {
                warn!(
                    "event=image_compensate module=repo status=skipped reason=reference_check_failed orphan={}",
                    image.name
                );
                return;
            }
        }
        match self.images.remove(&image.name) {
            Ok(()) => info!("event=image_compensate module=repo status=ok"),
            Err(err) => warn!(
                "event=image_compensate module=repo status=error orphan={} error={}",
                image.name, err
            ),
        }
    }
}

impl ItemRepository for SqliteItemRepository {
    fn get_items(&self) -> RepoResult<Vec<Item>> {
        self.query_items("get_items", ItemFilter::All)
    }

    fn insert(&self, item: &NewItem, image: Option<&[u8]>) -> RepoResult<ItemId> {
        item.validate()?;
        let started_at = Instant::now();

        let (id, stored) = self.insert_locked(item, image)?;
        info!(
            "event=item_insert module=repo status=ok item_id={id} has_image={} duration_ms={}",
            !stored.name.is_empty(),
            started_at.elapsed().as_millis()
        );
        Ok(id)
    }

    fn get_file_name(&self) -> &str {
        &self.file_name
    }

    fn get_item_by_keyword(&self, keyword: &str) -> RepoResult<Vec<Item>> {
        self.query_items("get_item_by_keyword", ItemFilter::Name(keyword))
    }

    fn get_item_by_id(&self, id: ItemId) -> RepoResult<Item> {
        self.query_items("get_item_by_id", ItemFilter::Id(id))?
            .into_iter()
            .next()
            .ok_or(RepoError::NotFound(id))
    }
}

fn insert_row(conn: &Connection, item: &NewItem, image_name: &str) -> RepoResult<ItemId> {
    let category_id = CategoryResolver::new(conn).resolve_or_create(&item.category)?;
    conn.execute(
        "INSERT INTO items (name, category_id, image_name) VALUES (?1, ?2, ?3);",
        params![item.name.as_str(), category_id, image_name],
    )
    .storage("insert_item")?;
    Ok(conn.last_insert_rowid())
}

fn image_referenced(conn: &Connection, image_name: &str) -> RepoResult<bool> {
    let referenced: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE image_name = ?1);",
            [image_name],
            |row| row.get(0),
        )
        .storage("image_reference_check")?;
    Ok(referenced == 1)
}

/// Decodes one joined row. Rows are returned as stored; validation applies
/// on the write path only.
fn parse_item_row(row: &Row<'_>, op: &'static str) -> RepoResult<Item> {
    Ok(Item {
        id: row.get("id").storage(op)?,
        name: row.get("name").storage(op)?,
        category: row.get("category").storage(op)?,
        image_name: row.get("image_name").storage(op)?,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn).storage("schema_check")?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["categories", "items"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in ["id", "name"] {
        if !table_has_column(conn, "categories", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "categories",
                column,
            });
        }
    }

    for column in ["id", "name", "category_id", "image_name"] {
        if !table_has_column(conn, "items", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}
