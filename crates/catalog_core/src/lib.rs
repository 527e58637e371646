//! Core persistence and request-validation logic for the item catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod image_store;
pub mod logging;
pub mod model;
pub mod repo;
pub mod request;
pub mod service;

pub use config::CatalogConfig;
pub use db::{open_pool, open_pool_in_memory, DbError, DbPool};
pub use image_store::{ImageError, ImageResult, ImageStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Category, CategoryId, Item, ItemId, JsonFormat, NewItem, ValidationError};
pub use repo::category_repo::CategoryResolver;
pub use repo::item_repo::{ItemRepository, SqliteItemRepository, DEFAULT_CATALOG_FILE_NAME};
pub use repo::{RepoError, RepoResult};
pub use request::{
    parse_add_item_request, parse_multipart, AddItemRequest, FormData, MultipartForm,
};
pub use service::catalog_service::CatalogService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
