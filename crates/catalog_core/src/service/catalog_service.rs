//! Catalog use-case service.
//!
//! # Responsibility
//! - Turn validated add-item requests into persisted items.
//! - Provide stable read entry points and full-catalog snapshots.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::item::{Item, ItemId, JsonFormat};
use crate::repo::item_repo::ItemRepository;
use crate::repo::RepoResult;
use crate::request::AddItemRequest;

/// Use-case service wrapper for catalog operations.
pub struct CatalogService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> CatalogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a validated submission and returns the stored item.
    ///
    /// # Contract
    /// - The image bytes are always handed to the repository.
    /// - The returned item is read back through the category join.
    pub fn add_item(&self, request: AddItemRequest) -> RepoResult<Item> {
        let (item, image) = request.into_parts();
        let id = self.repo.insert(&item, Some(image.as_slice()))?;
        self.repo.get_item_by_id(id)
    }

    pub fn list_items(&self) -> RepoResult<Vec<Item>> {
        self.repo.get_items()
    }

    /// Lists items whose name equals `keyword` exactly.
    pub fn search_items(&self, keyword: &str) -> RepoResult<Vec<Item>> {
        self.repo.get_item_by_keyword(keyword)
    }

    pub fn get_item(&self, id: ItemId) -> RepoResult<Item> {
        self.repo.get_item_by_id(id)
    }

    /// Wraps every item in the snapshot envelope.
    pub fn export_snapshot(&self) -> RepoResult<JsonFormat> {
        Ok(JsonFormat {
            items: self.repo.get_items()?,
        })
    }

    pub fn catalog_file_name(&self) -> &str {
        self.repo.get_file_name()
    }
}
