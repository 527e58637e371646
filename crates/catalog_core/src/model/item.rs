//! Item and category domain model.
//!
//! # Responsibility
//! - Define the catalog record returned by every read path.
//! - Define the insert payload and its write-time validation.
//!
//! # Invariants
//! - `Item::category` is always a category *name* resolved through the
//!   category dictionary, never the raw storage id.
//! - `Item::id` is assigned by storage and never client-supplied on create.
//! - A `NewItem` with an empty name or category never reaches storage.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned item identifier.
pub type ItemId = i64;

/// Storage-assigned category identifier.
pub type CategoryId = i64;

/// Catalog record as seen by readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Internal key; not part of the wire shape.
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    /// Category name, joined from the category dictionary.
    pub category: String,
    /// Stored image reference, empty when no image was supplied.
    pub image_name: String,
}

/// One row of the category dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Snapshot envelope used when a full catalog is exported or imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFormat {
    pub items: Vec<Item>,
}

/// Insert payload for the item repository.
///
/// Carries a human-readable category name; the repository resolves it to a
/// `CategoryId` at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    /// Explicit stored image name. Empty means "derive from image bytes".
    pub image_name: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            image_name: String::new(),
        }
    }

    /// Sets an explicit stored image name.
    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = image_name.into();
        self
    }

    /// Validates write-time invariants.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is empty.
    /// - `EmptyCategory` when `category` is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        Ok(())
    }
}

/// Caller-correctable input error for item submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    EmptyCategory,
    /// No `image` part, or a zero-length one.
    EmptyImage,
    /// Body could not be decoded as `multipart/form-data`.
    MalformedBody(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name is required"),
            Self::EmptyCategory => write!(f, "category is required"),
            Self::EmptyImage => write!(f, "image is required"),
            Self::MalformedBody(message) => write!(f, "malformed multipart body: {message}"),
        }
    }
}

impl Error for ValidationError {}
