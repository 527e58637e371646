//! Add-item request decoding and validation.
//!
//! # Responsibility
//! - Decode `multipart/form-data` bodies into named text fields and files.
//! - Turn decoded forms into a fully validated `AddItemRequest`.
//!
//! # Invariants
//! - An `AddItemRequest` is never partially valid: every field is non-empty.
//! - A zero-length `image` part is treated exactly like a missing one.
//! - Parsing never touches storage.

use crate::model::item::{NewItem, ValidationError};
use bytes::Bytes;
use futures::executor::block_on;
use futures::stream;
use std::collections::HashMap;
use std::convert::Infallible;

pub const NAME_FIELD: &str = "name";
pub const CATEGORY_FIELD: &str = "category";
pub const IMAGE_FIELD: &str = "image";

/// Read access to a decoded form submission.
pub trait FormData {
    /// Returns the named text field, or `""` when absent.
    fn text_field(&self, name: &str) -> &str;
    /// Returns the named file part payload, if present.
    fn file_part(&self, name: &str) -> Option<&[u8]>;
}

/// Fully buffered `multipart/form-data` submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl MultipartForm {
    /// Decodes `body` using the boundary declared in `content_type`.
    ///
    /// Parts with a file name become file parts; the rest are text fields.
    /// When a name repeats, the first occurrence wins.
    ///
    /// # Errors
    /// - `MalformedBody` when the content type has no boundary or the body
    ///   does not parse.
    pub fn decode(content_type: &str, body: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|err| ValidationError::MalformedBody(err.to_string()))?;
        let body = body.into();
        let source = stream::once(async move { Ok::<Bytes, Infallible>(body) });
        let multipart = multer::Multipart::new(source, boundary);
        block_on(read_form(multipart))
    }

    /// Adds a text field, replacing any previous value.
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Adds a file part, replacing any previous payload.
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), data.into());
        self
    }
}

impl FormData for MultipartForm {
    fn text_field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    fn file_part(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }
}

async fn read_form(mut multipart: multer::Multipart<'_>) -> Result<MultipartForm, ValidationError> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if field.file_name().is_some() {
            let data = field.bytes().await.map_err(malformed)?;
            form.files.entry(name).or_insert_with(|| data.to_vec());
        } else {
            let text = field.text().await.map_err(malformed)?;
            form.fields.entry(name).or_insert(text);
        }
    }
    Ok(form)
}

fn malformed(err: multer::Error) -> ValidationError {
    ValidationError::MalformedBody(err.to_string())
}

/// Validated add-item submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemRequest {
    name: String,
    category: String,
    image: Vec<u8>,
}

impl AddItemRequest {
    /// Validates a decoded form.
    ///
    /// # Errors
    /// Checked in order: `EmptyName`, `EmptyCategory`, `EmptyImage`.
    pub fn from_form(form: &impl FormData) -> Result<Self, ValidationError> {
        let name = form.text_field(NAME_FIELD);
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let category = form.text_field(CATEGORY_FIELD);
        if category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        let image = match form.file_part(IMAGE_FIELD) {
            Some(image) if !image.is_empty() => image,
            _ => return Err(ValidationError::EmptyImage),
        };

        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            image: image.to_vec(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Splits into the repository insert payload and the image bytes.
    pub fn into_parts(self) -> (NewItem, Vec<u8>) {
        (NewItem::new(self.name, self.category), self.image)
    }
}

/// Validates a decoded form into an `AddItemRequest`.
pub fn parse_add_item_request(form: &impl FormData) -> Result<AddItemRequest, ValidationError> {
    AddItemRequest::from_form(form)
}

/// Decodes and validates a raw multipart submission in one step.
pub fn parse_multipart(
    content_type: &str,
    body: impl Into<Bytes>,
) -> Result<AddItemRequest, ValidationError> {
    let form = MultipartForm::decode(content_type, body)?;
    AddItemRequest::from_form(&form)
}
