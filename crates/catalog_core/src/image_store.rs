//! Filesystem-backed image blob storage.
//!
//! # Responsibility
//! - Persist raw image bytes under a stable reference name.
//! - Derive content-based names for images submitted without one.
//!
//! # Invariants
//! - Reference names are plain file names; no path segments are accepted.
//! - A failed write never leaves a truncated file under the final name.
//! - Calls are independent: no implicit rename, dedup or deletion.

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CONTENT_NAME_EXTENSION: &str = "jpg";

static IMAGE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid image name regex"));

pub type ImageResult<T> = Result<T, ImageError>;

#[derive(Debug)]
pub enum ImageError {
    /// Name is empty or not a plain file name.
    InvalidName(String),
    Io {
        op: &'static str,
        name: String,
        source: io::Error,
    },
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid image name `{name}`"),
            Self::Io { op, name, source } => {
                write!(f, "image {op} failed for `{name}`: {source}")
            }
        }
    }
}

impl Error for ImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(_) => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Image blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the content-derived reference name for `bytes`.
    ///
    /// Format: `<sha256-hex>.jpg`.
    pub fn content_name(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        format!("{}.{CONTENT_NAME_EXTENSION}", hex::encode(digest))
    }

    /// Writes `bytes` under `file_name`, creating or replacing it.
    ///
    /// The payload goes to a uniquely named temp file first and is renamed
    /// into place, so concurrent writers of one name are last-writer-wins.
    /// Temp names have a fixed length and never match a valid image name.
    ///
    /// # Errors
    /// - `InvalidName` when `file_name` is not a plain file name.
    /// - `Io` when the directory, temp file, write or rename fails.
    pub fn store(&self, file_name: &str, bytes: &[u8]) -> ImageResult<()> {
        let target = self.path_for(file_name)?;
        fs::create_dir_all(&self.root).map_err(|err| io_error("create_dir", file_name, err))?;

        let temp_path = self
            .root
            .join(format!(".{}.tmp", Uuid::new_v4().simple()));
        if let Err(err) = write_file(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            error!(
                "event=image_store module=image_store status=error op=write size={} error={}",
                bytes.len(),
                err
            );
            return Err(io_error("write", file_name, err));
        }

        if let Err(err) = fs::rename(&temp_path, &target) {
            let _ = fs::remove_file(&temp_path);
            error!(
                "event=image_store module=image_store status=error op=rename error={}",
                err
            );
            return Err(io_error("rename", file_name, err));
        }

        info!(
            "event=image_store module=image_store status=ok size={}",
            bytes.len()
        );
        Ok(())
    }

    /// Returns whether an image is stored under `file_name`.
    pub fn exists(&self, file_name: &str) -> ImageResult<bool> {
        let path = self.path_for(file_name)?;
        path.try_exists()
            .map_err(|err| io_error("exists", file_name, err))
    }

    /// Reads the stored image bytes.
    pub fn read(&self, file_name: &str) -> ImageResult<Vec<u8>> {
        let path = self.path_for(file_name)?;
        fs::read(path).map_err(|err| io_error("read", file_name, err))
    }

    /// Removes a stored image. Missing files are not an error.
    pub fn remove(&self, file_name: &str) -> ImageResult<()> {
        let path = self.path_for(file_name)?;
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("event=image_remove module=image_store status=ok");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                warn!(
                    "event=image_remove module=image_store status=error error={}",
                    err
                );
                Err(io_error("remove", file_name, err))
            }
        }
    }

    fn path_for(&self, file_name: &str) -> ImageResult<PathBuf> {
        if !is_valid_image_name(file_name) {
            return Err(ImageError::InvalidName(file_name.to_string()));
        }
        Ok(self.root.join(file_name))
    }
}

/// Returns whether `name` is acceptable as an image reference name.
pub fn is_valid_image_name(name: &str) -> bool {
    IMAGE_NAME_RE.is_match(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn io_error(op: &'static str, name: &str, source: io::Error) -> ImageError {
    ImageError::Io {
        op,
        name: name.to_string(),
        source,
    }
}
