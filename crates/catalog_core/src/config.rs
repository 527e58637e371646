//! Static catalog configuration.
//!
//! # Responsibility
//! - Hold the paths and names the core is wired with at startup.
//! - Apply `CATALOG_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - Configuration is read once; nothing here touches storage.

use crate::logging::default_log_level;
use crate::repo::item_repo::DEFAULT_CATALOG_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CATALOG_DB_PATH";
pub const ENV_IMAGE_DIR: &str = "CATALOG_IMAGE_DIR";
pub const ENV_FILE_NAME: &str = "CATALOG_FILE_NAME";
pub const ENV_LOG_LEVEL: &str = "CATALOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CATALOG_LOG_DIR";

const DEFAULT_DB_PATH: &str = "db/catalog.sqlite3";
const DEFAULT_IMAGE_DIR: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory holding stored images.
    pub image_dir: PathBuf,
    /// Logical name of the catalog snapshot artifact.
    pub catalog_file_name: String,
    pub log_level: String,
    /// Absolute log directory. File logging is off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            catalog_file_name: DEFAULT_CATALOG_FILE_NAME.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = value(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = value(ENV_IMAGE_DIR) {
            config.image_dir = PathBuf::from(dir);
        }
        if let Some(name) = value(ENV_FILE_NAME) {
            config.catalog_file_name = name;
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }
}
