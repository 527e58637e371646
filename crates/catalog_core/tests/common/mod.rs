//! Shared fixtures for catalog integration tests.

#![allow(dead_code)]

use catalog_core::{open_pool, open_pool_in_memory, DbPool, ImageStore, SqliteItemRepository};
use tempfile::TempDir;

pub const BOUNDARY: &str = "catalog-test-boundary";

/// Builds `multipart/form-data` bodies the way a browser form would.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Repository over a fresh in-memory pool and a scratch image directory.
pub struct Fixture {
    pub pool: DbPool,
    pub repo: SqliteItemRepository,
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool_in_memory().unwrap();
        let images = ImageStore::new(dir.path().join("images"));
        let repo = SqliteItemRepository::try_new(pool.clone(), images, "items.json").unwrap();
        Self { pool, repo, dir }
    }

    /// Same as `new`, but backed by a database file so pooled connections
    /// contend on real SQLite file locks.
    pub fn on_disk() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool(dir.path().join("catalog.sqlite3")).unwrap();
        let images = ImageStore::new(dir.path().join("images"));
        let repo = SqliteItemRepository::try_new(pool.clone(), images, "items.json").unwrap();
        Self { pool, repo, dir }
    }

    pub fn count(&self, table: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }
}
