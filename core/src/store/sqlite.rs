//! SQLite-backed object store.
//!
//! RULE: Only this file talks to the database.

use super::{validate_key, ObjectStore};
use crate::{error::PipelineResult, types::ObjectKey};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteObjectStore {
    conn: Connection,
    bucket: String,
}

impl SqliteObjectStore {
    /// Open (or create) the store database at `path`.
    pub fn open(path: &str, bucket: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            bucket: bucket.to_string(),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(bucket: &str) -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            bucket: bucket.to_string(),
        })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_object_store.sql"))?;
        Ok(())
    }

    /// How many times `key` has been written. None if it was never written.
    pub fn version(&self, key: &str) -> PipelineResult<Option<i64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM object WHERE bucket = ?1 AND key = ?2",
                params![self.bucket, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl ObjectStore for SqliteObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put(&self, key: &str, body: &[u8]) -> PipelineResult<()> {
        validate_key(key)?;
        self.conn.execute(
            "INSERT INTO object (bucket, key, body, size, version)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(bucket, key) DO UPDATE SET
                body = excluded.body,
                size = excluded.size,
                version = object.version + 1",
            params![self.bucket, key, body, body.len() as i64],
        )?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, body: &[u8]) -> PipelineResult<bool> {
        validate_key(key)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO object (bucket, key, body, size, version)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![self.bucket, key, body, body.len() as i64],
        )?;
        Ok(inserted == 1)
    }

    fn get(&self, key: &str) -> PipelineResult<Option<Vec<u8>>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM object WHERE bucket = ?1 AND key = ?2",
                params![self.bucket, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn list(&self, prefix: &str) -> PipelineResult<Vec<ObjectKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT key FROM object
             WHERE bucket = ?1 AND substr(key, 1, length(?2)) = ?2
             ORDER BY key ASC",
        )?;
        let keys = stmt
            .query_map(params![self.bucket, prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
