//! SQLite Backend Module
//!
//! Relational single-table store. Every write commits immediately, so
//! entries are durable without an explicit flush.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{ensure_parent_dir, CacheBackend};
use crate::cache::CacheEntry;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, FunctionId};

/// Timestamp format stored by the database: local time at one-second
/// resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// == SQLite Backend ==
/// Relational store keyed by function name and argument bytes.
///
/// The connection is opened lazily and the table created on first use.
/// Lookups match the argument blob by exact byte equality, so argument
/// serialization must be stable across calls for a hit to occur.
#[derive(Debug)]
pub struct SqliteBackend {
    file_path: PathBuf,
    /// Lazily opened connection; `None` until first use.
    conn: Option<Connection>,
}

impl SqliteBackend {
    // == Constructors ==
    /// Creates a backend storing its database at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            conn: None,
        }
    }

    /// Creates a backend at the configured cache directory.
    pub fn at_default_location(config: &CacheConfig) -> Self {
        Self::new(config.cache_dir.join("data.sqlite"))
    }

    /// Path of the database file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Lazily opens the connection and ensures the cache table exists.
    fn connection(&mut self) -> Result<&Connection> {
        if self.conn.is_none() {
            ensure_parent_dir(&self.file_path)?;
            let conn = Connection::open(&self.file_path).map_err(|e| {
                CacheError::Backend(format!(
                    "failed to open {}: {e}",
                    self.file_path.display()
                ))
            })?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS cache (
                    id INTEGER PRIMARY KEY,
                    function TEXT NOT NULL,
                    args BLOB NOT NULL,
                    result BLOB NOT NULL,
                    timestamp TEXT NOT NULL
                        DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now', 'localtime'))
                )",
                [],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
            self.conn = Some(conn);
        }
        match &self.conn {
            Some(conn) => Ok(conn),
            None => Err(CacheError::Backend("connection was not opened".into())),
        }
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
        let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map_err(|e| CacheError::Backend(format!("unreadable timestamp {raw:?}: {e}")))?;
        naive.and_local_timezone(Local).earliest().ok_or_else(|| {
            CacheError::Backend(format!("timestamp {raw:?} has no local representation"))
        })
    }
}

impl CacheBackend for SqliteBackend {
    type ArgRepr = Vec<u8>;
    type Repr = Vec<u8>;

    fn hash_key<A>(&self, func: &FunctionId, args: &A) -> Result<CacheKey<Vec<u8>>>
    where
        A: Serialize + ?Sized,
    {
        let blob =
            bincode::serialize(args).map_err(|e| CacheError::KeyDerivation(e.to_string()))?;
        Ok(CacheKey::new(func.qualified(), blob))
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        bincode::serialize(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode<T>(&self, repr: &Vec<u8>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        bincode::deserialize(repr.as_slice()).map_err(|e| CacheError::Decode(e.to_string()))
    }

    fn get(&mut self, key: &CacheKey<Vec<u8>>) -> Result<Option<CacheEntry<Vec<u8>>>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                "SELECT result, timestamp FROM cache
                 WHERE function = ?1 AND args = ?2",
                params![key.function, key.args],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        match row {
            Some((payload, raw)) => Ok(Some(CacheEntry::at(
                Self::parse_timestamp(&raw)?,
                payload,
            ))),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &CacheKey<Vec<u8>>, repr: Vec<u8>) -> Result<()> {
        // Delete-then-insert keeps at most one row per key even when an
        // earlier lookup failure was degraded to a miss.
        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM cache WHERE function = ?1 AND args = ?2",
            params![key.function, key.args],
        )
        .map_err(|e| CacheError::Backend(e.to_string()))?;
        // The timestamp column fills from its database-side default.
        conn.execute(
            "INSERT INTO cache (function, args, result) VALUES (?1, ?2, ?3)",
            params![key.function, key.args, repr],
        )
        .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete(&mut self, key: &CacheKey<Vec<u8>>) -> Result<()> {
        self.connection()?
            .execute(
                "DELETE FROM cache WHERE function = ?1 AND args = ?2",
                params![key.function, key.args],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete_function(&mut self, func: &FunctionId) -> Result<()> {
        self.connection()?
            .execute(
                "DELETE FROM cache WHERE function = ?1",
                params![func.qualified()],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    fn persist(&mut self) -> Result<PathBuf> {
        // Every write commits immediately; there is nothing to flush.
        Ok(self.file_path.clone())
    }
}
