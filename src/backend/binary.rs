//! Binary Backend Module
//!
//! Flat key-value store persisted through a binary serialization, so any
//! serde-serializable value round-trips, not just JSON-representable ones.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::backend::{ensure_parent_dir, text_signature, CacheBackend};
use crate::cache::{from_epoch_seconds, to_epoch_seconds, CacheEntry};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, FunctionId};

/// Same two-level shape as the JSON store, with byte payloads.
type Table = HashMap<String, HashMap<String, (f64, Vec<u8>)>>;

// == Binary Backend ==
/// Flat file store with a bincode dump.
///
/// Shares the JSON store's lifecycle: lazily loaded, tolerant of missing
/// or corrupt dumps, flushed by [`persist`](CacheBackend::persist) and on
/// drop.
#[derive(Debug)]
pub struct BinaryBackend {
    file_path: PathBuf,
    /// Lazily loaded dataset; `None` until first touched.
    data: Option<Table>,
}

impl BinaryBackend {
    // == Constructors ==
    /// Creates a backend storing its dump at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            data: None,
        }
    }

    /// Creates a backend at the configured cache directory.
    pub fn at_default_location(config: &CacheConfig) -> Self {
        Self::new(config.cache_dir.join("data.bin"))
    }

    /// Path of the on-disk dump.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn data(&mut self) -> &mut Table {
        self.data.get_or_insert_with(|| load(&self.file_path))
    }
}

/// Missing, empty, or corrupt dumps start from an empty table.
fn load(path: &Path) -> Table {
    fs::read(path)
        .ok()
        .and_then(|bytes| bincode::deserialize(&bytes).ok())
        .unwrap_or_default()
}

impl CacheBackend for BinaryBackend {
    type ArgRepr = String;
    type Repr = Vec<u8>;

    fn hash_key<A>(&self, func: &FunctionId, args: &A) -> Result<CacheKey<String>>
    where
        A: Serialize + ?Sized,
    {
        Ok(CacheKey::new(func.qualified(), text_signature(args)?))
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

    fn get(&mut self, key: &CacheKey<String>) -> Result<Option<CacheEntry<Vec<u8>>>> {
        Ok(self
            .data()
            .get(&key.function)
            .and_then(|per_fn| per_fn.get(&key.args))
            .map(|(stored_at, payload)| {
                CacheEntry::at(from_epoch_seconds(*stored_at), payload.clone())
            }))
    }

    fn put(&mut self, key: &CacheKey<String>, repr: Vec<u8>) -> Result<()> {
        let stored_at = to_epoch_seconds(Local::now());
        self.data()
            .entry(key.function.clone())
            .or_default()
            .insert(key.args.clone(), (stored_at, repr));
        Ok(())
    }

    fn delete(&mut self, key: &CacheKey<String>) -> Result<()> {
        if let Some(per_fn) = self.data().get_mut(&key.function) {
            per_fn.remove(&key.args);
        }
        Ok(())
    }

    fn delete_function(&mut self, func: &FunctionId) -> Result<()> {
        self.data().remove(&func.qualified());
        Ok(())
    }

    fn persist(&mut self) -> Result<PathBuf> {
        ensure_parent_dir(&self.file_path)?;
        let data = self.data();
        let bytes = bincode::serialize(&*data).map_err(|e| CacheError::Backend(e.to_string()))?;
        fs::write(&self.file_path, bytes).map_err(|e| {
            CacheError::Backend(format!("failed to write {}: {e}", self.file_path.display()))
        })?;
        Ok(self.file_path.clone())
    }
}

impl Drop for BinaryBackend {
    /// Flushes the loaded dataset so a dropped handle behaves like a
    /// scoped close.
    fn drop(&mut self) {
        if self.data.is_some() {
            if let Err(e) = self.persist() {
                warn!("failed to flush binary cache store: {e}");
            }
        }
    }
}
