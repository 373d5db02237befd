//! JSON Backend Module
//!
//! Flat key-value store persisted as a single structured text dump.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::backend::{ensure_parent_dir, text_signature, CacheBackend};
use crate::cache::{from_epoch_seconds, to_epoch_seconds, CacheEntry};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, FunctionId};

/// Two-level map: function -> argument signature -> (epoch seconds,
/// payload).
type Table<P> = HashMap<String, HashMap<String, (f64, P)>>;

// == JSON Backend ==
/// Flat file store holding its whole dataset in memory and dumping it as
/// JSON.
///
/// The dataset is loaded lazily on first access; a missing, empty, or
/// corrupt dump starts from an empty state. In-memory state is flushed by
/// [`persist`](CacheBackend::persist) and again when the handle is
/// dropped. Only values representable in JSON round-trip through this
/// backend.
#[derive(Debug)]
pub struct JsonBackend {
    file_path: PathBuf,
    /// Lazily loaded dataset; `None` until first touched.
    data: Option<Table<Value>>,
}

impl JsonBackend {
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
        Self::new(config.cache_dir.join("data.json"))
    }

    /// Path of the on-disk dump.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Lazily loads the dataset from disk on first access.
    fn data(&mut self) -> &mut Table<Value> {
        self.data.get_or_insert_with(|| load(&self.file_path))
    }
}

/// Missing, empty, or corrupt dumps start from an empty table.
fn load(path: &Path) -> Table<Value> {
    fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

impl CacheBackend for JsonBackend {
    type ArgRepr = String;
    type Repr = Value;

    fn hash_key<A>(&self, func: &FunctionId, args: &A) -> Result<CacheKey<String>>
    where
        A: Serialize + ?Sized,
    {
        Ok(CacheKey::new(func.qualified(), text_signature(args)?))
    }

    fn encode<T>(&self, value: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode<T>(&self, repr: &Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(repr.clone()).map_err(|e| CacheError::Decode(e.to_string()))
    }

    fn get(&mut self, key: &CacheKey<String>) -> Result<Option<CacheEntry<Value>>> {
        Ok(self
            .data()
            .get(&key.function)
            .and_then(|per_fn| per_fn.get(&key.args))
            .map(|(stored_at, payload)| {
                CacheEntry::at(from_epoch_seconds(*stored_at), payload.clone())
            }))
    }

    fn put(&mut self, key: &CacheKey<String>, repr: Value) -> Result<()> {
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
        let bytes = serde_json::to_vec(&*data).map_err(|e| CacheError::Backend(e.to_string()))?;
        fs::write(&self.file_path, bytes).map_err(|e| {
            CacheError::Backend(format!("failed to write {}: {e}", self.file_path.display()))
        })?;
        Ok(self.file_path.clone())
    }
}

impl Drop for JsonBackend {
    /// Flushes the loaded dataset so a dropped handle behaves like a
    /// scoped close.
    fn drop(&mut self) {
        if self.data.is_some() {
            if let Err(e) = self.persist() {
                warn!("failed to flush JSON cache store: {e}");
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_key(backend: &JsonBackend, args: &(i64, &str)) -> CacheKey<String> {
        backend
            .hash_key(&FunctionId::new("tests", "func"), args)
            .unwrap()
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let mut backend = JsonBackend::new(dir.path().join("data.json"));

        let key = test_key(&backend, &(1, "a"));
        let repr = backend.encode(&"result").unwrap();
        backend.put(&key, repr).unwrap();

        let entry = backend.get(&key).unwrap().expect("entry should exist");
        let decoded: String = backend.decode(&entry.payload).unwrap();
        assert_eq!(decoded, "result");
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let mut backend = JsonBackend::new(dir.path().join("absent.json"));
        let key = test_key(&backend, &(1, "a"));
        assert!(backend.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, b"{ not json").unwrap();

        let mut backend = JsonBackend::new(&path);
        let key = test_key(&backend, &(1, "a"));
        assert!(backend.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_persist_then_reload_in_fresh_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        let mut backend = JsonBackend::new(&path);
        let key = test_key(&backend, &(7, "x"));
        let repr = backend.encode(&vec![1, 2, 3]).unwrap();
        backend.put(&key, repr).unwrap();
        let location = backend.persist().unwrap();
        assert_eq!(location, path);

        let mut reloaded = JsonBackend::new(&path);
        let entry = reloaded.get(&key).unwrap().expect("persisted entry");
        let decoded: Vec<i32> = reloaded.decode(&entry.payload).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_flushes_loaded_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let key;
        {
            let mut backend = JsonBackend::new(&path);
            key = test_key(&backend, &(7, "x"));
            let repr = backend.encode(&"kept").unwrap();
            backend.put(&key, repr).unwrap();
        }
        let mut reloaded = JsonBackend::new(&path);
        assert!(reloaded.get(&key).unwrap().is_some());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut backend = JsonBackend::new(dir.path().join("data.json"));
        let key = test_key(&backend, &(1, "a"));

        backend.delete(&key).unwrap();
        let repr = backend.encode(&1).unwrap();
        backend.put(&key, repr).unwrap();
        backend.delete(&key).unwrap();
        backend.delete(&key).unwrap();
        assert!(backend.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_delete_function_clears_all_entries() {
        let dir = tempdir().unwrap();
        let mut backend = JsonBackend::new(dir.path().join("data.json"));
        let func = FunctionId::new("tests", "func");

        for n in 0..3 {
            let key = backend.hash_key(&func, &(n,)).unwrap();
            let repr = backend.encode(&n).unwrap();
            backend.put(&key, repr).unwrap();
        }
        backend.delete_function(&func).unwrap();

        let key = backend.hash_key(&func, &(0,)).unwrap();
        assert!(backend.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_decode_mismatched_shape_fails() {
        let dir = tempdir().unwrap();
        let backend = JsonBackend::new(dir.path().join("data.json"));
        let repr = backend.encode(&"text").unwrap();
        let result: Result<Vec<u32>> = backend.decode(&repr);
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }
}
