//! Storage Backend Module
//!
//! The pluggable persistence contract and its three interchangeable
//! implementations: a flat JSON store, a binary flat store, and a
//! relational single-table store.

mod binary;
mod json;
mod sqlite;

// Re-export public types
pub use binary::BinaryBackend;
pub use json::JsonBackend;
pub use sqlite::SqliteBackend;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, FunctionId};

// == Cache Backend Trait ==
/// Durable mapping from cache keys to timestamped encoded results.
///
/// Expiry judgment belongs to the orchestrator: `get` reports whatever is
/// stored without side effects, and `put` stamps entries with the write
/// time. Argument and payload encodings are backend-specific, so key
/// hashing and the codec live on this trait rather than on the callers.
pub trait CacheBackend {
    /// Argument-signature representation used in this backend's keys.
    type ArgRepr: Clone;
    /// Encoded payload representation persisted by this backend.
    type Repr;

    /// Derives the deterministic key for one call.
    ///
    /// Pure: identical function identity and arguments always yield an
    /// identical key, across calls and across process runs.
    fn hash_key<A>(&self, func: &FunctionId, args: &A) -> Result<CacheKey<Self::ArgRepr>>
    where
        A: Serialize + ?Sized;

    /// Encodes a result value into this backend's storage representation.
    fn encode<T>(&self, value: &T) -> Result<Self::Repr>
    where
        T: Serialize + ?Sized;

    /// Decodes a storage representation back into a result value.
    fn decode<T>(&self, repr: &Self::Repr) -> Result<T>
    where
        T: DeserializeOwned;

    /// Point lookup. Expired entries are still returned; freshness is the
    /// orchestrator's call.
    fn get(&mut self, key: &CacheKey<Self::ArgRepr>) -> Result<Option<CacheEntry<Self::Repr>>>;

    /// Stores a result under a key, stamped with the current time.
    fn put(&mut self, key: &CacheKey<Self::ArgRepr>, repr: Self::Repr) -> Result<()>;

    /// Removes one entry. Idempotent: deleting an absent key is not an
    /// error.
    fn delete(&mut self, key: &CacheKey<Self::ArgRepr>) -> Result<()>;

    /// Removes every entry for one function. Idempotent.
    fn delete_function(&mut self, func: &FunctionId) -> Result<()>;

    /// Flushes in-memory state for file-backed stores and returns the
    /// storage location.
    fn persist(&mut self) -> Result<PathBuf>;
}

// == Shared Helpers ==
/// Canonical text signature used by the flat file stores.
///
/// Rendered through JSON, which is order-sensitive and stable for a given
/// argument type. Map-shaped arguments must use ordered maps for the
/// signature to be reproducible across runs.
pub(crate) fn text_signature<A>(args: &A) -> Result<String>
where
    A: Serialize + ?Sized,
{
    let rendered =
        serde_json::to_string(args).map_err(|e| CacheError::KeyDerivation(e.to_string()))?;
    Ok(format!("args: {rendered}"))
}

/// Ensures the parent directory of a store file exists before the first
/// write.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                CacheError::Backend(format!(
                    "failed to create cache directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    Ok(())
}
