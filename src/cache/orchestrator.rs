//! Cache Orchestrator Module
//!
//! The single deterministic cache-or-call pass shared by every wrapper
//! shape. Each call walks: compute key, look up, judge freshness,
//! decode-or-recompute, re-encode-and-store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::TimeDelta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::key::{CacheKey, FunctionId};

// == Lookup Outcome ==
/// Outcome of the key/lookup phase of one call.
pub(crate) enum Lookup<K, R> {
    /// Skip the cache entirely and invoke directly: the cache is disabled
    /// or no key could be derived for this call.
    Bypass,
    /// A fresh entry decoded successfully; no invocation needed.
    Fresh(R),
    /// Miss, stale entry, or corrupt entry: invoke the callable and store
    /// the result under this key.
    Recompute(CacheKey<K>),
}

/// Locks a shared backend handle, recovering from poisoned locks.
pub(crate) fn lock<B>(backend: &Mutex<B>) -> MutexGuard<'_, B> {
    backend.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Lookup Phase ==
/// Walks the read side of the state machine. Backend read errors degrade
/// to a miss; key derivation errors degrade to a bypass. Nothing here
/// invokes the callable.
pub(crate) fn lookup<B, A, R>(
    backend: &Mutex<B>,
    config: &CacheConfig,
    func: &FunctionId,
    lifespan: TimeDelta,
    args: &A,
) -> Lookup<B::ArgRepr, R>
where
    B: CacheBackend,
    A: Serialize + ?Sized,
    R: DeserializeOwned,
{
    if config.disable {
        debug!(function = %func, "cache disabled, invoking directly");
        return Lookup::Bypass;
    }

    let mut backend = lock(backend);

    let key = match backend.hash_key(func, args) {
        Ok(key) => key,
        Err(e) => {
            // Unrepresentable arguments bypass the cache for this call.
            warn!(function = %func, "failed to derive cache key: {e}");
            return Lookup::Bypass;
        }
    };

    let entry = match backend.get(&key) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(function = %func, "cache lookup failed: {e}");
            None
        }
    };

    if let Some(entry) = entry {
        if !config.refresh && entry.is_fresh(lifespan) {
            match backend.decode(&entry.payload) {
                Ok(value) => {
                    debug!(function = %func, "fresh cache hit");
                    return Lookup::Fresh(value);
                }
                // A payload that no longer decodes is treated as stale;
                // this happens when the stored layout of the value type
                // changed between writes.
                Err(e) => warn!(function = %func, "failed to decode cache entry: {e}"),
            }
        }
        // Stale, corrupt, or refresh-forced: evict before recomputing so
        // at most one entry exists per key.
        if let Err(e) = backend.delete(&key) {
            warn!(function = %func, "failed to evict cache entry: {e}");
        }
    }

    Lookup::Recompute(key)
}

// == Store Phase ==
/// Best-effort persist of a freshly computed result. Encode and write
/// failures are logged, never raised; the caller already holds the result.
pub(crate) fn store<B, R>(backend: &Mutex<B>, key: &CacheKey<B::ArgRepr>, result: &R)
where
    B: CacheBackend,
    R: Serialize,
{
    let mut backend = lock(backend);
    match backend.encode(result) {
        Ok(repr) => {
            if let Err(e) = backend.put(key, repr) {
                warn!("failed to store cache entry: {e}");
            }
        }
        Err(e) => warn!("failed to encode result for caching: {e}"),
    }
}

// == Cache Or Call ==
/// Runs the full pass for a synchronous callable. The backend lock is
/// released while the callable runs, so concurrent calls with the same key
/// may both invoke; the second writer wins.
///
/// A callable error propagates unmodified and writes nothing.
pub(crate) fn run<B, A, R, E, F>(
    backend: &Mutex<B>,
    config: &CacheConfig,
    func: &FunctionId,
    lifespan: TimeDelta,
    args: &A,
    call: F,
) -> std::result::Result<R, E>
where
    B: CacheBackend,
    A: Serialize + ?Sized,
    R: Serialize + DeserializeOwned,
    F: FnOnce() -> std::result::Result<R, E>,
{
    match lookup(backend, config, func, lifespan, args) {
        Lookup::Fresh(value) => Ok(value),
        Lookup::Bypass => call(),
        Lookup::Recompute(key) => {
            let result = call()?;
            store(backend, &key, &result);
            Ok(result)
        }
    }
}

/// Clears every stored entry for one function. Unlike the call path, a
/// backend failure here surfaces to the caller: persistence is the
/// requested operation and there is no computed result to fall back to.
pub(crate) fn clear<B>(backend: &Mutex<B>, func: &FunctionId) -> Result<()>
where
    B: CacheBackend,
{
    lock(backend).delete_function(func)
}
