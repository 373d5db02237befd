//! Cache Wrapper Module
//!
//! Adapts the orchestrator to the shapes callables come in: plain
//! functions, fallible functions, async functions, and instance methods.
//! [`CacheBuilder`] carries the backend handle, lifespan, and override
//! configuration, and produces one wrapper per callable.

use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::TimeDelta;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::orchestrator::{self, Lookup};
use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::key::FunctionId;
use crate::lifespan::Lifespan;

// == Cache Builder ==
/// Wrap-time configuration: a storage backend, a freshness window, and
/// the process-wide overrides.
///
/// ```ignore
/// let cache = CacheBuilder::new(SqliteBackend::at_default_location(&config))
///     .lifespan(Lifespan::minutes(30));
/// let fetch = cache.wrap(function_id!("fetch"), |city: &String| lookup_weather(city));
/// let report = fetch.call(&"Oslo".to_string());
/// ```
pub struct CacheBuilder<B> {
    backend: Arc<Mutex<B>>,
    lifespan: Lifespan,
    config: CacheConfig,
}

impl<B: CacheBackend> CacheBuilder<B> {
    // == Constructors ==
    /// Creates a builder owning the backend. Overrides load from the
    /// environment; use [`config`](Self::config) to replace them.
    pub fn new(backend: B) -> Self {
        Self::with_shared(Arc::new(Mutex::new(backend)))
    }

    /// Creates a builder over an already-shared backend handle, so
    /// several builders can feed one store.
    pub fn with_shared(backend: Arc<Mutex<B>>) -> Self {
        Self {
            backend,
            lifespan: Lifespan::default(),
            config: CacheConfig::from_env(),
        }
    }

    /// Sets the freshness window for wrappers built from here on.
    pub fn lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// Replaces the override configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared backend handle.
    pub fn backend_handle(&self) -> Arc<Mutex<B>> {
        Arc::clone(&self.backend)
    }

    // == Wrappers ==
    /// Wraps a plain function.
    pub fn wrap<F, A, R>(&self, id: FunctionId, func: F) -> CachedFn<B, F, A, R>
    where
        F: Fn(&A) -> R,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        CachedFn {
            id,
            lifespan: self.lifespan.delta(),
            config: self.config.clone(),
            backend: Arc::clone(&self.backend),
            func,
            _marker: PhantomData,
        }
    }

    /// Wraps a fallible function. Only successful results are persisted;
    /// errors propagate unmodified and write nothing.
    pub fn wrap_fallible<F, A, R, E>(&self, id: FunctionId, func: F) -> CachedTryFn<B, F, A, R>
    where
        F: Fn(&A) -> std::result::Result<R, E>,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        CachedTryFn {
            id,
            lifespan: self.lifespan.delta(),
            config: self.config.clone(),
            backend: Arc::clone(&self.backend),
            func,
            _marker: PhantomData,
        }
    }

    /// Wraps an async function. Key, lookup, and store logic are shared
    /// with the synchronous shape; only the invocation suspends.
    pub fn wrap_async<F, A, Fut, R>(&self, id: FunctionId, func: F) -> CachedAsyncFn<B, F, A, R>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        CachedAsyncFn {
            id,
            lifespan: self.lifespan.delta(),
            config: self.config.clone(),
            backend: Arc::clone(&self.backend),
            func,
            _marker: PhantomData,
        }
    }

    /// Wraps an unbound method. The receiver is passed explicitly on each
    /// call and participates in the cache key.
    pub fn wrap_method<F, I, A, R>(&self, id: FunctionId, func: F) -> CachedMethod<B, F, I, A, R>
    where
        F: Fn(&I, &A) -> R,
        I: Serialize,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        CachedMethod {
            id,
            lifespan: self.lifespan.delta(),
            config: self.config.clone(),
            backend: Arc::clone(&self.backend),
            func,
            _marker: PhantomData,
        }
    }
}

impl<B> Clone for CacheBuilder<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            lifespan: self.lifespan,
            config: self.config.clone(),
        }
    }
}

// == Cached Function ==
/// A plain function behind the cache-or-call pass.
pub struct CachedFn<B, F, A, R> {
    id: FunctionId,
    lifespan: TimeDelta,
    config: CacheConfig,
    backend: Arc<Mutex<B>>,
    func: F,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<B, F, A, R> CachedFn<B, F, A, R>
where
    B: CacheBackend,
    F: Fn(&A) -> R,
    A: Serialize,
    R: Serialize + DeserializeOwned,
{
    /// Cache-or-call: serves a fresh stored result, otherwise invokes and
    /// stores.
    pub fn call(&self, args: &A) -> R {
        let outcome = orchestrator::run(
            &self.backend,
            &self.config,
            &self.id,
            self.lifespan,
            args,
            || Ok::<R, Infallible>((self.func)(args)),
        );
        match outcome {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Invokes the underlying function directly, touching no storage.
    pub fn call_uncached(&self, args: &A) -> R {
        (self.func)(args)
    }

    /// Removes every stored entry for this function.
    pub fn clear(&self) -> Result<()> {
        orchestrator::clear(&self.backend, &self.id)
    }

    /// Flushes the backend and returns the storage location.
    pub fn persist(&self) -> Result<PathBuf> {
        orchestrator::lock(&self.backend).persist()
    }

    /// Identity this wrapper caches under.
    pub fn function_id(&self) -> &FunctionId {
        &self.id
    }
}

// == Cached Fallible Function ==
/// A fallible function behind the cache-or-call pass. An `Err` return
/// propagates unmodified and writes no entry.
pub struct CachedTryFn<B, F, A, R> {
    id: FunctionId,
    lifespan: TimeDelta,
    config: CacheConfig,
    backend: Arc<Mutex<B>>,
    func: F,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<B, F, A, R> CachedTryFn<B, F, A, R>
where
    B: CacheBackend,
    A: Serialize,
    R: Serialize + DeserializeOwned,
{
    /// Cache-or-call for a fallible function.
    pub fn call<E>(&self, args: &A) -> std::result::Result<R, E>
    where
        F: Fn(&A) -> std::result::Result<R, E>,
    {
        orchestrator::run(
            &self.backend,
            &self.config,
            &self.id,
            self.lifespan,
            args,
            || (self.func)(args),
        )
    }

    /// Invokes the underlying function directly, touching no storage.
    pub fn call_uncached<E>(&self, args: &A) -> std::result::Result<R, E>
    where
        F: Fn(&A) -> std::result::Result<R, E>,
    {
        (self.func)(args)
    }

    /// Removes every stored entry for this function.
    pub fn clear(&self) -> Result<()> {
        orchestrator::clear(&self.backend, &self.id)
    }

    /// Flushes the backend and returns the storage location.
    pub fn persist(&self) -> Result<PathBuf> {
        orchestrator::lock(&self.backend).persist()
    }

    /// Identity this wrapper caches under.
    pub fn function_id(&self) -> &FunctionId {
        &self.id
    }
}

// == Cached Async Function ==
/// An async function behind the cache-or-call pass. The backend lock is
/// never held across the suspend point.
pub struct CachedAsyncFn<B, F, A, R> {
    id: FunctionId,
    lifespan: TimeDelta,
    config: CacheConfig,
    backend: Arc<Mutex<B>>,
    func: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<B, F, A, R> CachedAsyncFn<B, F, A, R>
where
    B: CacheBackend,
    A: Serialize,
    R: Serialize + DeserializeOwned,
{
    /// Cache-or-call: serves a fresh stored result without awaiting,
    /// otherwise awaits the wrapped future and stores its output.
    pub async fn call<Fut>(&self, args: A) -> R
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
    {
        match orchestrator::lookup(&self.backend, &self.config, &self.id, self.lifespan, &args) {
            Lookup::Fresh(value) => value,
            Lookup::Bypass => (self.func)(args).await,
            Lookup::Recompute(key) => {
                let result = (self.func)(args).await;
                orchestrator::store(&self.backend, &key, &result);
                result
            }
        }
    }

    /// Awaits the underlying function directly, touching no storage.
    pub async fn call_uncached<Fut>(&self, args: A) -> R
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
    {
        (self.func)(args).await
    }

    /// Removes every stored entry for this function.
    pub fn clear(&self) -> Result<()> {
        orchestrator::clear(&self.backend, &self.id)
    }

    /// Flushes the backend and returns the storage location.
    pub fn persist(&self) -> Result<PathBuf> {
        orchestrator::lock(&self.backend).persist()
    }

    /// Identity this wrapper caches under.
    pub fn function_id(&self) -> &FunctionId {
        &self.id
    }
}

// == Cached Method ==
/// An unbound method behind the cache-or-call pass.
///
/// The wrapper holds the unbound function; [`bind`](Self::bind) produces a
/// closure partially applied over one receiver. The receiver is part of
/// the cache key, so distinct receivers cache separately.
pub struct CachedMethod<B, F, I, A, R> {
    id: FunctionId,
    lifespan: TimeDelta,
    config: CacheConfig,
    backend: Arc<Mutex<B>>,
    func: F,
    _marker: PhantomData<fn(&I, &A) -> R>,
}

impl<B, F, I, A, R> CachedMethod<B, F, I, A, R>
where
    B: CacheBackend,
    F: Fn(&I, &A) -> R,
    I: Serialize,
    A: Serialize,
    R: Serialize + DeserializeOwned,
{
    /// Cache-or-call with an explicit receiver.
    pub fn call(&self, instance: &I, args: &A) -> R {
        let key_args = (instance, args);
        let outcome = orchestrator::run(
            &self.backend,
            &self.config,
            &self.id,
            self.lifespan,
            &key_args,
            || Ok::<R, Infallible>((self.func)(instance, args)),
        );
        match outcome {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Invokes the underlying method directly, touching no storage.
    pub fn call_uncached(&self, instance: &I, args: &A) -> R {
        (self.func)(instance, args)
    }

    /// Binds one receiver, returning a closure with the plain-function
    /// call shape.
    pub fn bind<'a>(&'a self, instance: &'a I) -> impl Fn(&A) -> R + 'a {
        move |args| self.call(instance, args)
    }

    /// Removes every stored entry for this method.
    pub fn clear(&self) -> Result<()> {
        orchestrator::clear(&self.backend, &self.id)
    }

    /// Flushes the backend and returns the storage location.
    pub fn persist(&self) -> Result<PathBuf> {
        orchestrator::lock(&self.backend).persist()
    }

    /// Identity this wrapper caches under.
    pub fn function_id(&self) -> &FunctionId {
        &self.id
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;

    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    use crate::backend::JsonBackend;

    fn test_config(dir: &Path) -> CacheConfig {
        CacheConfig {
            disable: false,
            refresh: false,
            cache_dir: dir.to_path_buf(),
        }
    }

    fn builder(dir: &Path) -> CacheBuilder<JsonBackend> {
        CacheBuilder::new(JsonBackend::new(dir.join("data.json")))
            .config(test_config(dir))
            .lifespan(Lifespan::minutes(5))
    }

    #[test]
    fn test_second_call_serves_stored_result() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap(FunctionId::new("tests", "double"), |n: &i64| {
            calls.set(calls.get() + 1);
            n * 2
        });

        assert_eq!(cached.call(&21), 42);
        assert_eq!(cached.call(&21), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_call_uncached_always_invokes() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap(FunctionId::new("tests", "double"), |n: &i64| {
            calls.set(calls.get() + 1);
            n * 2
        });

        assert_eq!(cached.call_uncached(&21), 42);
        assert_eq!(cached.call_uncached(&21), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_clear_forces_recompute() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap(FunctionId::new("tests", "double"), |n: &i64| {
            calls.set(calls.get() + 1);
            n * 2
        });

        cached.call(&21);
        cached.clear().unwrap();
        cached.call(&21);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_wrappers_share_one_backend_without_colliding() {
        let dir = tempdir().unwrap();
        let cache = builder(dir.path());
        let double = cache.wrap(FunctionId::new("tests", "double"), |n: &i64| n * 2);
        let triple = cache.wrap(FunctionId::new("tests", "triple"), |n: &i64| n * 3);

        assert_eq!(double.call(&5), 10);
        assert_eq!(triple.call(&5), 15);
        // Clearing one function leaves the other's entries intact.
        double.clear().unwrap();
        assert_eq!(triple.call(&5), 15);
    }

    #[derive(Serialize, Deserialize)]
    struct Scaler {
        factor: i64,
    }

    #[test]
    fn test_method_receiver_participates_in_key() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap_method(
            FunctionId::new("tests", "Scaler::scale"),
            |scaler: &Scaler, n: &i64| {
                calls.set(calls.get() + 1);
                scaler.factor * n
            },
        );

        let by_two = Scaler { factor: 2 };
        let by_ten = Scaler { factor: 10 };

        assert_eq!(cached.call(&by_two, &3), 6);
        assert_eq!(cached.call(&by_two, &3), 6);
        assert_eq!(calls.get(), 1);

        // A different receiver is a different entry.
        assert_eq!(cached.call(&by_ten, &3), 30);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_bound_method_closure_uses_the_cache() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap_method(
            FunctionId::new("tests", "Scaler::scale"),
            |scaler: &Scaler, n: &i64| {
                calls.set(calls.get() + 1);
                scaler.factor * n
            },
        );

        let by_two = Scaler { factor: 2 };
        let scale = cached.bind(&by_two);
        assert_eq!(scale(&4), 8);
        assert_eq!(scale(&4), 8);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fallible_errors_propagate_and_are_not_cached() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0u32);
        let cached = builder(dir.path()).wrap_fallible(
            FunctionId::new("tests", "flaky"),
            |n: &i64| -> std::result::Result<i64, String> {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    Err("first call fails".to_string())
                } else {
                    Ok(n * 2)
                }
            },
        );

        assert!(cached.call(&21).is_err());
        // The failure was not stored, so the next call invokes again.
        assert_eq!(cached.call(&21), Ok(42));
        // The success was stored.
        assert_eq!(cached.call(&21), Ok(42));
        assert_eq!(calls.get(), 2);
    }
}
