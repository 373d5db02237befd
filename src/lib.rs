//! Memocache - persistent function-result memoization
//!
//! Wraps a callable so its return value is stored durably, keyed by the
//! call's identity and arguments, and served back on subsequent calls
//! within a configurable freshness window. Stale, missing, or
//! undecodable entries fall back to re-invoking the callable; storage
//! failures degrade to direct-call semantics rather than raising.
//!
//! Three interchangeable backends persist the entries: a flat JSON store,
//! a binary flat store, and a SQLite single-table store.
//!
//! ```ignore
//! use memocache::{function_id, CacheBuilder, JsonBackend, Lifespan};
//!
//! let cache = CacheBuilder::new(JsonBackend::new("weather.json"))
//!     .lifespan(Lifespan::hours(1));
//! let forecast = cache.wrap(function_id!("forecast"), |city: &String| {
//!     expensive_forecast_lookup(city)
//! });
//!
//! let report = forecast.call(&"Oslo".to_string()); // invokes
//! let cached = forecast.call(&"Oslo".to_string()); // served from disk
//! ```

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod key;
pub mod lifespan;

pub use backend::{BinaryBackend, CacheBackend, JsonBackend, SqliteBackend};
pub use cache::{CacheBuilder, CacheEntry, CachedAsyncFn, CachedFn, CachedMethod, CachedTryFn};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use key::{CacheKey, FunctionId};
pub use lifespan::Lifespan;
