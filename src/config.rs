//! Configuration Module
//!
//! Handles loading the process-wide cache overrides from environment
//! variables.

use std::env;
use std::path::PathBuf;

/// Cache override configuration.
///
/// Loaded once at construction time and read-only thereafter for a given
/// run; toggling the environment mid-process does not affect wrappers that
/// were already built.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Skip the cache machinery entirely and always invoke directly
    pub disable: bool,
    /// Always recompute and refresh stored entries, even when fresh
    pub refresh: bool,
    /// Directory holding the default backend store files
    pub cache_dir: PathBuf,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment
    /// variables.
    ///
    /// # Environment Variables
    /// - `NO_CACHE` - disable the cache entirely when set non-empty
    /// - `RE_CACHE` - force recomputation and refresh when set non-empty
    /// - `MEMOCACHE_DIR` - cache directory (default: `~/.cache/memocache`)
    pub fn from_env() -> Self {
        Self {
            disable: env_flag("NO_CACHE"),
            refresh: env_flag("RE_CACHE"),
            cache_dir: env::var_os("MEMOCACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disable: false,
            refresh: false,
            cache_dir: default_cache_dir(),
        }
    }
}

/// True when the variable is present with a non-empty value.
fn env_flag(name: &str) -> bool {
    env::var_os(name).is_some_and(|value| !value.is_empty())
}

fn default_cache_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join(".cache").join("memocache"))
        .unwrap_or_else(|| PathBuf::from(".memocache"))
}

/// Get home directory (cross-platform)
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
