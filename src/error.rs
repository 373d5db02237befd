//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// The orchestrator absorbs and logs every variant, degrading to
/// direct-call semantics, except where persistence itself is the requested
/// operation (`clear` or `persist`). Errors raised by the wrapped callable
/// never pass through this type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A cache key could not be derived from the call arguments
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// A result value could not be encoded for storage
    #[error("encode failed: {0}")]
    Encode(String),

    /// A stored payload could not be decoded back into a value
    #[error("decode failed: {0}")]
    Decode(String),

    /// The storage backend is unavailable or rejected an operation
    #[error("storage backend error: {0}")]
    Backend(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
