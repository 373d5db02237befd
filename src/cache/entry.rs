//! Cache Entry Module
//!
//! Defines the structure for stored cache entries and the freshness
//! judgment applied at read time.

use chrono::{DateTime, Local, TimeDelta};

// == Cache Entry ==
/// A stored result: the time it was written plus the backend-encoded
/// payload.
///
/// Entries never expire proactively; staleness is judged lazily when an
/// entry is read back.
#[derive(Debug, Clone)]
pub struct CacheEntry<P> {
    /// Time the payload was written
    pub stored_at: DateTime<Local>,
    /// Backend-encoded result value
    pub payload: P,
}

impl<P> CacheEntry<P> {
    // == Constructors ==
    /// Creates an entry stamped with the current time.
    pub fn new(payload: P) -> Self {
        Self::at(Local::now(), payload)
    }

    /// Creates an entry with an explicit write time, as reconstructed from
    /// storage.
    pub fn at(stored_at: DateTime<Local>, payload: P) -> Self {
        Self { stored_at, payload }
    }

    // == Is Fresh ==
    /// Checks whether the entry is still within its freshness window.
    ///
    /// Boundary condition: an entry is fresh strictly before
    /// `stored_at + lifespan`; at or past that instant it is stale and the
    /// next read triggers recomputation.
    pub fn is_fresh(&self, lifespan: TimeDelta) -> bool {
        match self.stored_at.checked_add_signed(lifespan) {
            Some(expires_at) => Local::now() < expires_at,
            // A window too large to represent never expires.
            None => true,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was written.
    pub fn age(&self) -> TimeDelta {
        Local::now().signed_duration_since(self.stored_at)
    }
}

// == Timestamp Helpers ==
/// Fractional epoch seconds, the timestamp form used by the flat file
/// stores.
pub(crate) fn to_epoch_seconds(at: DateTime<Local>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Reconstructs a local timestamp from fractional epoch seconds.
///
/// An unrepresentable value maps to the epoch, which reads as maximally
/// stale rather than failing.
pub(crate) fn from_epoch_seconds(seconds: f64) -> DateTime<Local> {
    DateTime::from_timestamp_micros((seconds * 1_000_000.0) as i64)
        .unwrap_or_default()
        .with_timezone(&Local)
}
