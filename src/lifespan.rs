//! Lifespan Module
//!
//! Expresses a freshness window as a sum of component units, defaulting to
//! one day when no component is supplied.

use chrono::TimeDelta;

// == Lifespan ==
/// Maximum age of a cache entry before it is considered stale.
///
/// Built as the sum of its component units, usually via struct update
/// syntax or a single-unit constructor:
///
/// ```ignore
/// let short = Lifespan::minutes(5);
/// let composite = Lifespan { days: 1, hours: 6, ..Lifespan::default() };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifespan {
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
    pub microseconds: i64,
}

impl Lifespan {
    // == Single-Unit Constructors ==
    pub fn weeks(weeks: i64) -> Self {
        Self {
            weeks,
            ..Self::default()
        }
    }

    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn hours(hours: i64) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }

    pub fn seconds(seconds: i64) -> Self {
        Self {
            seconds,
            ..Self::default()
        }
    }

    pub fn milliseconds(milliseconds: i64) -> Self {
        Self {
            milliseconds,
            ..Self::default()
        }
    }

    pub fn microseconds(microseconds: i64) -> Self {
        Self {
            microseconds,
            ..Self::default()
        }
    }

    // == Duration Conversion ==
    /// The freshness window as a concrete duration.
    ///
    /// A lifespan with no components set means "one day", so an
    /// all-defaults value converts to 24 hours rather than zero.
    pub fn delta(&self) -> TimeDelta {
        if *self == Self::default() {
            return TimeDelta::days(1);
        }
        TimeDelta::weeks(self.weeks)
            + TimeDelta::days(self.days)
            + TimeDelta::hours(self.hours)
            + TimeDelta::minutes(self.minutes)
            + TimeDelta::seconds(self.seconds)
            + TimeDelta::milliseconds(self.milliseconds)
            + TimeDelta::microseconds(self.microseconds)
    }
}
