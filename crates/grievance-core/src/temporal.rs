//! # Temporal Types: UTC Timestamps and Injectable Clocks
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision,
//! and the `Clock` abstraction every deadline computation goes through.
//!
//! ## Why seconds precision
//!
//! SLA timers are derived by adding whole hours or days to the current time.
//! Truncating at construction makes `acceptBy - createdAt` exactly 24h, and a
//! record read back from Postgres compares equal to the one written.
//!
//! ## Clocks
//!
//! - [`SystemClock`] reads the wall clock.
//! - [`ManualClock`] is set and advanced explicitly. Clones share the same
//!   instant, so a test can hand one clone to the service and keep another
//!   to move time forward.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string with `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Only the `Z` suffix is accepted; explicit offsets (even `+00:00`)
    /// are rejected.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch value (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("unix timestamp {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Consume into the inner `DateTime<Utc>`.
    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Add a duration, failing instead of wrapping on overflow.
    ///
    /// The result is re-truncated, so sub-second durations round down.
    pub fn checked_add(&self, d: Duration) -> Result<Self, CoreError> {
        self.0
            .checked_add_signed(d)
            .map(Self::from_utc)
            .ok_or(CoreError::Overflow(d.num_seconds()))
    }

    /// Duration elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn since(&self, earlier: &Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clock ───────────────────────────────────────────────────────────

/// Source of the current time.
///
/// Production code injects [`SystemClock`]. Tests inject [`ManualClock`]
/// for deterministic deadline behaviour.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant, truncated to seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock frozen at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Timestamp::now())
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        *self.current.lock() = to;
    }

    /// Move the clock forward (or backward, for negative durations).
    ///
    /// An advance that would overflow the representable range leaves the
    /// clock where it was.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock();
        if let Ok(next) = guard.checked_add(by) {
            *guard = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}
