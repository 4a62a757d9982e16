//! # Record Store
//!
//! The only shared mutable resource in the service. Two implementations:
//!
//! - [`MemoryStore`]: process-local, used when `DATABASE_URL` is unset and
//!   in tests.
//! - [`PgStore`](crate::db::grievances::PgStore): Postgres via SQLx.
//!
//! ## Write discipline
//!
//! No write is blind. Single-record updates are compare-and-update on the
//! record's `version`; the bulk sweep update is guarded by status and
//! deadline in the same statement that changes them. Every successful write
//! bumps `version` by one.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use grievance_core::{GrievanceId, Timestamp};
use grievance_state::{GrievanceRecord, GrievanceStatus, QueueView, Timer};
use thiserror::Error;

/// Store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this id.
    #[error("grievance {0} not found")]
    NotFound(GrievanceId),

    /// The record changed since it was read.
    #[error("grievance {id} was modified concurrently (expected version {expected})")]
    Conflict {
        /// The contended record.
        id: GrievanceId,
        /// Version the caller read.
        expected: u64,
    },

    /// Insert of an id that already exists.
    #[error("grievance {0} already exists")]
    Duplicate(GrievanceId),

    /// A stored row could not be mapped back to a record.
    #[error("corrupt grievance row: {0}")]
    Corrupt(String),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Selects records for listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrievanceFilter {
    /// Restrict to one status.
    pub status: Option<GrievanceStatus>,
    /// Restrict to records on which `timer` has lapsed at the given instant
    /// and not yet been swept.
    pub lapsed: Option<(Timer, Timestamp)>,
}

impl GrievanceFilter {
    /// Every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// The records shown on a role dashboard.
    pub fn for_view(view: QueueView) -> Self {
        Self {
            status: view.status_filter(),
            lapsed: None,
        }
    }

    /// Records the next sweep of `timer` would change at `now`.
    pub fn lapsed(timer: Timer, now: Timestamp) -> Self {
        Self {
            status: Some(timer.governing_status()),
            lapsed: Some((timer, now)),
        }
    }

    /// In-process evaluation of the filter.
    pub fn matches(&self, record: &GrievanceRecord) -> bool {
        self.status.map_or(true, |status| record.status == status)
            && self
                .lapsed
                .map_or(true, |(timer, now)| timer.is_lapsed(record, now))
    }
}

/// Persistent keyed collection of grievance records.
///
/// All methods are potentially blocking I/O; callers bound them with a
/// timeout.
#[async_trait]
pub trait GrievanceStore: Send + Sync + std::fmt::Debug {
    /// Persist a new record. Returns it as stored.
    async fn insert(&self, record: &GrievanceRecord) -> Result<GrievanceRecord, StoreError>;

    /// Point lookup.
    async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError>;

    /// Filtered lookup, newest first.
    async fn find(&self, filter: &GrievanceFilter) -> Result<Vec<GrievanceRecord>, StoreError>;

    /// Replace the record if its stored version is still `expected_version`.
    ///
    /// Returns the stored record with its version bumped, `Conflict` if the
    /// version moved, or `NotFound` if the record is gone.
    async fn update_if_version(
        &self,
        record: &GrievanceRecord,
        expected_version: u64,
    ) -> Result<GrievanceRecord, StoreError>;

    /// Apply `timer`'s lapse to every record on which it is due at `now`, in
    /// one conditional bulk update. Returns exactly the records changed.
    async fn sweep_lapsed(
        &self,
        timer: Timer,
        now: Timestamp,
    ) -> Result<Vec<GrievanceRecord>, StoreError>;

    /// `Verified` records whose ledger entry has not been acknowledged,
    /// oldest verification first.
    async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError>;

    /// Stamp `notarized_at` on a record that does not carry it yet. Bumps
    /// `version`. Returns `false` when the record was already marked.
    async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError>;

    /// Cheap reachability check for the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use grievance_state::{Role, Submission};

    fn record() -> GrievanceRecord {
        GrievanceRecord::submit(
            Submission {
                title: "drain".into(),
                description: "blocked".into(),
                media_url: None,
            },
            Role::User,
            Timestamp::parse("2026-02-01T00:00:00Z").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn view_filter_matches_by_status() {
        let r = record();
        assert!(GrievanceFilter::all().matches(&r));
        assert!(GrievanceFilter::for_view(QueueView::Official).matches(&r));
        assert!(!GrievanceFilter::for_view(QueueView::AdminOverdue).matches(&r));
    }

    #[test]
    fn lapsed_filter_respects_deadline() {
        let r = record();
        let before = Timestamp::parse("2026-02-01T12:00:00Z").unwrap();
        let after = Timestamp::parse("2026-02-03T00:00:00Z").unwrap();
        assert!(!GrievanceFilter::lapsed(Timer::Acceptance, before).matches(&r));
        assert!(GrievanceFilter::lapsed(Timer::Acceptance, after).matches(&r));
        assert!(!GrievanceFilter::lapsed(Timer::Verification, after).matches(&r));
    }
}
