//! # SLA Timers
//!
//! The three deadlines a grievance can carry, and the time-driven
//! transition each one triggers when it lapses. A timer only governs a
//! record while the record is in the timer's status; otherwise its deadline
//! is informational.
//!
//! | Timer        | Governs while         | Lapses to  |
//! |--------------|-----------------------|------------|
//! | Acceptance   | `Pending`             | `Overdue`  |
//! | Resolution   | `Pending`             | `Overdue`  |
//! | Verification | `PendingVerification` | `Verified` |
//!
//! A deadline lapses strictly after it passes (`deadline < now`).

use serde::{Deserialize, Serialize};

use grievance_core::Timestamp;

use crate::grievance::{GrievanceAction, GrievanceRecord, GrievanceStatus, TransitionRecord};
use crate::role::Role;

/// One of the three SLA timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timer {
    Acceptance,
    Resolution,
    Verification,
}

impl Timer {
    /// Sweep order within one reconciliation tick.
    pub const SWEEP_ORDER: [Timer; 3] = [Self::Acceptance, Self::Resolution, Self::Verification];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acceptance => "acceptance",
            Self::Resolution => "resolution",
            Self::Verification => "verification",
        }
    }

    /// The status in which this timer can fire.
    pub fn governing_status(&self) -> GrievanceStatus {
        match self {
            Self::Acceptance | Self::Resolution => GrievanceStatus::Pending,
            Self::Verification => GrievanceStatus::PendingVerification,
        }
    }

    /// The status a lapse moves the record to.
    pub fn lapse_status(&self) -> GrievanceStatus {
        match self {
            Self::Acceptance | Self::Resolution => GrievanceStatus::Overdue,
            Self::Verification => GrievanceStatus::Verified,
        }
    }

    pub fn lapse_action(&self) -> GrievanceAction {
        match self {
            Self::Acceptance => GrievanceAction::AcceptanceLapsed,
            Self::Resolution => GrievanceAction::ResolutionLapsed,
            Self::Verification => GrievanceAction::VerificationLapsed,
        }
    }

    /// The record's deadline for this timer, if armed.
    pub fn deadline(&self, record: &GrievanceRecord) -> Option<Timestamp> {
        match self {
            Self::Acceptance => Some(record.accept_by),
            Self::Resolution => record.resolve_by,
            Self::Verification => record.verification_deadline,
        }
    }

    /// Whether the sweep should fire this timer on `record` at `now`.
    pub fn is_lapsed(&self, record: &GrievanceRecord, now: Timestamp) -> bool {
        record.status == self.governing_status()
            && self.deadline(record).is_some_and(|deadline| deadline < now)
    }

    /// The audit entry a lapse appends. Identical for every record swept by
    /// this timer in one tick.
    pub fn transition_record(&self, now: Timestamp) -> TransitionRecord {
        TransitionRecord {
            from: Some(self.governing_status()),
            to: self.lapse_status(),
            action: self.lapse_action(),
            actor: Role::System,
            at: now,
        }
    }

    /// Apply the lapse to `record` if it is due. Returns whether the record
    /// changed.
    pub fn apply(&self, record: &mut GrievanceRecord, now: Timestamp) -> bool {
        if !self.is_lapsed(record, now) {
            return false;
        }
        record.record(self.lapse_status(), self.lapse_action(), Role::System, now);
        true
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
