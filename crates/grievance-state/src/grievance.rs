//! # Grievance Lifecycle
//!
//! Pure decision logic for a single grievance record. Every method either
//! validates and mutates the record in full, or returns an error and leaves
//! it untouched; callers persist the result with a compare-and-update.
//!
//! ## States
//!
//! ```text
//!            ┌── acceptBy / resolveBy lapse (sweep) ──▶ Overdue
//!            │
//! Pending ───┴── Resolve ──▶ PendingVerification ──┬── verificationDeadline lapse (sweep) ──▶ Verified
//!                               ▲                  │
//!                               │                  └── Dispute ──▶ Disputed
//!                               └──── Resolve (blocked once disputeCount ≥ 2) ────┘
//! ```
//!
//! Dispute is accepted from any status. Time-driven transitions live in
//! [`crate::timer`].

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use grievance_core::{CoreError, GrievanceId, Timestamp};

use crate::role::Role;

/// Hours a newly submitted grievance has before it must be taken up.
pub const ACCEPTANCE_WINDOW_HOURS: i64 = 24;

/// Days the community has to dispute a claimed resolution.
pub const VERIFICATION_WINDOW_DAYS: i64 = 7;

/// Upper bound for a resolution deadline, in days.
pub const MAX_RESOLUTION_DAYS: f64 = 30.0;

/// Dispute count at which Resolve is forbidden and escalation fires.
pub const DISPUTE_THRESHOLD: u32 = 2;

// ─── Status ──────────────────────────────────────────────────────────

/// Workflow status of a grievance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrievanceStatus {
    /// Awaiting official action.
    Pending,
    /// An SLA deadline lapsed while pending.
    Overdue,
    /// Claimed resolved; inside the community verification window.
    PendingVerification,
    /// Verification window closed without dispute.
    Verified,
    /// The community rejected the claimed resolution.
    Disputed,
}

impl GrievanceStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [GrievanceStatus; 5] = [
        Self::Pending,
        Self::Overdue,
        Self::PendingVerification,
        Self::Verified,
        Self::Disputed,
    ];

    /// Stored and serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Overdue => "Overdue",
            Self::PendingVerification => "PendingVerification",
            Self::Verified => "Verified",
            Self::Disputed => "Disputed",
        }
    }
}

impl std::fmt::Display for GrievanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrievanceStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by lifecycle actions.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A required text field was empty.
    #[error("{field} is required")]
    MissingField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Resolution deadline outside `(0, 30]` days.
    #[error("Invalid time limit. Max 30 days.")]
    InvalidTimeLimit {
        /// The rejected value, if one was supplied.
        days: Option<f64>,
    },

    /// Resolve attempted on a record that reached the dispute threshold.
    #[error("This grievance has been disputed multiple times and can only be resolved by an Admin.")]
    DisputeThresholdReached {
        /// Current dispute count.
        dispute_count: u32,
    },

    /// Resolve attempted on a record the sweep already verified.
    #[error("This grievance has already been verified and cannot be resolved again.")]
    AlreadyVerified,

    /// A stored status string is not one of the five known values.
    #[error("unknown grievance status {0:?}")]
    UnknownStatus(String),

    /// A caller-supplied role is not recognised.
    #[error("unknown role {0:?}")]
    UnknownRole(String),

    /// Deadline arithmetic failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

// ─── Audit Log ───────────────────────────────────────────────────────

/// What caused a transition entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceAction {
    /// Record created.
    Submitted,
    /// Official acknowledged the record.
    Accepted,
    /// Resolution deadline armed.
    ResolutionDeadlineSet,
    /// Claimed resolved.
    Resolved,
    /// Community disputed the resolution.
    Disputed,
    /// Sweep: `acceptBy` passed while pending.
    AcceptanceLapsed,
    /// Sweep: `resolveBy` passed while pending.
    ResolutionLapsed,
    /// Sweep: verification window closed.
    VerificationLapsed,
}

/// One entry in a record's transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the action; absent for submission.
    pub from: Option<GrievanceStatus>,
    /// Status after the action.
    pub to: GrievanceStatus,
    /// The action taken.
    pub action: GrievanceAction,
    /// Who took it.
    pub actor: Role,
    /// When.
    pub at: Timestamp,
}

// ─── Escalation ──────────────────────────────────────────────────────

/// Raised when a record's dispute count reaches the threshold and only an
/// administrator can move it forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationEvent {
    /// The escalated record.
    pub grievance_id: GrievanceId,
    /// Dispute count after the triggering dispute.
    pub dispute_count: u32,
    /// When the triggering dispute happened.
    pub at: Timestamp,
}

// ─── Record ──────────────────────────────────────────────────────────

/// Caller input for a new grievance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// A grievance and its SLA timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceRecord {
    pub id: GrievanceId,
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
    pub status: GrievanceStatus,
    /// Creation time plus 24h. Never modified after submission.
    pub accept_by: Timestamp,
    pub resolve_by: Option<Timestamp>,
    /// Present while `PendingVerification`; kept after promotion to
    /// `Verified`; cleared by dispute.
    pub verification_deadline: Option<Timestamp>,
    pub dispute_count: u32,
    /// Write counter for compare-and-update. Owned by the store.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub transitions: Vec<TransitionRecord>,
    /// When the ledger acknowledged the verification. `None` on a
    /// `Verified` record means notarization is still owed. Never cleared.
    #[serde(default)]
    pub notarized_at: Option<Timestamp>,
}

impl GrievanceRecord {
    /// Create a new pending grievance with its acceptance timer armed.
    pub fn submit(
        submission: Submission,
        actor: Role,
        now: Timestamp,
    ) -> Result<Self, LifecycleError> {
        let title = submission.title.trim();
        if title.is_empty() {
            return Err(LifecycleError::MissingField { field: "title" });
        }
        let description = submission.description.trim();
        if description.is_empty() {
            return Err(LifecycleError::MissingField {
                field: "description",
            });
        }
        let media_url = submission
            .media_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let accept_by = now.checked_add(Duration::hours(ACCEPTANCE_WINDOW_HOURS))?;

        Ok(Self {
            id: GrievanceId::new(),
            title: title.to_string(),
            description: description.to_string(),
            media_url,
            status: GrievanceStatus::Pending,
            accept_by,
            resolve_by: None,
            verification_deadline: None,
            dispute_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            transitions: vec![TransitionRecord {
                from: None,
                to: GrievanceStatus::Pending,
                action: GrievanceAction::Submitted,
                actor,
                at: now,
            }],
            notarized_at: None,
        })
    }

    /// Acknowledge the record. Status and timers are unchanged; only the
    /// audit log grows.
    pub fn accept(&mut self, actor: Role, now: Timestamp) {
        self.record(self.status, GrievanceAction::Accepted, actor, now);
    }

    /// Arm the resolution timer `time_in_days` from `now`.
    ///
    /// Fractional days are honoured to the second. Any status is accepted;
    /// the timer only has effect while the record is `Pending`.
    pub fn set_resolution_deadline(
        &mut self,
        time_in_days: Option<f64>,
        actor: Role,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let days = validate_time_limit(time_in_days)?;
        let secs = (days * 86_400.0).round() as i64;
        let resolve_by = now.checked_add(Duration::seconds(secs))?;

        self.resolve_by = Some(resolve_by);
        self.record(
            self.status,
            GrievanceAction::ResolutionDeadlineSet,
            actor,
            now,
        );
        Ok(())
    }

    /// Claim the grievance resolved and open the verification window.
    ///
    /// `Verified` is terminal for Resolve.
    pub fn resolve(&mut self, actor: Role, now: Timestamp) -> Result<(), LifecycleError> {
        if self.status == GrievanceStatus::Verified {
            return Err(LifecycleError::AlreadyVerified);
        }
        if self.is_escalated() {
            return Err(LifecycleError::DisputeThresholdReached {
                dispute_count: self.dispute_count,
            });
        }
        let deadline = now.checked_add(Duration::days(VERIFICATION_WINDOW_DAYS))?;

        self.verification_deadline = Some(deadline);
        self.record(
            GrievanceStatus::PendingVerification,
            GrievanceAction::Resolved,
            actor,
            now,
        );
        Ok(())
    }

    /// Dispute the claimed resolution. Always accepted.
    ///
    /// Returns an [`EscalationEvent`] when the new count is at or above
    /// [`DISPUTE_THRESHOLD`].
    pub fn dispute(&mut self, actor: Role, now: Timestamp) -> Option<EscalationEvent> {
        self.dispute_count = self.dispute_count.saturating_add(1);
        self.verification_deadline = None;
        self.record(
            GrievanceStatus::Disputed,
            GrievanceAction::Disputed,
            actor,
            now,
        );
        self.is_escalated().then(|| EscalationEvent {
            grievance_id: self.id,
            dispute_count: self.dispute_count,
            at: now,
        })
    }

    /// Whether a verified record still needs to reach the ledger.
    pub fn awaits_notarization(&self) -> bool {
        self.status == GrievanceStatus::Verified && self.notarized_at.is_none()
    }

    /// Whether Resolve is permanently blocked for this record.
    pub fn is_escalated(&self) -> bool {
        self.dispute_count >= DISPUTE_THRESHOLD
    }

    /// Append a log entry and move to `to`.
    pub(crate) fn record(
        &mut self,
        to: GrievanceStatus,
        action: GrievanceAction,
        actor: Role,
        now: Timestamp,
    ) {
        self.transitions.push(TransitionRecord {
            from: Some(self.status),
            to,
            action,
            actor,
            at: now,
        });
        self.status = to;
        self.updated_at = now;
    }
}

/// Check a requested resolution window. Missing, non-positive, non-finite
/// and over-limit values are all rejected with the same error.
pub fn validate_time_limit(time_in_days: Option<f64>) -> Result<f64, LifecycleError> {
    match time_in_days {
        Some(days) if days > 0.0 && days <= MAX_RESOLUTION_DAYS => Ok(days),
        other => Err(LifecycleError::InvalidTimeLimit { days: other }),
    }
}
