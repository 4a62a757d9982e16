//! # Role Queues
//!
//! Each dashboard lists records in exactly one status, except the user
//! dashboard which lists everything (ownership is tracked upstream).

use serde::{Deserialize, Serialize};

use crate::grievance::GrievanceStatus;

/// A listing served to one of the role dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueView {
    /// Every record.
    User,
    /// Awaiting official action.
    Official,
    /// Awaiting community verification.
    Community,
    /// Disputed records for administrator review.
    AdminDisputed,
    /// Overdue records for administrator review.
    AdminOverdue,
}

impl QueueView {
    /// The status this view is restricted to, or `None` for all records.
    pub fn status_filter(&self) -> Option<GrievanceStatus> {
        match self {
            Self::User => None,
            Self::Official => Some(GrievanceStatus::Pending),
            Self::Community => Some(GrievanceStatus::PendingVerification),
            Self::AdminDisputed => Some(GrievanceStatus::Disputed),
            Self::AdminOverdue => Some(GrievanceStatus::Overdue),
        }
    }
}
