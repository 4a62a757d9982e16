//! # Route Modules
//!
//! - [`grievances`]: submission, caller actions, and the role dashboards.
//! - [`admin`]: administrator queues and sweep controls.

pub mod admin;
pub mod grievances;

use chrono::{DateTime, Utc};
use grievance_state::{GrievanceRecord, GrievanceStatus, TransitionRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A grievance as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
    /// One of `Pending`, `Overdue`, `PendingVerification`, `Verified`, `Disputed`.
    #[schema(value_type = String)]
    pub status: GrievanceStatus,
    pub accept_by: DateTime<Utc>,
    pub resolve_by: Option<DateTime<Utc>>,
    pub verification_deadline: Option<DateTime<Utc>>,
    pub dispute_count: u32,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered `{from, to, action, actor, at}` entries.
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<TransitionRecord>,
    /// When the verification reached the ledger.
    pub notarized_at: Option<DateTime<Utc>>,
}

impl From<GrievanceRecord> for GrievanceResponse {
    fn from(record: GrievanceRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            title: record.title,
            description: record.description,
            media_url: record.media_url,
            status: record.status,
            accept_by: record.accept_by.into_datetime(),
            resolve_by: record.resolve_by.map(|t| t.into_datetime()),
            verification_deadline: record.verification_deadline.map(|t| t.into_datetime()),
            dispute_count: record.dispute_count,
            version: record.version,
            created_at: record.created_at.into_datetime(),
            updated_at: record.updated_at.into_datetime(),
            transitions: record.transitions,
            notarized_at: record.notarized_at.map(|t| t.into_datetime()),
        }
    }
}

/// Outcome of a caller action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable outcome, e.g. `"Pending Verification"`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grievance: Option<GrievanceResponse>,
}

impl ActionResponse {
    pub(crate) fn new(status: &str, record: GrievanceRecord) -> Self {
        Self {
            status: status.to_string(),
            grievance: Some(record.into()),
        }
    }
}

pub(crate) fn to_responses(records: Vec<GrievanceRecord>) -> Vec<GrievanceResponse> {
    records.into_iter().map(GrievanceResponse::from).collect()
}
