//! Grievance persistence on the `grievances` table.
//!
//! Lifecycle rules are applied in Rust by `grievance-state`; SQL only
//! enforces the write guards (version match, status-and-deadline predicate).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grievance_core::{GrievanceId, Timestamp};
use grievance_state::{GrievanceRecord, GrievanceStatus, Timer, TransitionRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{GrievanceFilter, GrievanceStore, StoreError};

const COLUMNS: &str = "id, title, description, media_url, status, accept_by, resolve_by, \
     verification_deadline, dispute_count, version, transitions, created_at, updated_at, notarized_at";

/// Postgres-backed [`GrievanceStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: GrievanceId) -> Result<bool, StoreError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM grievances WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

/// The deadline column a timer reads.
fn deadline_column(timer: Timer) -> &'static str {
    match timer {
        Timer::Acceptance => "accept_by",
        Timer::Resolution => "resolve_by",
        Timer::Verification => "verification_deadline",
    }
}

fn encode_transitions(log: &[TransitionRecord]) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(log).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize grievance transitions");
        sqlx::Error::Encode(Box::new(e)).into()
    })
}

fn encode_count(count: u32) -> Result<i32, StoreError> {
    i32::try_from(count).map_err(|_| StoreError::Corrupt(format!("dispute count {count} out of range")))
}

#[async_trait]
impl GrievanceStore for PgStore {
    async fn insert(&self, record: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
        let transitions = encode_transitions(&record.transitions)?;
        let sql = format!(
            "INSERT INTO grievances ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, GrievanceRow>(&sql)
            .bind(record.id.as_uuid())
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.media_url)
            .bind(record.status.as_str())
            .bind(record.accept_by.into_datetime())
            .bind(record.resolve_by.map(Timestamp::into_datetime))
            .bind(record.verification_deadline.map(Timestamp::into_datetime))
            .bind(encode_count(record.dispute_count)?)
            .bind(record.version as i64)
            .bind(&transitions)
            .bind(record.created_at.into_datetime())
            .bind(record.updated_at.into_datetime())
            .bind(record.notarized_at.map(Timestamp::into_datetime))
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(StoreError::Duplicate(record.id))?.into_record()
    }

    async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM grievances WHERE id = $1");
        sqlx::query_as::<_, GrievanceRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(GrievanceRow::into_record)
            .transpose()
    }

    async fn find(&self, filter: &GrievanceFilter) -> Result<Vec<GrievanceRecord>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let rows = match filter.lapsed {
            None => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM grievances
                     WHERE ($1::text IS NULL OR status = $1)
                     ORDER BY created_at DESC, id"
                );
                sqlx::query_as::<_, GrievanceRow>(&sql)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some((timer, now)) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM grievances
                     WHERE ($1::text IS NULL OR status = $1)
                       AND status = $2 AND {deadline} < $3
                     ORDER BY created_at DESC, id",
                    deadline = deadline_column(timer)
                );
                sqlx::query_as::<_, GrievanceRow>(&sql)
                    .bind(status)
                    .bind(timer.governing_status().as_str())
                    .bind(now.into_datetime())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(GrievanceRow::into_record).collect()
    }

    async fn update_if_version(
        &self,
        record: &GrievanceRecord,
        expected_version: u64,
    ) -> Result<GrievanceRecord, StoreError> {
        let transitions = encode_transitions(&record.transitions)?;
        let sql = format!(
            "UPDATE grievances SET
                 title = $3, description = $4, media_url = $5, status = $6,
                 resolve_by = $7, verification_deadline = $8, dispute_count = $9,
                 transitions = $10, updated_at = $11, version = version + 1,
                 notarized_at = COALESCE(notarized_at, $12)
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, GrievanceRow>(&sql)
            .bind(record.id.as_uuid())
            .bind(expected_version as i64)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.media_url)
            .bind(record.status.as_str())
            .bind(record.resolve_by.map(Timestamp::into_datetime))
            .bind(record.verification_deadline.map(Timestamp::into_datetime))
            .bind(encode_count(record.dispute_count)?)
            .bind(&transitions)
            .bind(record.updated_at.into_datetime())
            .bind(record.notarized_at.map(Timestamp::into_datetime))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.into_record(),
            None if self.exists(record.id).await? => Err(StoreError::Conflict {
                id: record.id,
                expected: expected_version,
            }),
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    async fn sweep_lapsed(
        &self,
        timer: Timer,
        now: Timestamp,
    ) -> Result<Vec<GrievanceRecord>, StoreError> {
        let entry = serde_json::to_value(timer.transition_record(now))
            .map_err(|e| StoreError::Database(sqlx::Error::Encode(Box::new(e))))?;
        let sql = format!(
            "UPDATE grievances SET
                 status = $1, updated_at = $2, version = version + 1,
                 transitions = transitions || jsonb_build_array($3::jsonb)
             WHERE status = $4 AND {deadline} < $2
             RETURNING {COLUMNS}",
            deadline = deadline_column(timer)
        );
        let rows = sqlx::query_as::<_, GrievanceRow>(&sql)
            .bind(timer.lapse_status().as_str())
            .bind(now.into_datetime())
            .bind(&entry)
            .bind(timer.governing_status().as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(GrievanceRow::into_record).collect()
    }

    async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM grievances
             WHERE status = $1 AND notarized_at IS NULL
             ORDER BY updated_at, id"
        );
        let rows = sqlx::query_as::<_, GrievanceRow>(&sql)
            .bind(GrievanceStatus::Verified.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(GrievanceRow::into_record).collect()
    }

    async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError> {
        let marked = sqlx::query(
            "UPDATE grievances SET notarized_at = $2, version = version + 1
             WHERE id = $1 AND notarized_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(at.into_datetime())
        .execute(&self.pool)
        .await?
        .rows_affected();

        match marked {
            0 if !self.exists(id).await? => Err(StoreError::NotFound(id)),
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct GrievanceRow {
    id: Uuid,
    title: String,
    description: String,
    media_url: Option<String>,
    status: String,
    accept_by: DateTime<Utc>,
    resolve_by: Option<DateTime<Utc>>,
    verification_deadline: Option<DateTime<Utc>>,
    dispute_count: i32,
    version: i64,
    transitions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    notarized_at: Option<DateTime<Utc>>,
}

impl GrievanceRow {
    /// Map a row back to a record. Unlike the write path this never
    /// substitutes defaults: a row that does not decode is reported.
    fn into_record(self) -> Result<GrievanceRecord, StoreError> {
        let corrupt = |what: &str, detail: String| {
            tracing::error!(id = %self.id, %detail, "unreadable grievance {what}");
            StoreError::Corrupt(format!("{}: {what}: {detail}", self.id))
        };

        let status: GrievanceStatus = self
            .status
            .parse()
            .map_err(|e: grievance_state::LifecycleError| corrupt("status", e.to_string()))?;
        let transitions: Vec<TransitionRecord> = serde_json::from_value(self.transitions.clone())
            .map_err(|e| corrupt("transitions", e.to_string()))?;
        let dispute_count = u32::try_from(self.dispute_count)
            .map_err(|e| corrupt("dispute_count", e.to_string()))?;
        let version =
            u64::try_from(self.version).map_err(|e| corrupt("version", e.to_string()))?;

        Ok(GrievanceRecord {
            id: GrievanceId::from_uuid(self.id),
            title: self.title,
            description: self.description,
            media_url: self.media_url,
            status,
            accept_by: Timestamp::from_utc(self.accept_by),
            resolve_by: self.resolve_by.map(Timestamp::from_utc),
            verification_deadline: self.verification_deadline.map(Timestamp::from_utc),
            dispute_count,
            version,
            transitions,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
            notarized_at: self.notarized_at.map(Timestamp::from_utc),
        })
    }
}
