//! # Action Layer
//!
//! Runs one lifecycle action against one record: read, apply the engine,
//! compare-and-update. A lost race is retried once against a fresh read
//! before it surfaces as a conflict. Every store call is bounded by the
//! configured store timeout; an expired bound surfaces as a transient
//! failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use grievance_core::{Clock, GrievanceId};
use grievance_state::{
    EscalationEvent, GrievanceRecord, GrievanceStatus, LifecycleError, Role, Submission,
};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::store::{GrievanceFilter, GrievanceStore, StoreError};

/// Retries after a version conflict before giving up.
const CONFLICT_RETRIES: u32 = 1;

/// Failures of a single action.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The engine rejected the action.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("grievance {0} not found")]
    NotFound(GrievanceId),

    /// Lost the compare-and-update race twice.
    #[error("grievance {0} is being modified concurrently; retry")]
    Conflict(GrievanceId),

    /// A store call exceeded its time bound.
    #[error("store did not answer within {0:?}")]
    Transient(Duration),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Conflict { id, .. } => Self::Conflict(id),
            other => Self::Store(other),
        }
    }
}

/// Entry point for caller-driven lifecycle actions.
#[derive(Debug, Clone)]
pub struct GrievanceService {
    store: Arc<dyn GrievanceStore>,
    clock: Arc<dyn Clock>,
    escalations: broadcast::Sender<EscalationEvent>,
    store_timeout: Duration,
}

impl GrievanceService {
    pub fn new(
        store: Arc<dyn GrievanceStore>,
        clock: Arc<dyn Clock>,
        escalations: broadcast::Sender<EscalationEvent>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            escalations,
            store_timeout,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn GrievanceStore> {
        &self.store
    }

    /// Current time on the service clock.
    pub fn now(&self) -> grievance_core::Timestamp {
        self.clock.now()
    }

    /// File a new grievance.
    pub async fn submit(
        &self,
        submission: Submission,
        actor: Role,
    ) -> Result<GrievanceRecord, ActionError> {
        let record = GrievanceRecord::submit(submission, actor, self.clock.now())?;
        let stored = self.bounded(self.store.insert(&record)).await?;
        tracing::info!(grievance_id = %stored.id, accept_by = %stored.accept_by, "grievance submitted");
        Ok(stored)
    }

    /// Point read.
    pub async fn get(&self, id: GrievanceId) -> Result<GrievanceRecord, ActionError> {
        self.bounded(self.store.get(id))
            .await?
            .ok_or(ActionError::NotFound(id))
    }

    /// Filtered listing.
    pub async fn list(&self, filter: GrievanceFilter) -> Result<Vec<GrievanceRecord>, ActionError> {
        self.bounded(self.store.find(&filter)).await
    }

    /// Acknowledge a grievance. Logged; status unchanged.
    pub async fn accept(&self, id: GrievanceId, actor: Role) -> Result<GrievanceRecord, ActionError> {
        let (record, ()) = self
            .mutate(id, |record, now| {
                record.accept(actor, now);
                Ok(())
            })
            .await?;
        tracing::info!(grievance_id = %id, %actor, "grievance accepted");
        Ok(record)
    }

    /// Arm the resolution timer.
    pub async fn set_resolution_deadline(
        &self,
        id: GrievanceId,
        time_in_days: Option<f64>,
        actor: Role,
    ) -> Result<GrievanceRecord, ActionError> {
        let (record, ()) = self
            .mutate(id, |record, now| {
                record.set_resolution_deadline(time_in_days, actor, now)
            })
            .await?;
        if record.status != GrievanceStatus::Pending {
            tracing::warn!(
                grievance_id = %id,
                status = %record.status,
                "resolution deadline set on a grievance that is no longer pending; it will not fire"
            );
        }
        tracing::info!(grievance_id = %id, resolve_by = ?record.resolve_by, "resolution deadline set");
        Ok(record)
    }

    /// Claim the grievance resolved.
    pub async fn resolve(&self, id: GrievanceId, actor: Role) -> Result<GrievanceRecord, ActionError> {
        let (record, ()) = self
            .mutate(id, |record, now| record.resolve(actor, now))
            .await?;
        tracing::info!(
            grievance_id = %id,
            verification_deadline = ?record.verification_deadline,
            "grievance resolved; awaiting verification"
        );
        Ok(record)
    }

    /// Dispute the claimed resolution. Publishes an escalation once the
    /// record reaches the dispute threshold.
    pub async fn dispute(&self, id: GrievanceId, actor: Role) -> Result<GrievanceRecord, ActionError> {
        let (record, escalation) = self
            .mutate(id, |record, now| Ok(record.dispute(actor, now)))
            .await?;
        tracing::info!(grievance_id = %id, dispute_count = record.dispute_count, "grievance disputed");

        if let Some(event) = escalation {
            tracing::warn!(
                grievance_id = %event.grievance_id,
                dispute_count = event.dispute_count,
                "grievance escalated; only an administrator can resolve it"
            );
            if self.escalations.send(event).is_err() {
                tracing::debug!(grievance_id = %id, "no escalation subscribers");
            }
        }
        Ok(record)
    }

    /// Read-apply-write with one retry on version conflict.
    async fn mutate<R>(
        &self,
        id: GrievanceId,
        apply: impl Fn(&mut GrievanceRecord, grievance_core::Timestamp) -> Result<R, LifecycleError>,
    ) -> Result<(GrievanceRecord, R), ActionError> {
        let mut attempt = 0;
        loop {
            let current = self.get(id).await?;
            let mut next = current.clone();
            let outcome = apply(&mut next, self.clock.now())?;

            match self
                .bounded(self.store.update_if_version(&next, current.version))
                .await
            {
                Ok(saved) => return Ok((saved, outcome)),
                Err(ActionError::Conflict(_)) if attempt < CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!(grievance_id = %id, attempt, "version conflict; retrying with fresh read");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ActionError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(ActionError::from),
            Err(_) => {
                tracing::warn!(timeout = ?self.store_timeout, "store call timed out");
                Err(ActionError::Transient(self.store_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use grievance_core::{ManualClock, Timestamp};
    use grievance_state::Timer;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn t0() -> Timestamp {
        Timestamp::parse("2026-03-10T10:00:00Z").unwrap()
    }

    fn service(store: Arc<dyn GrievanceStore>) -> (GrievanceService, broadcast::Receiver<EscalationEvent>) {
        let (tx, rx) = broadcast::channel(8);
        let svc = GrievanceService::new(
            store,
            Arc::new(ManualClock::new(t0())),
            tx,
            Duration::from_secs(1),
        );
        (svc, rx)
    }

    fn pothole() -> Submission {
        Submission {
            title: "pothole".into(),
            description: "road damage".into(),
            media_url: None,
        }
    }

    #[tokio::test]
    async fn submit_then_get() {
        let (svc, _rx) = service(Arc::new(MemoryStore::new()));
        let created = svc.submit(pothole(), Role::User).await.unwrap();
        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.accept_by.since(&fetched.created_at), ChronoDuration::hours(24));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (svc, _rx) = service(Arc::new(MemoryStore::new()));
        let id = GrievanceId::new();
        assert!(matches!(svc.resolve(id, Role::Official).await, Err(ActionError::NotFound(x)) if x == id));
        assert!(matches!(svc.accept(id, Role::Official).await, Err(ActionError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejected_action_does_not_write() {
        let store = MemoryStore::new();
        let (svc, _rx) = service(Arc::new(store.clone()));
        let created = svc.submit(pothole(), Role::User).await.unwrap();
        let err = svc
            .set_resolution_deadline(created.id, Some(31.0), Role::Official)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Lifecycle(LifecycleError::InvalidTimeLimit { .. })));
        assert_eq!(svc.get(created.id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn second_dispute_publishes_escalation() {
        let (svc, mut rx) = service(Arc::new(MemoryStore::new()));
        let created = svc.submit(pothole(), Role::User).await.unwrap();
        svc.dispute(created.id, Role::Community).await.unwrap();
        assert!(rx.try_recv().is_err());
        svc.dispute(created.id, Role::Community).await.unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.grievance_id, created.id);
        assert_eq!(event.dispute_count, 2);
    }

    /// Store that loses the first `n` compare-and-update races.
    #[derive(Debug)]
    struct Contended {
        inner: MemoryStore,
        losses: AtomicU32,
    }

    #[async_trait]
    impl GrievanceStore for Contended {
        async fn insert(&self, r: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
            self.inner.insert(r).await
        }
        async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
            self.inner.get(id).await
        }
        async fn find(&self, f: &GrievanceFilter) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.inner.find(f).await
        }
        async fn update_if_version(
            &self,
            r: &GrievanceRecord,
            v: u64,
        ) -> Result<GrievanceRecord, StoreError> {
            if self
                .losses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Conflict { id: r.id, expected: v });
            }
            self.inner.update_if_version(r, v).await
        }
        async fn sweep_lapsed(
            &self,
            t: Timer,
            now: Timestamp,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.inner.sweep_lapsed(t, now).await
        }
        async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.inner.awaiting_notarization().await
        }
        async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError> {
            self.inner.mark_notarized(id, at).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_conflict_is_retried() {
        let store = Arc::new(Contended {
            inner: MemoryStore::new(),
            losses: AtomicU32::new(1),
        });
        let (svc, _rx) = service(store);
        let created = svc.submit(pothole(), Role::User).await.unwrap();
        let disputed = svc.dispute(created.id, Role::Community).await.unwrap();
        assert_eq!(disputed.dispute_count, 1);
    }

    #[tokio::test]
    async fn repeated_conflict_surfaces() {
        let store = Arc::new(Contended {
            inner: MemoryStore::new(),
            losses: AtomicU32::new(2),
        });
        let (svc, _rx) = service(store);
        let created = svc.submit(pothole(), Role::User).await.unwrap();
        assert!(matches!(
            svc.dispute(created.id, Role::Community).await,
            Err(ActionError::Conflict(id)) if id == created.id
        ));
        assert_eq!(svc.get(created.id).await.unwrap().dispute_count, 0);
    }

    /// Store whose reads never complete.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl GrievanceStore for Stalled {
        async fn insert(&self, r: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
            Ok(r.clone())
        }
        async fn get(&self, _: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
            std::future::pending().await
        }
        async fn find(&self, _: &GrievanceFilter) -> Result<Vec<GrievanceRecord>, StoreError> {
            std::future::pending().await
        }
        async fn update_if_version(
            &self,
            r: &GrievanceRecord,
            _: u64,
        ) -> Result<GrievanceRecord, StoreError> {
            Ok(r.clone())
        }
        async fn sweep_lapsed(
            &self,
            _: Timer,
            _: Timestamp,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            Ok(Vec::new())
        }
        async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
            Ok(Vec::new())
        }
        async fn mark_notarized(&self, _: GrievanceId, _: Timestamp) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_is_transient() {
        let (svc, _rx) = service(Arc::new(Stalled));
        assert!(matches!(
            svc.get(GrievanceId::new()).await,
            Err(ActionError::Transient(_))
        ));
        assert!(matches!(
            svc.list(GrievanceFilter::all()).await,
            Err(ActionError::Transient(_))
        ));
    }
}
