//! # Reconciliation Sweeper
//!
//! Periodically promotes records whose SLA deadlines have lapsed. Each tick
//! runs three independent steps in order:
//!
//! 1. acceptance expiry: `Pending` with `acceptBy < now` → `Overdue`
//! 2. resolution expiry: `Pending` with `resolveBy < now` → `Overdue`
//! 3. verification expiry: `PendingVerification` with
//!    `verificationDeadline < now` → `Verified`
//!
//! A step that fails or exceeds its store timeout is skipped and retried on
//! the next tick; the remaining steps still run. Every step is a single
//! conditional bulk update, so a second tick at the same instant changes
//! nothing.
//!
//! Notarization runs last, from the store rather than from the step's
//! result: every `Verified` record without `notarizedAt` is sent to the
//! ledger and then marked. A promotion whose acknowledgement was lost to a
//! timeout is still picked up, and a record whose call or mark failed is
//! sent again on the next tick.
//!
//! The loop is owned by a [`SweepHandle`]: [`Sweeper::start`] spawns it and
//! [`SweepHandle::stop`] ends it. [`Sweeper::run_once`] runs one tick inline,
//! which is how tests and the admin endpoint drive it.

use std::sync::Arc;
use std::time::Duration;

use grievance_core::{Clock, Timestamp};
use grievance_state::Timer;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use utoipa::ToSchema;

use crate::notarizer::Notarizer;
use crate::store::GrievanceStore;

const NOTARIZATION_STEP: &str = "notarization";

/// Sweep cadence and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Bound on each step's store call.
    pub store_timeout: Duration,
}

impl SweepConfig {
    /// Development cadence.
    pub const DEVELOPMENT_INTERVAL: Duration = Duration::from_secs(60);
    /// Production cadence.
    pub const PRODUCTION_INTERVAL: Duration = Duration::from_secs(3600);
    pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEVELOPMENT_INTERVAL,
            store_timeout: Self::DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Pending records moved to Overdue by the acceptance timer.
    pub acceptance_overdue: usize,
    /// Pending records moved to Overdue by the resolution timer.
    pub resolution_overdue: usize,
    /// Records promoted to Verified.
    pub verified: usize,
    /// Notarization calls that succeeded.
    pub notarized: usize,
    /// Notarization calls that failed. The promotions stand and the records
    /// are retried on the next tick.
    pub notarization_failures: usize,
    /// Steps skipped on error or timeout, by timer name or `notarization`.
    pub skipped_steps: Vec<String>,
}

impl SweepReport {
    /// Total records changed.
    pub fn changed(&self) -> usize {
        self.acceptance_overdue + self.resolution_overdue + self.verified
    }

    fn record(&mut self, timer: Timer, count: usize) {
        match timer {
            Timer::Acceptance => self.acceptance_overdue = count,
            Timer::Resolution => self.resolution_overdue = count,
            Timer::Verification => self.verified = count,
        }
    }
}

/// Applies time-driven transitions across all records.
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: Arc<dyn GrievanceStore>,
    clock: Arc<dyn Clock>,
    notarizer: Arc<dyn Notarizer>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn GrievanceStore>,
        clock: Arc<dyn Clock>,
        notarizer: Arc<dyn Notarizer>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            clock,
            notarizer,
            config,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run one tick.
    pub async fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for timer in Timer::SWEEP_ORDER {
            let step = tokio::time::timeout(
                self.config.store_timeout,
                self.store.sweep_lapsed(timer, now),
            )
            .await;

            let changed = match step {
                Ok(Ok(changed)) => changed,
                Ok(Err(err)) => {
                    tracing::error!(%timer, error = %err, "sweep step failed; retrying next tick");
                    report.skipped_steps.push(timer.to_string());
                    continue;
                }
                Err(_) => {
                    tracing::warn!(%timer, timeout = ?self.config.store_timeout, "sweep step timed out; retrying next tick");
                    report.skipped_steps.push(timer.to_string());
                    continue;
                }
            };

            report.record(timer, changed.len());
            if !changed.is_empty() {
                tracing::info!(%timer, count = changed.len(), to = %timer.lapse_status(), "sweep applied lapse");
            }
        }

        self.notarize_verified(now, &mut report).await;
        report
    }

    /// Send every unacknowledged verification to the ledger and mark it.
    async fn notarize_verified(&self, now: Timestamp, report: &mut SweepReport) {
        let timeout = self.config.store_timeout;
        let awaiting = match tokio::time::timeout(timeout, self.store.awaiting_notarization()).await {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                tracing::error!(error = %err, "notarization backlog unreadable; retrying next tick");
                report.skipped_steps.push(NOTARIZATION_STEP.to_string());
                return;
            }
            Err(_) => {
                tracing::warn!(?timeout, "notarization backlog read timed out; retrying next tick");
                report.skipped_steps.push(NOTARIZATION_STEP.to_string());
                return;
            }
        };

        for record in &awaiting {
            if let Err(err) = self.notarizer.notarize(record).await {
                report.notarization_failures += 1;
                tracing::warn!(grievance_id = %record.id, error = %err, "notarization failed; verification stands");
                continue;
            }
            report.notarized += 1;

            match tokio::time::timeout(timeout, self.store.mark_notarized(record.id, now)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    tracing::warn!(grievance_id = %record.id, error = %err, "notarization not recorded; will resend");
                }
                Err(_) => {
                    tracing::warn!(grievance_id = %record.id, ?timeout, "notarization mark timed out; will resend");
                }
            }
        }
    }

    /// Spawn the recurring loop. The first tick runs immediately.
    pub fn start(self) -> SweepHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval = ?self.config.interval, "reconciliation sweeper started");
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.run_once().await;
                        report_tx.send_replace(Some(report));
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("reconciliation sweeper stopped");
        });

        SweepHandle {
            shutdown: shutdown_tx,
            reports: report_rx,
            join,
        }
    }
}

/// Owner of a running sweep loop.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    reports: watch::Receiver<Option<SweepReport>>,
    join: JoinHandle<()>,
}

impl SweepHandle {
    /// Subscribe to tick reports. Holds `None` until the first tick ends.
    pub fn reports(&self) -> watch::Receiver<Option<SweepReport>> {
        self.reports.clone()
    }

    /// Stop the loop and wait for an in-flight tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notarizer::NotarizeError;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use grievance_core::{CanonicalizationError, GrievanceId, ManualClock, Timestamp};
    use grievance_state::{GrievanceRecord, GrievanceStatus, Role, Submission};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recording {
        calls: Mutex<Vec<GrievanceId>>,
        fail: bool,
    }

    #[async_trait]
    impl Notarizer for Recording {
        async fn notarize(&self, record: &GrievanceRecord) -> Result<(), NotarizeError> {
            self.calls.lock().push(record.id);
            if self.fail {
                return Err(NotarizeError::Digest(CanonicalizationError::FloatRejected(0.5)));
            }
            Ok(())
        }
    }

    fn t0() -> Timestamp {
        Timestamp::parse("2026-07-01T00:00:00Z").unwrap()
    }

    fn submit(store: &MemoryStore) -> GrievanceRecord {
        let r = GrievanceRecord::submit(
            Submission {
                title: "bridge".into(),
                description: "railing broken".into(),
                media_url: None,
            },
            Role::User,
            t0(),
        )
        .unwrap();
        store.put(r.clone());
        r
    }

    fn status_of(store: &MemoryStore, id: GrievanceId) -> Option<GrievanceStatus> {
        store.snapshot(id).map(|r| r.status)
    }

    fn sweeper(store: &MemoryStore, clock: &ManualClock, notarizer: Arc<Recording>) -> Sweeper {
        Sweeper::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            notarizer,
            SweepConfig::default(),
        )
    }

    #[tokio::test]
    async fn lapsed_acceptance_goes_overdue_once() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let r = submit(&store);
        let sweeper = sweeper(&store, &clock, Arc::new(Recording::default()));

        assert_eq!(sweeper.run_once().await.changed(), 0);

        clock.advance(ChronoDuration::hours(25));
        let report = sweeper.run_once().await;
        assert_eq!(report.acceptance_overdue, 1);
        assert_eq!(report.resolution_overdue, 0);
        assert_eq!(
            status_of(&store, r.id),
            Some(GrievanceStatus::Overdue)
        );

        assert_eq!(sweeper.run_once().await, SweepReport::default());
    }

    #[tokio::test]
    async fn resolution_lapse_counts_separately() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&store);
        r.accept_by = t0().checked_add(ChronoDuration::days(10)).unwrap();
        r.set_resolution_deadline(Some(1.0), Role::Official, t0())
            .unwrap();
        store.put(r.clone());

        clock.advance(ChronoDuration::days(2));
        let report = sweeper(&store, &clock, Arc::new(Recording::default()))
            .run_once()
            .await;
        assert_eq!(report.acceptance_overdue, 0);
        assert_eq!(report.resolution_overdue, 1);
    }

    #[tokio::test]
    async fn verification_lapse_notarizes_exactly_once() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&store);
        r.resolve(Role::Official, t0()).unwrap();
        store.put(r.clone());
        let notarizer = Arc::new(Recording::default());
        let sweeper = sweeper(&store, &clock, notarizer.clone());

        clock.advance(ChronoDuration::days(8));
        let report = sweeper.run_once().await;
        assert_eq!(report.verified, 1);
        assert_eq!(report.notarized, 1);
        sweeper.run_once().await;
        assert_eq!(notarizer.calls.lock().as_slice(), &[r.id]);
        assert_eq!(status_of(&store, r.id), Some(GrievanceStatus::Verified));
    }

    #[tokio::test]
    async fn notarization_failure_keeps_verification_and_resends() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&store);
        r.resolve(Role::Official, t0()).unwrap();
        store.put(r.clone());
        let notarizer = Arc::new(Recording {
            calls: Mutex::default(),
            fail: true,
        });
        let sweeper = sweeper(&store, &clock, notarizer.clone());

        clock.advance(ChronoDuration::days(8));
        let report = sweeper.run_once().await;
        assert_eq!(report.verified, 1);
        assert_eq!(report.notarization_failures, 1);
        assert_eq!(status_of(&store, r.id), Some(GrievanceStatus::Verified));

        let again = sweeper.run_once().await;
        assert_eq!(again.verified, 0);
        assert_eq!(again.notarization_failures, 1);
        assert_eq!(notarizer.calls.lock().as_slice(), &[r.id, r.id]);
        assert_eq!(store.snapshot(r.id).unwrap().notarized_at, None);
    }

    #[tokio::test]
    async fn notarized_record_is_marked_with_sweep_instant() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&store);
        r.resolve(Role::Official, t0()).unwrap();
        store.put(r.clone());

        clock.advance(ChronoDuration::days(8));
        sweeper(&store, &clock, Arc::new(Recording::default()))
            .run_once()
            .await;
        assert_eq!(store.snapshot(r.id).unwrap().notarized_at, Some(clock.now()));
    }

    /// Store whose acceptance sweep errors and whose resolution sweep hangs.
    #[derive(Debug)]
    struct Flaky(MemoryStore);

    #[async_trait]
    impl GrievanceStore for Flaky {
        async fn insert(&self, r: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
            self.0.insert(r).await
        }
        async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
            self.0.get(id).await
        }
        async fn find(
            &self,
            f: &crate::store::GrievanceFilter,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.0.find(f).await
        }
        async fn update_if_version(
            &self,
            r: &GrievanceRecord,
            v: u64,
        ) -> Result<GrievanceRecord, StoreError> {
            self.0.update_if_version(r, v).await
        }
        async fn sweep_lapsed(
            &self,
            timer: Timer,
            now: Timestamp,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            match timer {
                Timer::Acceptance => Err(StoreError::Corrupt("boom".into())),
                Timer::Resolution => std::future::pending().await,
                Timer::Verification => self.0.sweep_lapsed(timer, now).await,
            }
        }
        async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.0.awaiting_notarization().await
        }
        async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError> {
            self.0.mark_notarized(id, at).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Store whose verification sweep commits, then stalls past the step
    /// timeout before acknowledging.
    #[derive(Debug)]
    struct SlowAck(MemoryStore);

    #[async_trait]
    impl GrievanceStore for SlowAck {
        async fn insert(&self, r: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
            self.0.insert(r).await
        }
        async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
            self.0.get(id).await
        }
        async fn find(
            &self,
            f: &crate::store::GrievanceFilter,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.0.find(f).await
        }
        async fn update_if_version(
            &self,
            r: &GrievanceRecord,
            v: u64,
        ) -> Result<GrievanceRecord, StoreError> {
            self.0.update_if_version(r, v).await
        }
        async fn sweep_lapsed(
            &self,
            timer: Timer,
            now: Timestamp,
        ) -> Result<Vec<GrievanceRecord>, StoreError> {
            let changed = self.0.sweep_lapsed(timer, now).await?;
            if timer == Timer::Verification {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(changed)
        }
        async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
            self.0.awaiting_notarization().await
        }
        async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError> {
            self.0.mark_notarized(id, at).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn verification_committed_before_timeout_is_still_notarized_once() {
        let inner = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&inner);
        r.resolve(Role::Official, t0()).unwrap();
        inner.put(r.clone());
        clock.advance(ChronoDuration::days(8));

        let notarizer = Arc::new(Recording::default());
        let sweeper = Sweeper::new(
            Arc::new(SlowAck(inner.clone())),
            Arc::new(clock.clone()),
            notarizer.clone(),
            SweepConfig::default(),
        );

        let first = sweeper.run_once().await;
        assert_eq!(first.skipped_steps, vec!["verification"]);
        assert_eq!(first.verified, 0);
        assert_eq!(first.notarized, 1);

        let second = sweeper.run_once().await;
        assert_eq!(second.notarized, 0);
        assert_eq!(notarizer.calls.lock().as_slice(), &[r.id]);
        assert_eq!(status_of(&inner, r.id), Some(GrievanceStatus::Verified));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_steps_do_not_block_later_steps() {
        let inner = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut r = submit(&inner);
        r.resolve(Role::Official, t0()).unwrap();
        inner.put(r.clone());
        clock.advance(ChronoDuration::days(8));

        let sweeper = Sweeper::new(
            Arc::new(Flaky(inner.clone())),
            Arc::new(clock.clone()),
            Arc::new(Recording::default()),
            SweepConfig::default(),
        );
        let report = sweeper.run_once().await;
        assert_eq!(report.skipped_steps, vec!["acceptance", "resolution"]);
        assert_eq!(report.verified, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_on_interval_and_stops() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let sweeper = Sweeper::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(Recording::default()),
            SweepConfig {
                interval: Duration::from_secs(60),
                store_timeout: Duration::from_secs(1),
            },
        );

        let handle = sweeper.start();
        let mut reports = handle.reports();

        reports.changed().await.unwrap();
        let first = tokio::time::Instant::now();

        let r = submit(&store);
        clock.advance(ChronoDuration::hours(25));

        reports.changed().await.unwrap();
        assert!(first.elapsed() >= Duration::from_secs(60));
        let report = reports.borrow().clone().unwrap();
        assert_eq!(report.acceptance_overdue, 1);
        assert_eq!(status_of(&store, r.id), Some(GrievanceStatus::Overdue));

        handle.stop().await;
    }
}
