//! # Application State
//!
//! Shared state passed to all Axum route handlers via the `State`
//! extractor. The store, clock, and notarizer are trait objects chosen at
//! start-up; tests wire in a [`MemoryStore`] and a
//! [`grievance_core::ManualClock`].

use std::sync::Arc;

use grievance_core::{Clock, SystemClock};
use grievance_state::EscalationEvent;
use tokio::sync::broadcast;

use crate::actions::GrievanceService;
use crate::config::AppConfig;
use crate::notarizer::{LoggingNotarizer, Notarizer};
use crate::store::{GrievanceStore, MemoryStore};
use crate::sweeper::Sweeper;

/// Buffered escalation events per subscriber before the oldest is dropped.
const ESCALATION_CHANNEL_CAPACITY: usize = 64;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub grievances: GrievanceService,
    pub sweeper: Sweeper,
    pub escalations: broadcast::Sender<EscalationEvent>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory store, wall clock, no ledger.
    pub fn new() -> Self {
        Self::with_parts(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(LoggingNotarizer),
        )
    }

    /// Assemble state from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn GrievanceStore>,
        clock: Arc<dyn Clock>,
        notarizer: Arc<dyn Notarizer>,
    ) -> Self {
        let (escalations, _) = broadcast::channel(ESCALATION_CHANNEL_CAPACITY);
        let grievances = GrievanceService::new(
            store.clone(),
            clock.clone(),
            escalations.clone(),
            config.store_timeout,
        );
        let sweeper = Sweeper::new(store, clock, notarizer, config.sweep);
        Self {
            grievances,
            sweeper,
            escalations,
            config,
        }
    }

    /// Receive escalation events published from now on.
    pub fn subscribe_escalations(&self) -> broadcast::Receiver<EscalationEvent> {
        self.escalations.subscribe()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
