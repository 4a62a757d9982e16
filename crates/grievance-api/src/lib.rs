//! # grievance-api: Axum Service for the Grievance Stack
//!
//! Grievances move through a five-state lifecycle under three SLA timers:
//! acceptance (24h from submission), resolution (official-chosen, up to 30
//! days), and verification (7 days after a claimed resolution). Caller
//! actions are handled by [`actions::GrievanceService`]; time-driven
//! transitions are applied by the [`sweeper::Sweeper`], which also hands
//! each newly verified grievance to a [`notarizer::Notarizer`].
//!
//! ## API Surface
//!
//! | Prefix               | Module                  | Domain                   |
//! |----------------------|-------------------------|--------------------------|
//! | `/api/grievance/*`   | [`routes::grievances`]  | Actions, role dashboards |
//! | `/api/admin/*`       | [`routes::admin`]       | Admin queues, sweep      |
//! | `/openapi.json`      | [`openapi`]             | OpenAPI document         |
//! | `/health/*`          | this module             | Probes                   |
//!
//! ## Storage
//!
//! [`store::GrievanceStore`] has two implementations: the in-memory
//! [`store::MemoryStore`] and the Postgres-backed [`db::grievances::PgStore`].
//! Every write is compare-and-update on the record version or, for sweeps,
//! on the record status.

pub mod actions;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod notarizer;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweeper;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::grievances::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api).with_state(state)
}

/// Liveness probe. Always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when the store cannot be reached.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.grievances.store().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
