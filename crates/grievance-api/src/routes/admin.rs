//! # Administrator API
//!
//! Disputed and overdue queues, plus operational controls for the
//! reconciliation sweep.
//!
//! ## Endpoints
//!
//! - `GET /api/admin/disputed`: disputed grievances
//! - `GET /api/admin/overdue`: overdue grievances
//! - `GET /api/admin/lapsed/:timer`: records a sweep would move now
//! - `POST /api/admin/sweep`: run one sweep tick immediately

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use grievance_state::{QueueView, Timer};

use super::{to_responses, GrievanceResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::GrievanceFilter;
use crate::sweeper::SweepReport;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/disputed", get(disputed_queue))
        .route("/api/admin/overdue", get(overdue_queue))
        .route("/api/admin/lapsed/:timer", get(lapsed_preview))
        .route("/api/admin/sweep", post(run_sweep))
}

fn parse_timer(raw: &str) -> Result<Timer, AppError> {
    Timer::SWEEP_ORDER
        .into_iter()
        .find(|timer| timer.as_str() == raw)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "unknown timer {raw:?}; expected acceptance, resolution, or verification"
            ))
        })
}

/// GET /api/admin/disputed
#[utoipa::path(
    get,
    path = "/api/admin/disputed",
    responses((status = 200, description = "Disputed grievances", body = Vec<GrievanceResponse>)),
    tag = "admin"
)]
pub(crate) async fn disputed_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    let records = state
        .grievances
        .list(GrievanceFilter::for_view(QueueView::AdminDisputed))
        .await?;
    Ok(Json(to_responses(records)))
}

/// GET /api/admin/overdue
#[utoipa::path(
    get,
    path = "/api/admin/overdue",
    responses((status = 200, description = "Overdue grievances", body = Vec<GrievanceResponse>)),
    tag = "admin"
)]
pub(crate) async fn overdue_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    let records = state
        .grievances
        .list(GrievanceFilter::for_view(QueueView::AdminOverdue))
        .await?;
    Ok(Json(to_responses(records)))
}

/// GET /api/admin/lapsed/:timer
///
/// Read-only: lists what the next sweep would move for one timer.
#[utoipa::path(
    get,
    path = "/api/admin/lapsed/{timer}",
    params(("timer" = String, Path, description = "acceptance, resolution, or verification")),
    responses(
        (status = 200, description = "Records whose timer has lapsed", body = Vec<GrievanceResponse>),
        (status = 400, description = "Unknown timer", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn lapsed_preview(
    State(state): State<AppState>,
    Path(timer): Path<String>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    let timer = parse_timer(&timer)?;
    let now = state.grievances.now();
    let records = state
        .grievances
        .list(GrievanceFilter::lapsed(timer, now))
        .await?;
    Ok(Json(to_responses(records)))
}

/// POST /api/admin/sweep
///
/// Runs one tick out of band. Safe alongside the scheduled loop because
/// every sweep write is conditional on status.
#[utoipa::path(
    post,
    path = "/api/admin/sweep",
    responses((status = 200, description = "Sweep report", body = SweepReport)),
    tag = "admin"
)]
pub(crate) async fn run_sweep(State(state): State<AppState>) -> Json<SweepReport> {
    let report = state.sweeper.run_once().await;
    tracing::info!(changed = report.changed(), "manual sweep finished");
    Json(report)
}
