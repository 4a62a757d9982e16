//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Grievance API",
        version = "0.1.0",
        description = "Grievance lifecycle with acceptance, resolution, and verification SLA timers."
    ),
    paths(
        crate::routes::grievances::submit_grievance,
        crate::routes::grievances::user_dashboard,
        crate::routes::grievances::official_queue,
        crate::routes::grievances::community_queue,
        crate::routes::grievances::get_grievance,
        crate::routes::grievances::accept_grievance,
        crate::routes::grievances::set_time_limit,
        crate::routes::grievances::resolve_grievance,
        crate::routes::grievances::dispute_grievance,
        crate::routes::admin::disputed_queue,
        crate::routes::admin::overdue_queue,
        crate::routes::admin::lapsed_preview,
        crate::routes::admin::run_sweep,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::GrievanceResponse,
        crate::routes::ActionResponse,
        crate::routes::grievances::SubmitRequest,
        crate::routes::grievances::SubmitResponse,
        crate::routes::grievances::SetTimeRequest,
        crate::sweeper::SweepReport,
    )),
    tags(
        (name = "grievances", description = "Submission, caller actions, and role dashboards"),
        (name = "admin", description = "Administrator queues and sweep controls"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
