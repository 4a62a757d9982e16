//! # Grievance Lifecycle API
//!
//! Caller-driven actions and the role dashboards. The acting role comes
//! from the `x-grievance-role` header and is recorded on each transition.
//!
//! ## Endpoints
//!
//! - `POST /api/grievance/submit`: file a grievance
//! - `GET /api/grievance/user`: all grievances
//! - `GET /api/grievance/official`: pending grievances
//! - `GET /api/grievance/community`: grievances awaiting verification
//! - `GET /api/grievance/:id`: one grievance
//! - `POST /api/grievance/accept/:id`: acknowledge
//! - `POST /api/grievance/set-time/:id`: arm the resolution deadline
//! - `POST /api/grievance/resolve/:id`: claim resolved
//! - `POST /api/grievance/dispute/:id`: dispute the resolution

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use grievance_state::{QueueView, Submission};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{to_responses, ActionResponse, GrievanceResponse};
use crate::error::AppError;
use crate::extractors::{extract_json, Actor, GrievancePath};
use crate::state::AppState;
use crate::store::GrievanceFilter;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to file a grievance. Missing fields are reported as validation
/// errors rather than parse errors.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitRequest {
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
}

/// Response to a successful submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: String,
    pub grievance_id: Uuid,
}

/// Request to arm the resolution deadline.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SetTimeRequest {
    /// Days from now, in (0, 30]. Fractions allowed. A numeric string is
    /// accepted; any other value is treated as missing.
    #[serde(deserialize_with = "lenient_days")]
    pub time_in_days: Option<f64>,
}

/// Reads `timeInDays` without failing the request: a numeric string is
/// parsed, and a value that is not a number becomes `None`, which the
/// engine reports as an invalid time limit.
fn lenient_days<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(days) => days.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/grievance/submit", post(submit_grievance))
        .route("/api/grievance/user", get(user_dashboard))
        .route("/api/grievance/official", get(official_queue))
        .route("/api/grievance/community", get(community_queue))
        .route("/api/grievance/:id", get(get_grievance))
        .route("/api/grievance/accept/:id", post(accept_grievance))
        .route("/api/grievance/set-time/:id", post(set_time_limit))
        .route("/api/grievance/resolve/:id", post(resolve_grievance))
        .route("/api/grievance/dispute/:id", post(dispute_grievance))
}

async fn list_view(
    state: &AppState,
    view: QueueView,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    let records = state
        .grievances
        .list(GrievanceFilter::for_view(view))
        .await?;
    Ok(Json(to_responses(records)))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/grievance/submit: File a grievance.
#[utoipa::path(
    post,
    path = "/api/grievance/submit",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Grievance submitted", body = SubmitResponse),
        (status = 400, description = "Missing title or description", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn submit_grievance(
    State(state): State<AppState>,
    Actor(actor): Actor,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let req = extract_json(body)?;
    let submission = Submission {
        title: req.title,
        description: req.description,
        media_url: req.media_url,
    };
    let record = state.grievances.submit(submission, actor).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            status: "Grievance submitted".to_string(),
            grievance_id: *record.id.as_uuid(),
        }),
    ))
}

/// GET /api/grievance/user: Every grievance, newest first.
#[utoipa::path(
    get,
    path = "/api/grievance/user",
    responses((status = 200, description = "All grievances", body = Vec<GrievanceResponse>)),
    tag = "grievances"
)]
pub(crate) async fn user_dashboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    list_view(&state, QueueView::User).await
}

/// GET /api/grievance/official: Grievances awaiting official action.
#[utoipa::path(
    get,
    path = "/api/grievance/official",
    responses((status = 200, description = "Pending grievances", body = Vec<GrievanceResponse>)),
    tag = "grievances"
)]
pub(crate) async fn official_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    list_view(&state, QueueView::Official).await
}

/// GET /api/grievance/community: Grievances awaiting verification.
#[utoipa::path(
    get,
    path = "/api/grievance/community",
    responses((status = 200, description = "Grievances pending verification", body = Vec<GrievanceResponse>)),
    tag = "grievances"
)]
pub(crate) async fn community_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrievanceResponse>>, AppError> {
    list_view(&state, QueueView::Community).await
}

/// GET /api/grievance/:id: One grievance.
#[utoipa::path(
    get,
    path = "/api/grievance/{id}",
    params(("id" = Uuid, Path, description = "Grievance ID")),
    responses(
        (status = 200, description = "Grievance found", body = GrievanceResponse),
        (status = 404, description = "Grievance not found", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn get_grievance(
    State(state): State<AppState>,
    GrievancePath(id): GrievancePath,
) -> Result<Json<GrievanceResponse>, AppError> {
    let record = state.grievances.get(id).await?;
    Ok(Json(record.into()))
}

/// POST /api/grievance/accept/:id: Acknowledge a grievance.
#[utoipa::path(
    post,
    path = "/api/grievance/accept/{id}",
    params(("id" = Uuid, Path, description = "Grievance ID")),
    responses(
        (status = 200, description = "Grievance accepted", body = ActionResponse),
        (status = 404, description = "Grievance not found", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn accept_grievance(
    State(state): State<AppState>,
    Actor(actor): Actor,
    GrievancePath(id): GrievancePath,
) -> Result<Json<ActionResponse>, AppError> {
    let record = state.grievances.accept(id, actor).await?;
    Ok(Json(ActionResponse::new("Grievance accepted", record)))
}

/// POST /api/grievance/set-time/:id: Arm the resolution deadline.
#[utoipa::path(
    post,
    path = "/api/grievance/set-time/{id}",
    params(("id" = Uuid, Path, description = "Grievance ID")),
    request_body = SetTimeRequest,
    responses(
        (status = 200, description = "Time limit set", body = ActionResponse),
        (status = 400, description = "Invalid time limit", body = crate::error::ErrorBody),
        (status = 404, description = "Grievance not found", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn set_time_limit(
    State(state): State<AppState>,
    Actor(actor): Actor,
    GrievancePath(id): GrievancePath,
    body: Result<Json<SetTimeRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let req = extract_json(body)?;
    let record = state
        .grievances
        .set_resolution_deadline(id, req.time_in_days, actor)
        .await?;
    Ok(Json(ActionResponse::new("Time limit set", record)))
}

/// POST /api/grievance/resolve/:id: Claim a grievance resolved.
#[utoipa::path(
    post,
    path = "/api/grievance/resolve/{id}",
    params(("id" = Uuid, Path, description = "Grievance ID")),
    responses(
        (status = 200, description = "Pending verification", body = ActionResponse),
        (status = 403, description = "Dispute threshold reached or already verified", body = crate::error::ErrorBody),
        (status = 404, description = "Grievance not found", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn resolve_grievance(
    State(state): State<AppState>,
    Actor(actor): Actor,
    GrievancePath(id): GrievancePath,
) -> Result<Json<ActionResponse>, AppError> {
    let record = state.grievances.resolve(id, actor).await?;
    Ok(Json(ActionResponse::new("Pending Verification", record)))
}

/// POST /api/grievance/dispute/:id: Dispute a claimed resolution.
#[utoipa::path(
    post,
    path = "/api/grievance/dispute/{id}",
    params(("id" = Uuid, Path, description = "Grievance ID")),
    responses(
        (status = 200, description = "Disputed", body = ActionResponse),
        (status = 404, description = "Grievance not found", body = crate::error::ErrorBody),
    ),
    tag = "grievances"
)]
pub(crate) async fn dispute_grievance(
    State(state): State<AppState>,
    Actor(actor): Actor,
    GrievancePath(id): GrievancePath,
) -> Result<Json<ActionResponse>, AppError> {
    let record = state.grievances.dispute(id, actor).await?;
    Ok(Json(ActionResponse::new("Disputed", record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::send;
    use serde_json::json;

    fn app() -> Router {
        router().with_state(AppState::new())
    }

    async fn submit(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/grievance/submit",
            None,
            Some(json!({"title": "Streetlight out", "description": "Dark since Monday"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "Grievance submitted");
        body["grievanceId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn submit_then_get() {
        let app = app();
        let id = submit(&app).await;
        let (status, body) = send(&app, "GET", &format!("/api/grievance/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Streetlight out");
        assert_eq!(body["status"], "Pending");
        assert_eq!(body["disputeCount"], 0);
        assert_eq!(body["transitions"][0]["action"], "submitted");
    }

    #[tokio::test]
    async fn submit_without_title_is_400() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/grievance/submit",
            None,
            Some(json!({"description": "no title"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "title is required");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/grievance/submit",
            None,
            Some(json!({"title": 5, "description": "typed wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let app = app();
        let missing = Uuid::new_v4();
        for uri in [
            format!("/api/grievance/{missing}"),
            "/api/grievance/not-a-uuid".to_string(),
        ] {
            let (status, body) = send(&app, "GET", &uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "Grievance not found");
        }
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/grievance/accept/{missing}"),
            Some("official"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn accept_records_actor_without_changing_status() {
        let app = app();
        let id = submit(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/grievance/accept/{id}"),
            Some("official"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Grievance accepted");
        assert_eq!(body["grievance"]["status"], "Pending");
        let last = &body["grievance"]["transitions"][1];
        assert_eq!(last["action"], "accepted");
        assert_eq!(last["actor"], "official");
    }

    #[tokio::test]
    async fn set_time_validates_range() {
        let app = app();
        let id = submit(&app).await;
        let uri = format!("/api/grievance/set-time/{id}");

        for bad in [json!({"timeInDays": 0}), json!({"timeInDays": 31}), json!({})] {
            let (status, body) = send(&app, "POST", &uri, Some("official"), Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid time limit. Max 30 days.");
        }

        let (status, body) = send(
            &app,
            "POST",
            &uri,
            Some("official"),
            Some(json!({"timeInDays": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Time limit set");
        assert!(body["grievance"]["resolveBy"].is_string());
    }

    #[tokio::test]
    async fn set_time_reads_numeric_strings() {
        let app = app();
        let id = submit(&app).await;
        let uri = format!("/api/grievance/set-time/{id}");

        let (status, body) = send(
            &app,
            "POST",
            &uri,
            Some("official"),
            Some(json!({"timeInDays": "5"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["grievance"]["resolveBy"].is_string());

        for bad in [
            json!({"timeInDays": "five"}),
            json!({"timeInDays": null}),
            json!({"timeInDays": [5]}),
            json!({"timeInDays": "45"}),
        ] {
            let (status, body) = send(&app, "POST", &uri, Some("official"), Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid time limit. Max 30 days.");
        }
    }

    #[tokio::test]
    async fn resolve_then_dispute() {
        let app = app();
        let id = submit(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/grievance/resolve/{id}"),
            Some("official"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Pending Verification");
        assert_eq!(body["grievance"]["status"], "PendingVerification");
        assert!(body["grievance"]["verificationDeadline"].is_string());

        let (_, queue) = send(&app, "GET", "/api/grievance/community", None, None).await;
        assert_eq!(queue.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/grievance/dispute/{id}"),
            Some("community"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Disputed");
        assert_eq!(body["grievance"]["disputeCount"], 1);
        assert!(body["grievance"]["verificationDeadline"].is_null());

        let (_, queue) = send(&app, "GET", "/api/grievance/community", None, None).await;
        assert!(queue.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn queues_filter_by_status() {
        let app = app();
        let first = submit(&app).await;
        submit(&app).await;
        send(
            &app,
            "POST",
            &format!("/api/grievance/resolve/{first}"),
            Some("official"),
            None,
        )
        .await;

        let (_, all) = send(&app, "GET", "/api/grievance/user", None, None).await;
        let (_, official) = send(&app, "GET", "/api/grievance/official", None, None).await;
        let (_, community) = send(&app, "GET", "/api/grievance/community", None, None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(official.as_array().unwrap().len(), 1);
        assert_eq!(community.as_array().unwrap().len(), 1);
        assert_eq!(community[0]["id"], first.as_str());
    }

    #[tokio::test]
    async fn unknown_role_header_is_400() {
        let app = app();
        let id = submit(&app).await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/grievance/accept/{id}"),
            Some("mayor"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
