// Session lifecycle HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use proctor_core::{ClientSummary, Session, SessionStatus};

use crate::common::{ApiError, ListResponse};
use crate::AppState;

/// Request to start a session
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    /// Opaque session identifier assigned by the monitoring client.
    #[schema(example = "interview-2026-03-01-xyz")]
    pub session_id: String,
    /// Display name of the candidate being proctored.
    #[schema(example = "Alice Chen")]
    pub candidate_name: String,
}

/// Request to end a session. The client-side tally is optional and is used
/// only as a cross-check against the server-held event log.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EndSessionRequest {
    #[serde(default)]
    pub client_summary: Option<ClientSummary>,
}

/// Aggregate summary returned by the list endpoint (no event log)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    pub session_id: String,
    pub candidate_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub focus_loss_count: u32,
    pub face_absence_count: u32,
    pub total_events: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<u8>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            candidate_name: session.candidate_name.clone(),
            status: session.status,
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_seconds: session.duration_seconds(),
            focus_loss_count: session.focus_loss_count,
            face_absence_count: session.face_absence_count,
            total_events: session.events.len() as u32,
            integrity_score: session.integrity_score,
        }
    }
}

/// Create session lifecycle routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions", post(start_session).get(list_sessions))
        .route("/v1/sessions/:session_id", get(get_session))
        .route("/v1/sessions/:session_id/end", post(end_session))
        .route("/v1/sessions/:session_id/cancel", post(cancel_session))
        .with_state(state)
}

/// POST /v1/sessions - Start a new proctored session
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = Session),
        (status = 409, description = "Session id already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .lifecycle
        .start_session(req.session_id, req.candidate_name)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /v1/sessions - List session summaries, most-recent-first
#[utoipa::path(
    get,
    path = "/v1/sessions",
    responses(
        (status = 200, description = "List of session summaries", body = ListResponse<SessionSummary>),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<SessionSummary>>, ApiError> {
    let sessions = state.lifecycle.list_sessions().await?;
    let summaries = sessions.iter().map(SessionSummary::from).collect();
    Ok(Json(ListResponse::new(summaries)))
}

/// GET /v1/sessions/{session_id} - Get the full aggregate
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session found", body = Session),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.lifecycle.get_session(&session_id).await?;
    Ok(Json(session))
}

/// POST /v1/sessions/{session_id}/end - Complete a session
///
/// Freezes the aggregate and computes the integrity score from the
/// server-held event log. A second end returns 409.
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/end",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    request_body = EndSessionRequest,
    responses(
        (status = 200, description = "Session completed with integrity score", body = Session),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already finalized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<EndSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .lifecycle
        .end_session(&session_id, req.client_summary)
        .await?;
    Ok(Json(session))
}

/// POST /v1/sessions/{session_id}/cancel - Cancel a session
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/cancel",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session cancelled", body = Session),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already finalized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.lifecycle.cancel_session(&session_id).await?;
    Ok(Json(session))
}
