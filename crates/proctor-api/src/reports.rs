// Report and dashboard HTTP routes
//
// Read-only projections over aggregate snapshots. CSV rendering lives at
// this edge; the engine itself never formats text.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use proctor_core::{build_report, integrity_score, summarize, Report, StatsSummary};

use crate::common::ApiError;
use crate::AppState;

/// Create report routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/reports/:session_id", get(get_report))
        .route("/v1/reports/:session_id/csv", get(get_report_csv))
        .route("/v1/stats/summary", get(get_stats_summary))
        .with_state(state)
}

/// GET /v1/reports/{session_id} - Proctoring report
///
/// For an in-progress session the integrity score is a live provisional
/// value computed on demand (the calculator is pure, so nothing is
/// persisted); a completed session echoes its frozen score.
#[utoipa::path(
    get,
    path = "/v1/reports/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Report", body = Report),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let session = state
        .repo
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;

    let mut report = build_report(&session);
    if report.integrity_score.is_none() && !session.status.is_terminal() {
        report.integrity_score = Some(integrity_score(&session));
    }
    Ok(Json(report))
}

/// GET /v1/reports/{session_id}/csv - Report as CSV attachment
#[utoipa::path(
    get,
    path = "/v1/reports/{session_id}/csv",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "CSV report", content_type = "text/csv"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "reports"
)]
pub async fn get_report_csv(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .repo
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;

    let csv = render_csv(&build_report(&session));
    let disposition = format!(
        "attachment; filename=proctoring-report-{}.csv",
        session.session_id
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// GET /v1/stats/summary - Dashboard statistics
#[utoipa::path(
    get,
    path = "/v1/stats/summary",
    responses(
        (status = 200, description = "Dashboard statistics", body = StatsSummary),
        (status = 500, description = "Internal server error")
    ),
    tag = "reports"
)]
pub async fn get_stats_summary(
    State(state): State<AppState>,
) -> Result<Json<StatsSummary>, ApiError> {
    let sessions = state.repo.list().await?;
    Ok(Json(summarize(&sessions)))
}

fn render_csv(report: &Report) -> String {
    let mut csv = String::from("Time,Event Type,Severity,Details\n");
    for event in &report.events {
        csv.push_str(&format!(
            "\"{}\",\"{}\",\"{}\",\"{}\"\n",
            event.occurred_at.format("%H:%M:%S"),
            event.kind,
            event.severity,
            event.message.replace('"', "\"\"")
        ));
    }
    csv
}
