// Event ingestion and streaming HTTP routes
//
// Ingestion is the write path for the real-time detection stream; the two
// SSE routes are notifications only, never primary storage. The
// per-session stream supports offset-based resumption: the `id` field of
// each SSE event carries the ingestion sequence, so clients can reconnect
// with `?offset=N` and replay from where they left off.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use futures::{
    stream::{self, Stream},
    StreamExt,
};
use std::{convert::Infallible, time::Duration};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use proctor_core::{EventDetail, EventKind, EventRecord, RecordedEvent, Severity};

use crate::common::ApiError;
use crate::AppState;

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/sessions/:session_id/events",
            post(ingest_event).get(list_events),
        )
        .route("/v1/sessions/:session_id/sse", get(stream_session_sse))
        .route("/v1/alerts/sse", get(stream_alerts_sse))
        .with_state(state)
}

// ============================================
// Ingestion
// ============================================

/// One detection occurrence as submitted by the monitoring client.
/// The target session comes from the path.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngestEventRequest {
    pub kind: EventKind,
    pub severity: Severity,
    /// Human-readable description of the detection.
    #[schema(example = "Candidate looked away from the screen")]
    pub message: String,
    /// Producer-side timestamp; defaults to the server clock when omitted.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub detail: Option<EventDetail>,
}

/// POST /v1/sessions/{session_id}/events - Ingest one detection event
///
/// Non-fatal failures (unknown session, closed session, invalid event)
/// come back as JSON error bodies so the monitoring client's stream keeps
/// flowing.
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/events",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    request_body = IngestEventRequest,
    responses(
        (status = 202, description = "Event accepted and applied", body = RecordedEvent),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session closed; event log is immutable"),
        (status = 422, description = "Invalid event"),
        (status = 500, description = "Internal server error")
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<IngestEventRequest>,
) -> Result<(StatusCode, Json<RecordedEvent>), ApiError> {
    let record = EventRecord {
        session_id,
        kind: req.kind,
        severity: req.severity,
        message: req.message,
        occurred_at: req.occurred_at.unwrap_or_else(Utc::now),
        detail: req.detail,
    };

    let recorded = state.ingestor.ingest(record).await?;
    Ok((StatusCode::ACCEPTED, Json(recorded)))
}

// ============================================
// Event log listing (JSON, offset pagination)
// ============================================

/// Query parameters for the event log page
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Resume from this offset (ingestion sequence). Events with
    /// sequence > offset are returned. Use 0 or omit to start from the
    /// beginning.
    #[param(example = 0)]
    pub offset: Option<u32>,
    /// Maximum number of events to return. Defaults to 100 if not specified.
    #[param(example = 100)]
    pub limit: Option<u32>,
}

/// Paginated event log page with offset-based resumption.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventsResponse {
    /// Events in ingestion order.
    pub data: Vec<RecordedEvent>,
    /// Next offset to use for pagination. Pass this as `?offset=` to get
    /// the next page. If null, there are no more events (you've caught up).
    pub next_offset: Option<u32>,
    /// Whether more events may be available beyond this page.
    pub has_more: bool,
}

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

/// GET /v1/sessions/{session_id}/events - Page through the event log
///
/// Cache-Control is set for historical reads: past pages of a finalized
/// session are immutable and cacheable.
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}/events",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        EventsQuery
    ),
    responses(
        (status = 200, description = "Event log page", body = EventsResponse),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .repo
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;

    let mut page: Vec<RecordedEvent> = session
        .events
        .iter()
        .filter(|e| e.sequence > offset)
        .take(limit + 1)
        .cloned()
        .collect();

    let has_more = page.len() > limit;
    page.truncate(limit);
    let next_offset = page.last().map(|e| e.sequence);

    let response = EventsResponse {
        data: page,
        next_offset,
        has_more,
    };

    // Historical pages of a finalized session never change; the live tail
    // of an in-progress session must not be cached.
    let cache_control = if session.status.is_terminal() && has_more {
        "public, max-age=31536000, immutable"
    } else {
        "no-cache"
    };

    Ok(([(header::CACHE_CONTROL, cache_control)], Json(response)))
}

// ============================================
// SSE streams
// ============================================

/// Query parameters for per-session SSE streaming
#[derive(Debug, Deserialize, IntoParams)]
pub struct SseQuery {
    /// Resume from this offset (ingestion sequence). Events with
    /// sequence > offset are streamed. Use 0 or omit to replay from the
    /// beginning.
    #[param(example = 0)]
    pub offset: Option<u32>,
}

/// GET /v1/sessions/{session_id}/sse - Stream one session's events
///
/// Replays the log from `?offset=N`, then tails live ingestion. The stream
/// closes once the session is finalized and fully drained.
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}/sse",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        SseQuery
    ),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "events"
)]
pub async fn stream_session_sse(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    // Verify the session exists before committing to a stream response
    state
        .repo
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;

    let initial_offset = query.offset.unwrap_or(0);
    tracing::info!(session_id = %session_id, offset = initial_offset, "starting session event stream");

    let repo = state.repo.clone();

    let stream = stream::unfold(initial_offset, move |last_sequence| {
        let repo = repo.clone();
        let session_id = session_id.clone();
        async move {
            match repo.get(&session_id).await {
                Ok(Some(session)) => {
                    let pending: Vec<RecordedEvent> = session
                        .events
                        .iter()
                        .filter(|e| e.sequence > last_sequence)
                        .cloned()
                        .collect();

                    if let Some(new_sequence) = pending.last().map(|e| e.sequence) {
                        let sse_events: Vec<Result<SseEvent, Infallible>> = pending
                            .into_iter()
                            .map(|event| {
                                let json = serde_json::to_string(&event)
                                    .unwrap_or_else(|_| "{}".to_string());

                                Ok(SseEvent::default()
                                    .event(event.kind.to_string())
                                    .data(json)
                                    .id(event.sequence.to_string()))
                            })
                            .collect();

                        Some((stream::iter(sse_events), new_sequence))
                    } else if session.status.is_terminal() {
                        // Finalized and drained: nothing more will ever come
                        None
                    } else {
                        // No new events, wait a bit before polling again
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Some((stream::iter(vec![]), last_sequence))
                    }
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::error!("failed to poll session events: {e}");
                    None
                }
            }
        }
    })
    .flatten();

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Accepted event fanned out to all connected observers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Alert {
    pub session_id: String,
    pub event: RecordedEvent,
}

/// GET /v1/alerts/sse - Live alert stream across all sessions
///
/// Backed by the post-ingestion broadcast channel (interviewer monitor
/// view). No replay: subscribers see events accepted after they connect,
/// and a lagging subscriber drops its own backlog without affecting
/// ingestion.
#[utoipa::path(
    get,
    path = "/v1/alerts/sse",
    responses(
        (status = 200, description = "Alert stream", content_type = "text/event-stream")
    ),
    tag = "events"
)]
pub async fn stream_alerts_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.publisher.subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(|notice| async move {
        match notice {
            Ok(notice) => {
                let alert = Alert {
                    session_id: notice.session_id,
                    event: notice.event,
                };
                let json = serde_json::to_string(&alert).unwrap_or_else(|_| "{}".to_string());

                Some(Ok(SseEvent::default()
                    .event("alert")
                    .data(json)
                    .id(alert_id(&alert))))
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "alert subscriber lagged; dropping backlog");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn alert_id(alert: &Alert) -> String {
    format!("{}-{}", alert.session_id, alert.event.sequence)
}
