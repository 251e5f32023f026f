// End-to-end flow over the full router with the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use proctor_api::{api_routes, AppState};
use proctor_core::InMemorySessionRepository;

fn app() -> Router {
    api_routes(AppState::new(Arc::new(InMemorySessionRepository::new())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn focus_loss_danger() -> Value {
    json!({
        "kind": "focus-loss",
        "severity": "danger",
        "message": "Candidate looked away for 6s",
        "detail": {"duration_secs": 6.0}
    })
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = app();

    // Start
    let (status, session) = send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["status"], "in-progress");
    assert_eq!(session["focus_loss_count"], 0);

    // Duplicate start is rejected
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Ingest: 2x focus-loss danger + 1x object-detection
    for expected_sequence in 1..=2 {
        let (status, recorded) = send(
            &app,
            "POST",
            "/v1/sessions/s1/events",
            Some(focus_loss_danger()),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(recorded["sequence"], expected_sequence);
    }
    let (status, recorded) = send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(json!({
            "kind": "object-detection",
            "severity": "danger",
            "message": "Phone detected",
            "detail": {"object_type": "cell phone"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(recorded["sequence"], 3);

    // End freezes the aggregate and computes the score server-side
    let (status, ended) = send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["status"], "completed");
    let score = ended["integrity_score"].as_u64().unwrap();
    assert!(score < 100);

    // Report reconciles with the log at the moment of completion
    let (status, report) = send(&app, "GET", "/v1/reports/s1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["focus_loss_count"], 2);
    assert_eq!(report["object_events"], 1);
    assert_eq!(report["multiple_faces_events"], 0);
    assert_eq!(report["total_events"], 3);
    assert_eq!(report["integrity_score"].as_u64().unwrap(), score);
    assert!(report["duration_seconds"].is_u64());
}

#[tokio::test]
async fn test_score_deterministic_across_runs() {
    let mut scores = Vec::new();
    for _ in 0..2 {
        let app = app();
        send(
            &app,
            "POST",
            "/v1/sessions",
            Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
        )
        .await;
        for _ in 0..2 {
            send(
                &app,
                "POST",
                "/v1/sessions/s1/events",
                Some(focus_loss_danger()),
            )
            .await;
        }
        send(
            &app,
            "POST",
            "/v1/sessions/s1/events",
            Some(json!({
                "kind": "object-detection",
                "severity": "danger",
                "message": "Phone detected"
            })),
        )
        .await;
        let (_, ended) = send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;
        scores.push(ended["integrity_score"].as_u64().unwrap());
    }
    assert_eq!(scores[0], scores[1]);
}

#[tokio::test]
async fn test_late_and_invalid_events_are_non_fatal() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;

    // Unknown session: 404, and no aggregate is created as a side effect
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions/ghost/events",
        Some(focus_loss_danger()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/v1/sessions/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown kind is rejected at the deserialization boundary
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(json!({
            "kind": "yawning",
            "severity": "warning",
            "message": "..."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Structural validation failure
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(json!({
            "kind": "focus-loss",
            "severity": "warning",
            "message": "  "
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;

    // Double end is rejected, not silently ignored
    let (status, _) = send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Late event after end: 409, log unchanged
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(focus_loss_danger()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, session) = send(&app, "GET", "/v1/sessions/s1", None).await;
    assert_eq!(session["events"].as_array().unwrap().len(), 0);

    // The connection-level flow keeps working for other sessions
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s2", "candidate_name": "Bob"})),
    )
    .await;
    let (status, _) = send(
        &app,
        "POST",
        "/v1/sessions/s2/events",
        Some(focus_loss_danger()),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_cancel_flow() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;

    let (status, cancelled) = send(&app, "POST", "/v1/sessions/s1/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["integrity_score"].is_null());

    let (status, _) = send(&app, "POST", "/v1/sessions/s1/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_event_log_pagination() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    for _ in 0..5 {
        send(
            &app,
            "POST",
            "/v1/sessions/s1/events",
            Some(focus_loss_danger()),
        )
        .await;
    }

    let (status, page) = send(&app, "GET", "/v1/sessions/s1/events?offset=1&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["sequence"], 2);
    assert_eq!(data[1]["sequence"], 3);
    assert_eq!(page["next_offset"], 3);
    assert_eq!(page["has_more"], true);

    let (_, tail) = send(&app, "GET", "/v1/sessions/s1/events?offset=5", None).await;
    assert_eq!(tail["data"].as_array().unwrap().len(), 0);
    assert_eq!(tail["has_more"], false);
    assert!(tail["next_offset"].is_null());
}

#[tokio::test]
async fn test_list_sessions_and_stats() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "first", "candidate_name": "Alice"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "second", "candidate_name": "Bob"})),
    )
    .await;
    send(&app, "POST", "/v1/sessions/first/end", Some(json!({}))).await;

    let (status, list) = send(&app, "GET", "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = list["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    // Summaries omit the event log
    assert!(data[0].get("events").is_none());

    let (status, stats) = send(&app, "GET", "/v1/stats/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_sessions"], 2);
    assert_eq!(stats["completed_sessions"], 1);
    assert_eq!(stats["avg_integrity_score"], 100.0);
    assert_eq!(stats["recent_sessions"][0]["session_id"], "first");
}

#[tokio::test]
async fn test_csv_report() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(focus_loss_danger()),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/reports/s1/csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/csv"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("proctoring-report-s1.csv"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    assert!(csv.starts_with("Time,Event Type,Severity,Details\n"));
    assert!(csv.contains("focus-loss"));
}

#[tokio::test]
async fn test_session_sse_replays_log_and_closes_once_finalized() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    for _ in 0..2 {
        send(
            &app,
            "POST",
            "/v1/sessions/s1/events",
            Some(focus_loss_danger()),
        )
        .await;
    }
    send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(json!({
            "kind": "object-detection",
            "severity": "danger",
            "message": "Phone detected"
        })),
    )
    .await;
    send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/sessions/s1/sse")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // The session is finalized, so the stream replays the whole log and
    // then terminates; collecting the body completes.
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    let ids: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("id: "))
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert!(text.contains("event: focus-loss"));
    assert!(text.contains("event: object-detection"));
}

#[tokio::test]
async fn test_session_sse_resumes_from_offset() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    for _ in 0..3 {
        send(
            &app,
            "POST",
            "/v1/sessions/s1/events",
            Some(focus_loss_danger()),
        )
        .await;
    }
    send(&app, "POST", "/v1/sessions/s1/end", Some(json!({}))).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/sessions/s1/sse?offset=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let ids: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("id: "))
        .collect();
    assert_eq!(ids, vec!["3"]);

    // Unknown sessions are rejected before a stream is committed
    let (status, _) = send(&app, "GET", "/v1/sessions/ghost/sse", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_report_has_provisional_score() {
    let app = app();
    send(
        &app,
        "POST",
        "/v1/sessions",
        Some(json!({"session_id": "s1", "candidate_name": "Alice"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/v1/sessions/s1/events",
        Some(focus_loss_danger()),
    )
    .await;

    // In-progress report carries a provisional score without persisting it
    let (_, report) = send(&app, "GET", "/v1/reports/s1", None).await;
    assert_eq!(report["status"], "in-progress");
    assert!(report["integrity_score"].as_u64().unwrap() < 100);

    let (_, session) = send(&app, "GET", "/v1/sessions/s1", None).await;
    assert!(session["integrity_score"].is_null());
}
