// Read-side projections: per-session report and dashboard summary
//
// Pure functions over aggregate snapshots; nothing here mutates the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, RecordedEvent};
use crate::session::{Session, SessionStatus};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Proctoring report for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Report {
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
    /// focus-loss + face-absence events
    pub focus_events: u32,
    /// object-detection events
    pub object_events: u32,
    /// multiple-faces events
    pub multiple_faces_events: u32,
    pub total_events: u32,
    /// Absent if the session is still in progress and no live score was
    /// requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<u8>,
    pub events: Vec<RecordedEvent>,
}

/// Build the report projection for one aggregate snapshot
pub fn build_report(session: &Session) -> Report {
    let focus_events =
        session.count_kind(EventKind::FocusLoss) + session.count_kind(EventKind::FaceAbsence);

    Report {
        session_id: session.session_id.clone(),
        candidate_name: session.candidate_name.clone(),
        status: session.status,
        started_at: session.started_at,
        ended_at: session.ended_at,
        duration_seconds: session.duration_seconds(),
        focus_loss_count: session.focus_loss_count,
        face_absence_count: session.face_absence_count,
        focus_events,
        object_events: session.count_kind(EventKind::ObjectDetection),
        multiple_faces_events: session.count_kind(EventKind::MultipleFaces),
        total_events: session.events.len() as u32,
        integrity_score: session.integrity_score,
        events: session.events.clone(),
    }
}

/// Short form of a recently completed session for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RecentSession {
    pub session_id: String,
    pub candidate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<u8>,
}

/// Dashboard statistics over all sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StatsSummary {
    pub total_sessions: u32,
    pub completed_sessions: u32,
    /// Average over completed sessions that carry a score; 0.0 when none do
    pub avg_integrity_score: f64,
    /// Up to five most recently completed sessions
    pub recent_sessions: Vec<RecentSession>,
}

/// Number of recent completions shown on the dashboard
const RECENT_LIMIT: usize = 5;

/// Summarize a set of aggregate snapshots for the dashboard
pub fn summarize(sessions: &[Session]) -> StatsSummary {
    let completed: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .collect();

    let scored: Vec<u8> = completed
        .iter()
        .filter_map(|s| s.integrity_score)
        .collect();
    let avg_integrity_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|&s| f64::from(s)).sum::<f64>() / scored.len() as f64
    };

    let mut recent: Vec<&Session> = completed.clone();
    recent.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
    let recent_sessions = recent
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|s| RecentSession {
            session_id: s.session_id.clone(),
            candidate_name: s.candidate_name.clone(),
            ended_at: s.ended_at,
            integrity_score: s.integrity_score,
        })
        .collect();

    StatsSummary {
        total_sessions: sessions.len() as u32,
        completed_sessions: completed.len() as u32,
        avg_integrity_score,
        recent_sessions,
    }
}
