// Database models (internal, converted to/from the core aggregate)

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use proctor_core::{ProctorError, RecordedEvent, Result, Session, SessionStatus};

/// One session aggregate as a database row
///
/// The event log is a JSONB document; counters and score are denormalized
/// columns so listings and dashboards never parse the log.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: String,
    pub candidate_name: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events: serde_json::Value,
    pub focus_loss_count: i32,
    pub face_absence_count: i32,
    pub integrity_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn into_session(self) -> Result<Session> {
        let events: Vec<RecordedEvent> = serde_json::from_value(self.events)
            .map_err(|e| ProctorError::store(format!("corrupt event log: {e}")))?;

        let status: SessionStatus = self.status.parse().map_err(ProctorError::store)?;

        Ok(Session {
            session_id: self.session_id,
            candidate_name: self.candidate_name,
            status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            events,
            focus_loss_count: self.focus_loss_count.max(0) as u32,
            face_absence_count: self.face_absence_count.max(0) as u32,
            integrity_score: self.integrity_score.map(|s| s.clamp(0, 100) as u8),
            created_at: self.created_at,
        })
    }

    pub fn from_session(session: &Session) -> Result<Self> {
        let events = serde_json::to_value(&session.events)
            .map_err(|e| ProctorError::store(format!("unserializable event log: {e}")))?;

        Ok(Self {
            session_id: session.session_id.clone(),
            candidate_name: session.candidate_name.clone(),
            status: session.status.to_string(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            events,
            focus_loss_count: session.focus_loss_count as i32,
            face_absence_count: session.face_absence_count as i32,
            integrity_score: session.integrity_score.map(i32::from),
            created_at: session.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proctor_core::{EventKind, EventRecord, Severity};

    #[test]
    fn test_row_round_trip_preserves_log_and_counters() {
        let mut session = Session::new("s1", "Alice", Utc::now());
        session.append(
            EventRecord {
                session_id: "s1".to_string(),
                kind: EventKind::ObjectDetection,
                severity: Severity::Danger,
                message: "phone detected".to_string(),
                occurred_at: Utc::now(),
                detail: None,
            },
            Utc::now(),
        );

        let row = SessionRow::from_session(&session).unwrap();
        let back = row.into_session().unwrap();

        assert_eq!(back.session_id, session.session_id);
        assert_eq!(back.status, session.status);
        assert_eq!(back.events.len(), 1);
        assert_eq!(back.events[0].kind, EventKind::ObjectDetection);
        assert_eq!(back.focus_loss_count, session.focus_loss_count);
    }

    #[test]
    fn test_corrupt_event_log_is_a_store_error() {
        let row = SessionRow {
            session_id: "s1".to_string(),
            candidate_name: "Alice".to_string(),
            status: "in-progress".to_string(),
            started_at: Utc::now(),
            ended_at: None,
            events: serde_json::json!({"not": "a list"}),
            focus_loss_count: 0,
            face_absence_count: 0,
            integrity_score: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            row.into_session().unwrap_err(),
            ProctorError::Store(_)
        ));
    }

    #[test]
    fn test_unrecognized_status_is_a_store_error() {
        let row = SessionRow {
            session_id: "s1".to_string(),
            candidate_name: "Alice".to_string(),
            status: "paused".to_string(),
            started_at: Utc::now(),
            ended_at: None,
            events: serde_json::json!([]),
            focus_loss_count: 0,
            face_absence_count: 0,
            integrity_score: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            row.into_session().unwrap_err(),
            ProctorError::Store(_)
        ));
    }
}
