// Session aggregate and status state machine
//
// The aggregate owns the append-only event log. The cached counters are
// projections of the log and are recomputed inside the same update that
// appends, so they can never drift from the events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, EventRecord, RecordedEvent};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Session status
///
/// State machine: `scheduled -> in-progress -> {completed, cancelled}`.
/// Sessions are always created directly in `in-progress`; `scheduled` is
/// kept in the enumeration for future scheduling flows but is never
/// produced here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Terminal states reject further transitions and event appends
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::InProgress => write!(f, "in-progress"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    /// Strict: an unrecognized status is an error, never coerced. A stored
    /// terminal session must not silently reopen on a bad row.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "in-progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(format!("unrecognized session status: {other}")),
        }
    }
}

/// Session aggregate - authoritative per-session state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Session {
    /// Unique, assigned at creation, immutable
    pub session_id: String,
    pub candidate_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Append-only, ordered by ingestion sequence
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
    /// Cached projection of `events`, never independently mutated
    pub focus_loss_count: u32,
    /// Cached projection of `events`, never independently mutated
    pub face_absence_count: u32,
    /// Absent until first computed (at completion, or live on demand)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new in-progress aggregate with an empty log
    pub fn new(
        session_id: impl Into<String>,
        candidate_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            candidate_name: candidate_name.into(),
            status: SessionStatus::InProgress,
            started_at: now,
            ended_at: None,
            events: Vec::new(),
            focus_loss_count: 0,
            face_absence_count: 0,
            integrity_score: None,
            created_at: now,
        }
    }

    /// Duration in whole seconds, available only once both bounds exist
    ///
    /// Computed lazily so the half-ended state is unrepresentable rather
    /// than a runtime failure.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_seconds().max(0))
    }

    /// Append an event at the next ingestion sequence and recompute the
    /// cached counters from the log in the same step
    ///
    /// Callers must hold the per-session write serialization provided by
    /// the repository's atomic update.
    pub fn append(&mut self, record: EventRecord, received_at: DateTime<Utc>) {
        let sequence = self.events.len() as u32 + 1;
        self.events
            .push(RecordedEvent::from_record(record, sequence, received_at));
        self.recount();
    }

    /// Recompute the cached counters from the event log
    pub fn recount(&mut self) {
        self.focus_loss_count = self.count_kind(EventKind::FocusLoss);
        self.face_absence_count = self.count_kind(EventKind::FaceAbsence);
    }

    /// Count events of one kind in the log
    pub fn count_kind(&self, kind: EventKind) -> u32 {
        self.events.iter().filter(|e| e.kind == kind).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Severity;
    use chrono::TimeZone;

    fn record(kind: EventKind, severity: Severity) -> EventRecord {
        EventRecord {
            session_id: "s1".to_string(),
            kind,
            severity,
            message: format!("{kind} detected"),
            occurred_at: Utc::now(),
            detail: None,
        }
    }

    #[test]
    fn test_append_assigns_ingestion_sequence() {
        let mut session = Session::new("s1", "Alice", Utc::now());
        session.append(record(EventKind::FocusLoss, Severity::Warning), Utc::now());
        session.append(record(EventKind::ObjectDetection, Severity::Danger), Utc::now());

        let sequences: Vec<u32> = session.events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_counters_match_log_after_any_appends() {
        let mut session = Session::new("s1", "Alice", Utc::now());
        for _ in 0..3 {
            session.append(record(EventKind::FocusLoss, Severity::Danger), Utc::now());
        }
        session.append(record(EventKind::FaceAbsence, Severity::Warning), Utc::now());
        session.append(record(EventKind::MultipleFaces, Severity::Danger), Utc::now());

        assert_eq!(session.focus_loss_count, session.count_kind(EventKind::FocusLoss));
        assert_eq!(session.focus_loss_count, 3);
        assert_eq!(
            session.face_absence_count,
            session.count_kind(EventKind::FaceAbsence)
        );
        assert_eq!(session.face_absence_count, 1);
    }

    #[test]
    fn test_duration_absent_until_ended() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let mut session = Session::new("s1", "Alice", started);
        assert_eq!(session.duration_seconds(), None);

        session.ended_at = Some(started + chrono::Duration::seconds(1800));
        assert_eq!(session.duration_seconds(), Some(1800));
    }

    #[test]
    fn test_duration_never_negative() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let mut session = Session::new("s1", "Alice", started);
        session.ended_at = Some(started - chrono::Duration::seconds(5));
        assert_eq!(session.duration_seconds(), Some(0));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
        assert!(!SessionStatus::Scheduled.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SessionStatus::Scheduled,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(
                status.to_string().parse::<SessionStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_unrecognized_status_rejected() {
        assert!("paused".parse::<SessionStatus>().is_err());
        assert!("".parse::<SessionStatus>().is_err());
    }
}
