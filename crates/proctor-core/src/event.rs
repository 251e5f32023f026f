// Detection event domain types
//
// One EventRecord is one detection occurrence reported by the monitoring
// client. Records are appended to a session aggregate in ingestion order;
// the producer timestamp is advisory metadata only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Kind of integrity violation detected by the monitoring client
///
/// Closed enumeration: unknown wire values fail deserialization and are
/// rejected, never coerced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    FocusLoss,
    FaceAbsence,
    MultipleFaces,
    ObjectDetection,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::FocusLoss => write!(f, "focus-loss"),
            EventKind::FaceAbsence => write!(f, "face-absence"),
            EventKind::MultipleFaces => write!(f, "multiple-faces"),
            EventKind::ObjectDetection => write!(f, "object-detection"),
        }
    }
}

/// Severity assigned by the producer
///
/// Duration-based classification (how long focus was lost, how long the
/// face was absent) happens upstream; the engine only trusts the label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Danger,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Danger => write!(f, "danger"),
        }
    }
}

/// Kind-specific payload, opaque to aggregation logic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EventDetail {
    /// Detected object label (object-detection events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Elapsed duration in seconds (focus-loss / face-absence events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// One detection occurrence as submitted by the monitoring client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EventRecord {
    /// Target session (opaque, client-assigned identifier)
    pub session_id: String,
    pub kind: EventKind,
    pub severity: Severity,
    /// Human-readable description; not semantically interpreted
    pub message: String,
    /// Producer-side timestamp. May be earlier than ingestion time and may
    /// arrive out of order; advisory only.
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EventDetail>,
}

/// An event as recorded on a session aggregate
///
/// `sequence` is the 1-based ingestion order within the session and is the
/// authoritative order for counters and report rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RecordedEvent {
    pub sequence: u32,
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EventDetail>,
}

impl RecordedEvent {
    /// Record an incoming event at the given ingestion sequence
    pub fn from_record(record: EventRecord, sequence: u32, received_at: DateTime<Utc>) -> Self {
        Self {
            sequence,
            kind: record.kind,
            severity: record.severity,
            message: record.message,
            occurred_at: record.occurred_at,
            received_at,
            detail: record.detail,
        }
    }
}
