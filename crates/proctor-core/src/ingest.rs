// Event ingestor
//
// Applies the real-time detection stream to session aggregates. The stream
// is at-least-once and may be out of order; ingestion order is what the
// engine makes authoritative. There is no producer-supplied idempotency
// key, so a redelivered identical event counts as a second occurrence -
// callers wanting stronger guarantees must add a key and de-duplicate
// within a bounded recent-event window per session.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{ProctorError, Result};
use crate::event::{EventRecord, RecordedEvent};
use crate::publish::EventPublisher;
use crate::traits::SessionRepository;

/// Validates and applies detection events to session aggregates
pub struct EventIngestor {
    repo: Arc<dyn SessionRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl EventIngestor {
    pub fn new(repo: Arc<dyn SessionRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { repo, publisher }
    }

    /// Ingest one detection event
    ///
    /// Fails with `InvalidEvent` on structural problems, `SessionNotFound`
    /// for an unresolved session id (no aggregate is created as a side
    /// effect), and `SessionClosed` for a finalized session - late events
    /// from network jitter must not reopen a closed log. All three are
    /// non-fatal to the ingesting connection.
    ///
    /// On success the event is appended and the cached counters recomputed
    /// within one atomic update, then the accepted event is published to
    /// live observers as a decoupled second step.
    pub async fn ingest(&self, record: EventRecord) -> Result<RecordedEvent> {
        validate(&record)?;

        let session_id = record.session_id.clone();
        let received_at = Utc::now();

        let updated = self
            .repo
            .atomic_update(
                &session_id,
                Box::new(move |session| {
                    if session.status.is_terminal() {
                        return Err(ProctorError::SessionClosed(session.session_id.clone()));
                    }
                    session.append(record, received_at);
                    Ok(())
                }),
            )
            .await?;

        let recorded = updated
            .events
            .last()
            .cloned()
            .ok_or_else(|| ProctorError::store("append left an empty event log"))?;

        tracing::debug!(
            session_id = %session_id,
            sequence = recorded.sequence,
            kind = %recorded.kind,
            severity = %recorded.severity,
            "event ingested"
        );

        // Notification is best-effort and never affects the stored aggregate.
        self.publisher.publish(&session_id, &recorded);

        Ok(recorded)
    }
}

/// Structural validation of an incoming record
///
/// `kind` and `severity` are closed enums, so unknown values are already
/// rejected at the deserialization boundary and can never reach here.
fn validate(record: &EventRecord) -> Result<()> {
    if record.session_id.trim().is_empty() {
        return Err(ProctorError::invalid_event("session_id must not be empty"));
    }
    if record.message.trim().is_empty() {
        return Err(ProctorError::invalid_event("message must not be empty"));
    }
    Ok(())
}
