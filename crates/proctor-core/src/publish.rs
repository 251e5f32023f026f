// Event publication for real-time observers
//
// Ingestion first applies the event to the aggregate (the durable,
// authoritative action), then publishes the accepted event here as a
// separate step. Publication failures must never roll back or affect the
// aggregate mutation, so the trait is infallible from the caller's side.

use tokio::sync::broadcast;

use crate::event::RecordedEvent;

/// An accepted event fanned out to live observers
#[derive(Debug, Clone)]
pub struct EventNotice {
    pub session_id: String,
    pub event: RecordedEvent,
}

/// Sink for accepted events
///
/// Implementations can:
/// - Fan events out over a broadcast channel for SSE streaming
/// - Do nothing (no-op implementation for tests and batch tooling)
pub trait EventPublisher: Send + Sync {
    /// Publish one accepted event; never fails the caller
    fn publish(&self, session_id: &str, event: &RecordedEvent);
}

/// Publisher that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _session_id: &str, _event: &RecordedEvent) {}
}

/// Broadcast-channel publisher
///
/// Wraps a `tokio::sync::broadcast` sender. A send error only means there
/// are currently no subscribers, which is normal; lagging subscribers drop
/// their own backlog and never block ingestion.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<EventNotice>,
}

impl BroadcastPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the live event feed
    pub fn subscribe(&self) -> broadcast::Receiver<EventNotice> {
        self.sender.subscribe()
    }

    /// The underlying sender, for sharing across tasks
    pub fn sender(&self) -> broadcast::Sender<EventNotice> {
        self.sender.clone()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, session_id: &str, event: &RecordedEvent) {
        let notice = EventNotice {
            session_id: session_id.to_string(),
            event: event.clone(),
        };
        if self.sender.send(notice).is_err() {
            tracing::debug!(session_id, "no live subscribers for accepted event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Severity};
    use chrono::Utc;

    fn event() -> RecordedEvent {
        RecordedEvent {
            sequence: 1,
            kind: EventKind::MultipleFaces,
            severity: Severity::Danger,
            message: "2 faces detected".to_string(),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
            detail: None,
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let publisher = BroadcastPublisher::new(16);
        let mut rx = publisher.subscribe();

        publisher.publish("s1", &event());

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.session_id, "s1");
        assert_eq!(notice.event.kind, EventKind::MultipleFaces);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(16);
        // Must not panic or error with zero receivers
        publisher.publish("s1", &event());
    }
}
