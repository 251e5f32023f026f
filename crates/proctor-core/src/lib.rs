// Session Event-Aggregation and Integrity-Scoring Engine
//
// This crate receives an unbounded, possibly out-of-order, possibly
// duplicated stream of detection events tagged with a session id,
// maintains authoritative per-session state under concurrent access, and
// derives a bounded integrity score.
//
// Key design decisions:
// - The store is behind the SessionRepository trait; persistence choice
//   (in-process map, Postgres document row) is injected from outside
// - atomic_update is the single serialization point: one logical writer
//   per session, cross-session independence
// - The ingestion-order event log is the source of truth; the per-kind
//   counters and the integrity score are projections recomputed from it
// - Scoring is a pure function: order-independent, monotonic per category,
//   clamped to [0, 100]
// - Accepted events are published to live observers only after the
//   aggregate mutation commits; publication failures never propagate

// Domain entity types
pub mod event;
pub mod session;

pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod publish;
pub mod report;
pub mod score;
pub mod traits;

// In-memory implementation for tests and DB-less deployments
pub mod memory;

// Re-exports for convenience
pub use error::{ProctorError, Result};
pub use event::{EventDetail, EventKind, EventRecord, RecordedEvent, Severity};
pub use ingest::EventIngestor;
pub use lifecycle::{ClientSummary, LifecycleManager};
pub use memory::InMemorySessionRepository;
pub use publish::{BroadcastPublisher, EventNotice, EventPublisher, NoopPublisher};
pub use report::{build_report, summarize, RecentSession, Report, StatsSummary};
pub use score::{integrity_score, score_with_policy, ScorePolicy};
pub use session::{Session, SessionStatus};
pub use traits::{SessionMutator, SessionRepository};
