// Core traits for pluggable backends
//
// The session state store is the only shared mutable resource in the
// engine. It is consumed as an abstract repository so the persistence
// choice (in-process map, document database) is injected from outside:
// - In-memory implementation for tests and the default deployment mode
// - Postgres implementation in proctor-storage for production

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// Mutation applied to one aggregate under the store's per-session
/// serialization. Returning an error aborts the update with no visible
/// write.
pub type SessionMutator = Box<dyn FnOnce(&mut Session) -> Result<()> + Send>;

/// Abstract session state store
///
/// The atomicity contract: all mutations to one aggregate are serialized
/// relative to each other (single logical writer per session), while
/// mutations to different sessions proceed independently. `atomic_update`
/// is the serialization point - the read-modify-write it performs must be
/// atomic per session, whether by per-session lock or by a transactional
/// row lock.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new aggregate; fails with `DuplicateSession` if the id exists
    async fn create(&self, session: Session) -> Result<Session>;

    /// Read a consistent snapshot of one aggregate
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Atomically read-modify-write one aggregate and return the updated
    /// snapshot; fails with `SessionNotFound` if the id does not exist
    async fn atomic_update(&self, session_id: &str, mutator: SessionMutator) -> Result<Session>;

    /// List all aggregates, most-recent-first by creation time
    async fn list(&self) -> Result<Vec<Session>>;
}
