// In-memory session repository
//
// Keeps all aggregates in process memory, making it the backend for:
// - Unit and integration tests
// - Deployments without a DATABASE_URL (single-node, ephemeral retention)
//
// The store instance is created at process start and injected into the
// lifecycle manager and ingestor; it is never a process-wide global.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::{ProctorError, Result};
use crate::session::Session;
use crate::traits::{SessionMutator, SessionRepository};

/// In-memory session repository
///
/// Aggregates live behind one `Mutex` each, keyed by session id in a
/// `RwLock`ed map. The map lock guards membership only and is never held
/// across an aggregate mutation, so updates to one session serialize on
/// that session's mutex while different sessions proceed independently.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl InMemorySessionRepository {
    /// Create a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Clear all sessions
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    async fn slot(&self, session_id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProctorError::not_found(session_id))
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: Session) -> Result<Session> {
        let mut map = self.sessions.write().await;
        if map.contains_key(&session.session_id) {
            return Err(ProctorError::DuplicateSession(session.session_id));
        }
        map.insert(
            session.session_id.clone(),
            Arc::new(Mutex::new(session.clone())),
        );
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let slot = {
            let map = self.sessions.read().await;
            map.get(session_id).cloned()
        };
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn atomic_update(&self, session_id: &str, mutator: SessionMutator) -> Result<Session> {
        let slot = self.slot(session_id).await?;
        let mut session = slot.lock().await;

        // Mutate a scratch copy; a mutator error leaves the stored
        // aggregate untouched.
        let mut updated = session.clone();
        mutator(&mut updated)?;
        *session = updated.clone();
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let slots: Vec<Arc<Mutex<Session>>> = {
            let map = self.sessions.read().await;
            map.values().cloned().collect()
        };
        let mut sessions = Vec::with_capacity(slots.len());
        for slot in slots {
            sessions.push(slot.lock().await.clone());
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}
