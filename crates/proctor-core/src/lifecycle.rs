// Session lifecycle manager
//
// Governs creation and the terminal transitions. Ending a session freezes
// the aggregate and computes the integrity score from the server-held
// event log; a client-computed tally is accepted only as a cross-check,
// never as an overwrite, since a buggy or malicious client could otherwise
// set an arbitrary score.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ProctorError, Result};
use crate::score;
use crate::session::{Session, SessionStatus};
use crate::traits::SessionRepository;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Final tally the monitoring client computed on its side
///
/// Used purely to detect client/server drift; mismatches are logged and
/// the server-side values win.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ClientSummary {
    pub focus_loss_count: u32,
    pub face_absence_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<u8>,
}

/// Creates sessions and drives their status transitions
pub struct LifecycleManager {
    repo: Arc<dyn SessionRepository>,
}

impl LifecycleManager {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Start a session, created directly in progress
    ///
    /// Fails with `DuplicateSession` if the id is already taken.
    pub async fn start_session(
        &self,
        session_id: impl Into<String>,
        candidate_name: impl Into<String>,
    ) -> Result<Session> {
        let session = Session::new(session_id, candidate_name, Utc::now());
        let created = self.repo.create(session).await?;
        tracing::info!(
            session_id = %created.session_id,
            candidate = %created.candidate_name,
            "session started"
        );
        Ok(created)
    }

    /// Complete a session and compute its integrity score
    ///
    /// Double-end is rejected with `InvalidTransition` rather than silently
    /// ignored, so callers can tell a retry from a logic bug; the rejected
    /// call leaves the aggregate unchanged.
    pub async fn end_session(
        &self,
        session_id: &str,
        client_summary: Option<ClientSummary>,
    ) -> Result<Session> {
        let ended = self
            .repo
            .atomic_update(
                session_id,
                Box::new(move |session| {
                    if session.status.is_terminal() {
                        return Err(ProctorError::InvalidTransition {
                            session_id: session.session_id.clone(),
                            status: session.status,
                        });
                    }
                    session.status = SessionStatus::Completed;
                    session.ended_at = Some(Utc::now());
                    session.recount();
                    // Authoritative: the score comes from the server-held log.
                    session.integrity_score = Some(score::integrity_score(session));

                    if let Some(summary) = client_summary {
                        cross_check(session, &summary);
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            session_id = %ended.session_id,
            duration_seconds = ended.duration_seconds(),
            integrity_score = ended.integrity_score,
            "session completed"
        );
        Ok(ended)
    }

    /// Cancel a session; no score is computed
    pub async fn cancel_session(&self, session_id: &str) -> Result<Session> {
        let cancelled = self
            .repo
            .atomic_update(
                session_id,
                Box::new(|session| {
                    if session.status.is_terminal() {
                        return Err(ProctorError::InvalidTransition {
                            session_id: session.session_id.clone(),
                            status: session.status,
                        });
                    }
                    session.status = SessionStatus::Cancelled;
                    session.ended_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(session_id = %cancelled.session_id, "session cancelled");
        Ok(cancelled)
    }

    /// Read one aggregate
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.repo
            .get(session_id)
            .await?
            .ok_or_else(|| ProctorError::not_found(session_id))
    }

    /// List aggregates, most-recent-first
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.repo.list().await
    }
}

/// Compare the client's tally against the authoritative aggregate
fn cross_check(session: &Session, summary: &ClientSummary) {
    if summary.focus_loss_count != session.focus_loss_count
        || summary.face_absence_count != session.face_absence_count
    {
        tracing::warn!(
            session_id = %session.session_id,
            client_focus_loss = summary.focus_loss_count,
            server_focus_loss = session.focus_loss_count,
            client_face_absence = summary.face_absence_count,
            server_face_absence = session.face_absence_count,
            "client tally disagrees with server event log"
        );
    }
    if let (Some(client_score), Some(server_score)) =
        (summary.integrity_score, session.integrity_score)
    {
        if client_score != server_score {
            tracing::warn!(
                session_id = %session.session_id,
                client_score,
                server_score,
                "client integrity score disagrees with server computation"
            );
        }
    }
}
