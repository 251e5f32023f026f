// Postgres-backed SessionRepository implementation
//
// The per-session atomicity contract is met with a row-level lock:
// atomic_update runs SELECT ... FOR UPDATE inside a transaction, applies
// the mutator to the deserialized aggregate, and writes it back. Two
// updates to the same session serialize on the row lock; different
// sessions never contend.

use async_trait::async_trait;
use sqlx::PgPool;

use proctor_core::{ProctorError, Result, Session, SessionMutator, SessionRepository};

use crate::models::SessionRow;

const SESSION_COLUMNS: &str = "session_id, candidate_name, status, started_at, ended_at, \
     events, focus_loss_count, face_absence_count, integrity_score, created_at";

/// Postgres session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a repository from a connection URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await.map_err(store_err)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bootstrap the sessions table
    ///
    /// A single document-style table; run once at startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                candidate_name TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                ended_at TIMESTAMPTZ,
                events JSONB NOT NULL DEFAULT '[]'::jsonb,
                focus_loss_count INT NOT NULL DEFAULT 0,
                face_absence_count INT NOT NULL DEFAULT 0,
                integrity_score INT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        tracing::debug!("sessions schema ensured");
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: Session) -> Result<Session> {
        let row = SessionRow::from_session(&session)?;

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (session_id, candidate_name, status, started_at, ended_at,
                                  events, focus_loss_count, face_absence_count, integrity_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&row.session_id)
        .bind(&row.candidate_name)
        .bind(&row.status)
        .bind(row.started_at)
        .bind(row.ended_at)
        .bind(&row.events)
        .bind(row.focus_loss_count)
        .bind(row.face_absence_count)
        .bind(row.integrity_score)
        .bind(row.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(session),
            Err(e) if is_unique_violation(&e) => {
                Err(ProctorError::DuplicateSession(session.session_id))
            }
            Err(e) => Err(store_err(e)),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn atomic_update(&self, session_id: &str, mutator: SessionMutator) -> Result<Session> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1 FOR UPDATE"
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?
        .ok_or_else(|| ProctorError::not_found(session_id))?;

        let mut session = row.into_session()?;
        // A mutator error drops the transaction: rollback, no visible write.
        mutator(&mut session)?;

        let updated = SessionRow::from_session(&session)?;
        sqlx::query(
            r#"
            UPDATE sessions
            SET candidate_name = $2,
                status = $3,
                ended_at = $4,
                events = $5,
                focus_loss_count = $6,
                face_absence_count = $7,
                integrity_score = $8
            WHERE session_id = $1
            "#,
        )
        .bind(&updated.session_id)
        .bind(&updated.candidate_name)
        .bind(&updated.status)
        .bind(updated.ended_at)
        .bind(&updated.events)
        .bind(updated.focus_loss_count)
        .bind(updated.face_absence_count)
        .bind(updated.integrity_score)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(session)
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }
}

fn store_err(e: sqlx::Error) -> ProctorError {
    ProctorError::store(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
