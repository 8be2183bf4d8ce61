//! # Session Repository
//!
//! Data access for the `sessions` collection.
//!
//! ## Query Patterns
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Query Patterns                                  │
//! ├───────────────────┬─────────────────────────────────────────────────────┤
//! │ Active filter     │ WHERE is_active = TRUE AND revoked_at IS NULL       │
//! │ Monotonic revoke  │ SET is_active = FALSE, revoked_at = NOW()           │
//! │ Rotation          │ conditional UPDATE ... RETURNING (loser gets 0 rows)│
//! │ Parameterized     │ Always $1, $2 (never string interpolation)          │
//! └───────────────────┴─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Correctness leans entirely on per-statement atomicity and monotonic
//! transitions; there is no application-side locking:
//!
//! - Two concurrent revokes both succeed (idempotent).
//! - Two concurrent refreshes of one session race on the conditional
//!   UPDATE; exactly one wins, the other's caller observes an invalid
//!   token on next use.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewSession, Session};

/// Repository for session records.
///
/// `Send + Sync` because `PgPool` is `Arc`-based; clone freely.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl SessionRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new session.
    ///
    /// The unique index on `session_token` backs the "unique across all
    /// sessions, past and present" invariant; a collision (which would
    /// take a duplicated JWT `jti`) surfaces as a database error.
    pub async fn create(&self, new_session: NewSession) -> Result<Session, ApiError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                user_id, device_fingerprint_id, session_token, app, expires_at
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_session.user_id)
        .bind(new_session.device_fingerprint_id)
        .bind(&new_session.session_token)
        .bind(&new_session.app)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(session)
    }

    /// Finds a session by token, restricted to non-revoked records.
    ///
    /// Expiry is NOT filtered here - callers distinguish "expired" from
    /// "missing" when they need to, and the validators re-check it.
    pub async fn find_active_by_token(&self, session_token: &str) -> Result<Option<Session>, ApiError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE session_token = $1 AND is_active = TRUE AND revoked_at IS NULL
            "#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(session)
    }

    /// Rotates a session token in place.
    ///
    /// The WHERE clause is the whole race story: only a currently valid
    /// session rotates, and of two concurrent rotations only one matches
    /// the old token. The loser gets `None`.
    pub async fn rotate_token(
        &self,
        old_token: &str,
        new_token: &str,
    ) -> Result<Option<Session>, ApiError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET session_token = $2, last_used_at = NOW()
            WHERE session_token = $1
              AND is_active = TRUE
              AND revoked_at IS NULL
              AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(old_token)
        .bind(new_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(session)
    }

    /// Revokes a single session. Idempotent: revoking an already-revoked
    /// session matches zero rows and still succeeds.
    pub async fn revoke_by_id(&self, session_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, revoked_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    /// Revokes every session bound to a device fingerprint.
    ///
    /// This is the fan-out half of device revocation.
    pub async fn revoke_by_device_fingerprint_id(&self, fingerprint_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, revoked_at = NOW()
            WHERE device_fingerprint_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(fingerprint_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    /// Lists a user's active sessions (`is_active = TRUE ∧ revoked_at IS NULL`).
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Session>, ApiError> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND is_active = TRUE AND revoked_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(sessions)
    }

    /// Lists active sessions bound to one fingerprint (device-list join).
    pub async fn list_active_by_fingerprint(
        &self,
        fingerprint_id: Uuid,
    ) -> Result<Vec<Session>, ApiError> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE device_fingerprint_id = $1 AND is_active = TRUE AND revoked_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(fingerprint_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(sessions)
    }

    /// Marks a user's expired-but-still-active sessions as revoked.
    ///
    /// Background hygiene; validators never depend on its timing since
    /// they check `expires_at` themselves.
    pub async fn cleanup_expired(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, revoked_at = NOW()
            WHERE user_id = $1 AND is_active = TRUE AND expires_at < NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}
