//! # Session Manager
//!
//! Creates, rotates, revokes, and validates sessions, and enforces the
//! access↔session binding.
//!
//! ## Session State Machine
//!
//! ```text
//!                    refresh (token rotation)
//!                   ┌───────────────────────┐
//!                   ▼                       │
//!              ┌─────────┐──────────────────┘
//!   create ──► │ Active  │
//!              └────┬────┘
//!         revoke    │     expires_at passes
//!       ┌───────────┴───────────┐
//!       ▼                       ▼
//!  ┌─────────┐             ┌─────────┐
//!  │ Revoked │             │ Expired │      (both terminal)
//!  └─────────┘             └─────────┘
//! ```
//!
//! ## Validation Contract
//!
//! An access token is accepted iff its JWT verifies **and** the session
//! named by its `session_token` claim is active, unexpired, and
//! unrevoked. A session token is validated the same way, using itself as
//! the lookup key. Every failure is the bare `Unauthorized` - callers
//! can't distinguish a forged token from a revoked session.
//!
//! ## Rotation Race
//!
//! Two concurrent refreshes of one session both verify the JWT, but the
//! conditional UPDATE matches the old token exactly once. The loser's
//! caller keeps a dead token and sees `Unauthorized` on its next use,
//! which is the accepted outcome.

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use shared::auth::{AccessClaims, TokenCodec};
use shared::config::JwtConfig;
use shared::errors::ApiError;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{NewSession, Session};
use crate::repository::SessionRepository;
use crate::service::event_bus::EventBus;

// =============================================================================
// Response Type
// =============================================================================

/// A session plus the access token minted over it.
///
/// Returned by every session-creating flow.
#[derive(Debug, Clone, Serialize)]
pub struct SessionWithAccess {
    /// The persisted session record
    pub session: Session,
    /// Access token bound to `session.session_token`
    pub access_token: String,
}

// =============================================================================
// Service
// =============================================================================

/// Session lifecycle service.
///
/// ## Thread Safety
///
/// `Clone + Send + Sync`; the repository and codec are shared handles.
#[derive(Clone)]
pub struct SessionService {
    /// Repository for session records
    sessions: SessionRepository,
    /// Token codec for session/access minting and verification
    codec: Arc<TokenCodec>,
    /// Fire-and-forget event publisher
    events: EventBus,
    /// Token lifetimes
    jwt_config: JwtConfig,
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(
        sessions: SessionRepository,
        codec: Arc<TokenCodec>,
        events: EventBus,
        jwt_config: JwtConfig,
    ) -> Self {
        Self { sessions, codec, events, jwt_config }
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Creates a session bound to a device fingerprint and mints its
    /// access token.
    ///
    /// The caller is expected to have already authenticated the
    /// principal; this only fails on infrastructure errors. A
    /// notification event is emitted fire-and-forget.
    pub async fn create(
        &self,
        user_id: Uuid,
        device_fingerprint_id: Uuid,
        app: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let session_token = self.codec.sign_session(user_id)?;
        let expires_at =
            Utc::now() + ChronoDuration::seconds(self.jwt_config.session_token_ttl_seconds as i64);

        let session = self
            .sessions
            .create(NewSession {
                user_id,
                device_fingerprint_id,
                session_token: session_token.clone(),
                app: app.to_string(),
                expires_at,
            })
            .await?;

        let access_token = self.codec.sign_access(user_id, &session_token)?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            app = %app,
            "Session created"
        );

        self.events.emit_session_notification(user_id, app);

        Ok(SessionWithAccess { session, access_token })
    }

    // =========================================================================
    // ROTATION
    // =========================================================================

    /// Rotates a session token and mints a fresh access token.
    ///
    /// The old token becomes unusable atomically with the update.
    pub async fn refresh(&self, session_token: &str) -> Result<SessionWithAccess, ApiError> {
        // Cryptographic half first; the record half rides on the UPDATE
        let claims = self.codec.verify_session(session_token)?;

        let new_token = self.codec.sign_session(claims.sub)?;

        let session = self
            .sessions
            .rotate_token(session_token, &new_token)
            .await?
            // Zero rows: revoked, expired, or lost a concurrent rotation
            .ok_or(ApiError::Unauthorized)?;

        let access_token = self.codec.sign_access(claims.sub, &new_token)?;

        info!(
            user_id = %claims.sub,
            session_id = %session.id,
            "Session token rotated"
        );

        Ok(SessionWithAccess { session, access_token })
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Validates an access token end to end.
    ///
    /// 1. Verify the JWT.
    /// 2. Load the session named by the `session_token` claim.
    /// 3. Reject if missing, revoked, or expired.
    pub async fn validate_access(&self, access_token: &str) -> Result<AccessClaims, ApiError> {
        let claims = self.codec.verify_access(access_token)?;

        let session = self
            .sessions
            .find_active_by_token(&claims.session_token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if session.expires_at <= Utc::now() {
            return Err(ApiError::Unauthorized);
        }

        Ok(claims)
    }

    /// Validates a session token end to end and returns its record.
    ///
    /// Same record checks as [`validate_access`](Self::validate_access),
    /// using the token itself as the lookup key.
    pub async fn validate_session(&self, session_token: &str) -> Result<Session, ApiError> {
        self.codec.verify_session(session_token)?;

        let session = self
            .sessions
            .find_active_by_token(session_token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if session.expires_at <= Utc::now() {
            return Err(ApiError::Unauthorized);
        }

        Ok(session)
    }

    // =========================================================================
    // REVOCATION
    // =========================================================================

    /// Revokes a single session by id. Idempotent.
    pub async fn revoke_by_id(&self, session_id: Uuid) -> Result<(), ApiError> {
        self.sessions.revoke_by_id(session_id).await?;
        Ok(())
    }

    /// Revokes every session bound to a device fingerprint. Idempotent.
    pub async fn revoke_by_device_fingerprint_id(&self, fingerprint_id: Uuid) -> Result<u64, ApiError> {
        let revoked = self.sessions.revoke_by_device_fingerprint_id(fingerprint_id).await?;

        if revoked > 0 {
            info!(
                fingerprint_id = %fingerprint_id,
                sessions = revoked,
                "Sessions revoked for device fingerprint"
            );
        }

        Ok(revoked)
    }

    /// Validates a session token and revokes that session.
    pub async fn logout(&self, session_token: &str) -> Result<(), ApiError> {
        let session = self.validate_session(session_token).await?;

        self.sessions.revoke_by_id(session.id).await?;

        info!(
            user_id = %session.user_id,
            session_id = %session.id,
            "Session logged out"
        );

        Ok(())
    }

    // =========================================================================
    // QUERIES & HYGIENE
    // =========================================================================

    /// Lists a user's active sessions.
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Session>, ApiError> {
        self.sessions.list_active(user_id).await
    }

    /// Marks the user's expired-but-active sessions as revoked.
    ///
    /// Background hygiene; validators never depend on it for security.
    pub async fn cleanup_expired(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let cleaned = self.sessions.cleanup_expired(user_id).await?;

        if cleaned > 0 {
            info!(user_id = %user_id, sessions = cleaned, "Expired sessions cleaned up");
        }

        Ok(cleaned)
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}
