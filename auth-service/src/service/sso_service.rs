//! # SSO Broker
//!
//! One-shot handoff tokens that let an already-authenticated user open a
//! fresh session in a sibling application without re-entering
//! credentials.
//!
//! ## Protocol
//!
//! ```text
//! app A (authenticated)                       app B
//!       │                                       │
//!       │ POST /auth/sso/create                 │
//!       │  {app, fingerprint_hashed}            │
//!       │──────────► sso:{token} (60 s) ◄───────│ POST /auth/sso/validate
//!       │            single use                 │  {sso_token}
//!       │                                       ▼
//!       │                              fresh session bound to the
//!       │                              captured fingerprint
//! ```
//!
//! Creation requires a **trusted** fingerprint - an untrusted device
//! can't mint handoffs. Validation reads-and-deletes the record, so a
//! token redeems at most once; a failed validation leaves no side effect
//! beyond the delete.

use shared::errors::ApiError;
use shared::redis_client::RedisClient;
use tracing::info;
use uuid::Uuid;

use crate::domain::ephemeral::{self, SsoTicket, SSO_TOKEN_TTL};
use crate::repository::FingerprintRepository;
use crate::service::session_service::{SessionService, SessionWithAccess};

// =============================================================================
// Service
// =============================================================================

/// Cross-app handoff broker.
#[derive(Clone)]
pub struct SsoService {
    /// Ephemeral store for handoff tokens
    redis: RedisClient,
    /// Trusted-device check at creation
    fingerprints: FingerprintRepository,
    /// Session creation at redemption
    sessions: SessionService,
}

impl SsoService {
    /// Creates a new SSO broker.
    pub fn new(
        redis: RedisClient,
        fingerprints: FingerprintRepository,
        sessions: SessionService,
    ) -> Self {
        Self { redis, fingerprints, sessions }
    }

    /// Mints a one-shot handoff token for a trusted device.
    ///
    /// ## Errors
    ///
    /// `DeviceNotTrusted` when the fingerprint is unknown or untrusted
    /// for this user.
    pub async fn create(
        &self,
        user_id: Uuid,
        app: &str,
        fingerprint_hashed: &str,
    ) -> Result<String, ApiError> {
        let fingerprint = self
            .fingerprints
            .find_by_user_and_hash(user_id, fingerprint_hashed)
            .await?
            .filter(|fp| fp.is_trusted)
            .ok_or(ApiError::DeviceNotTrusted)?;

        let token = ephemeral::generate_opaque_token();

        self.redis
            .set(
                &ephemeral::sso_key(&token),
                &SsoTicket {
                    user_id,
                    app: app.to_string(),
                    device_fingerprint_id: fingerprint.id,
                },
                Some(SSO_TOKEN_TTL),
            )
            .await?;

        info!(user_id = %user_id, app = %app, "SSO handoff token created");

        Ok(token)
    }

    /// Redeems a handoff token into a fresh session.
    ///
    /// Single use: the ephemeral record is deleted on read, so a second
    /// redemption of the same token is `InvalidCode`.
    pub async fn validate(&self, sso_token: &str) -> Result<SessionWithAccess, ApiError> {
        let ticket: SsoTicket = self
            .redis
            .take(&ephemeral::sso_key(sso_token))
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let session = self
            .sessions
            .create(ticket.user_id, ticket.device_fingerprint_id, &ticket.app)
            .await?;

        info!(user_id = %ticket.user_id, app = %ticket.app, "SSO handoff redeemed");

        Ok(session)
    }
}

impl std::fmt::Debug for SsoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoService").finish_non_exhaustive()
    }
}
