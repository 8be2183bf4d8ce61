//! # Device Fingerprint Manager
//!
//! Owns per-user device-trust state and the email-verification handshake
//! that promotes a device from untrusted to trusted.
//!
//! ## Trust State Machine
//!
//! ```text
//!  first login from new device          wallet path
//!            │                               │
//!            ▼                               ▼
//!      ┌───────────┐   email-OTP or    ┌───────────┐
//!      │ Untrusted │ ────TOTP proof──► │  Trusted  │
//!      └───────────┘                   └─────┬─────┘
//!            ▲                               │ revoke
//!            └───────────────────────────────┘
//!                  (fans out: every bound session is revoked)
//! ```
//!
//! ## Email Challenge
//!
//! `send_email_challenge` parks `{user_id, fingerprint_hashed}` under a
//! 6-character code for five minutes and emits an email event - the code
//! is the only thing that ever reaches the user. `verify_email_challenge`
//! redeems the code (read-then-delete, at-most-one success), locates the
//! untrusted record, and flips it. A bad or expired code is `InvalidCode`
//! with no state change.

use shared::errors::ApiError;
use shared::redis_client::RedisClient;
use tracing::info;
use uuid::Uuid;

use crate::domain::ephemeral::{
    self, FingerprintChallenge, VERIFICATION_CODE_TTL,
};
use crate::domain::events::EmailKind;
use crate::domain::{
    DeviceFingerprint, FingerprintWithSessions, NewDeviceFingerprint,
};
use crate::repository::{FingerprintRepository, SessionRepository};
use crate::service::event_bus::EventBus;

// =============================================================================
// Check Outcome
// =============================================================================

/// Result of a trust check for `(user_id, fingerprint_hash)`.
#[derive(Debug, Clone)]
pub enum FingerprintCheck {
    /// A trusted record exists
    Trusted(DeviceFingerprint),
    /// No trusted record - either unknown or still untrusted
    NotFound,
}

// =============================================================================
// Service
// =============================================================================

/// Device-trust service.
///
/// Holds the session *repository* (not the session service) for the
/// revocation fan-out and the device-list join - the narrow interface
/// that keeps the fingerprint↔session dependency acyclic.
#[derive(Clone)]
pub struct FingerprintService {
    /// Repository for fingerprint records
    fingerprints: FingerprintRepository,
    /// Session records, for fan-out revocation and the list join
    sessions: SessionRepository,
    /// Ephemeral store for challenge codes
    redis: RedisClient,
    /// Fire-and-forget event publisher
    events: EventBus,
}

impl FingerprintService {
    /// Creates a new fingerprint service.
    pub fn new(
        fingerprints: FingerprintRepository,
        sessions: SessionRepository,
        redis: RedisClient,
        events: EventBus,
    ) -> Self {
        Self { fingerprints, sessions, redis, events }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Checks whether the device is trusted for this user.
    pub async fn check(&self, user_id: Uuid, fingerprint_hash: &str) -> Result<FingerprintCheck, ApiError> {
        let record = self
            .fingerprints
            .find_by_user_and_hash(user_id, fingerprint_hash)
            .await?;

        Ok(match record {
            Some(fp) if fp.is_trusted => FingerprintCheck::Trusted(fp),
            _ => FingerprintCheck::NotFound,
        })
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Records an untrusted sighting of a device.
    ///
    /// Idempotent on `(user_id, fingerprint_hash)`: repeated logins from
    /// the same new device return the same record, and an already-trusted
    /// record is never downgraded.
    pub async fn create_untrusted(
        &self,
        user_id: Uuid,
        fingerprint_hash: &str,
        browser: &str,
        device: &str,
    ) -> Result<DeviceFingerprint, ApiError> {
        self.fingerprints
            .upsert(NewDeviceFingerprint {
                user_id,
                fingerprint_hash: fingerprint_hash.to_string(),
                browser: browser.to_string(),
                device: device.to_string(),
                is_trusted: false,
            })
            .await
    }

    /// Creates (or promotes) a born-trusted record.
    ///
    /// Used by the service-authenticated wallet-session path, where the
    /// sibling already vouches for the device.
    pub async fn create_trusted(
        &self,
        user_id: Uuid,
        fingerprint_hash: &str,
        browser: &str,
        device: &str,
    ) -> Result<DeviceFingerprint, ApiError> {
        let fingerprint = self
            .fingerprints
            .upsert(NewDeviceFingerprint {
                user_id,
                fingerprint_hash: fingerprint_hash.to_string(),
                browser: browser.to_string(),
                device: device.to_string(),
                is_trusted: true,
            })
            .await?;

        info!(
            user_id = %user_id,
            fingerprint_id = %fingerprint.id,
            "Trusted device fingerprint created"
        );

        Ok(fingerprint)
    }

    /// Flips an existing record to trusted (TOTP-verified trust path).
    pub async fn trust(&self, fingerprint_id: Uuid) -> Result<DeviceFingerprint, ApiError> {
        self.fingerprints
            .set_trusted(fingerprint_id)
            .await?
            .ok_or(ApiError::NotFound { resource: format!("fingerprint:{}", fingerprint_id) })
    }

    // =========================================================================
    // EMAIL CHALLENGE
    // =========================================================================

    /// Starts the email-verification handshake for an untrusted device.
    ///
    /// Generates a 6-character code, parks the challenge for five
    /// minutes, and emits the email event. The code is the only thing
    /// sent to the user.
    pub async fn send_email_challenge(
        &self,
        user_id: Uuid,
        email: &str,
        fingerprint_hash: &str,
    ) -> Result<(), ApiError> {
        let code = ephemeral::generate_code();

        self.redis
            .set(
                &ephemeral::fingerprint_verification_key(&code),
                &FingerprintChallenge {
                    user_id,
                    fingerprint_hashed: fingerprint_hash.to_string(),
                },
                Some(VERIFICATION_CODE_TTL),
            )
            .await?;

        self.events
            .emit_code_email(EmailKind::FingerprintVerify, email, &code);

        info!(user_id = %user_id, "Device verification email requested");

        Ok(())
    }

    /// Redeems an email challenge code and trusts the device.
    ///
    /// At most one success per code: the ephemeral record is deleted on
    /// read. An unknown or expired code is `InvalidCode` and mutates
    /// nothing.
    pub async fn verify_email_challenge(&self, code: &str) -> Result<DeviceFingerprint, ApiError> {
        let challenge: FingerprintChallenge = self
            .redis
            .take(&ephemeral::fingerprint_verification_key(code))
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let record = self
            .fingerprints
            .find_by_user_and_hash(challenge.user_id, &challenge.fingerprint_hashed)
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let trusted = self
            .fingerprints
            .set_trusted(record.id)
            .await?
            .ok_or(ApiError::InvalidCode)?;

        info!(
            user_id = %trusted.user_id,
            fingerprint_id = %trusted.id,
            "Device fingerprint trusted via email challenge"
        );

        Ok(trusted)
    }

    // =========================================================================
    // LISTING & REVOCATION
    // =========================================================================

    /// Lists the user's trusted devices, each annotated with its
    /// currently active sessions.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<FingerprintWithSessions>, ApiError> {
        let fingerprints = self.fingerprints.list_trusted(user_id).await?;

        let mut result = Vec::with_capacity(fingerprints.len());
        for fingerprint in fingerprints {
            let sessions = self.sessions.list_active_by_fingerprint(fingerprint.id).await?;
            result.push(FingerprintWithSessions { fingerprint, sessions });
        }

        Ok(result)
    }

    /// Revokes trust for a device and fans out to its sessions.
    ///
    /// Revoking an already-untrusted record is a no-op success; the
    /// fan-out runs either way (it is itself idempotent). An unknown id
    /// is `NotFound`.
    pub async fn revoke(&self, fingerprint_id: Uuid, user_id: Uuid) -> Result<u64, ApiError> {
        self.fingerprints
            .set_untrusted(fingerprint_id, user_id)
            .await?
            .ok_or(ApiError::NotFound { resource: format!("fingerprint:{}", fingerprint_id) })?;

        let revoked = self.sessions.revoke_by_device_fingerprint_id(fingerprint_id).await?;

        info!(
            user_id = %user_id,
            fingerprint_id = %fingerprint_id,
            sessions_revoked = revoked,
            "Device fingerprint revoked"
        );

        Ok(revoked)
    }
}

impl std::fmt::Debug for FingerprintService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintService").finish_non_exhaustive()
    }
}
