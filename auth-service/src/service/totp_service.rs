//! # TOTP Manager
//!
//! Second-factor lifecycle (setup → enable → verify → disable) plus the
//! two short-lived gates that sit between "password/device accepted" and
//! "session created".
//!
//! ## Parameters
//!
//! RFC 6238: SHA-1, 6 digits, 30-second period, window ±1 step. The
//! shared secret is 32 bytes, base32-encoded (`A-Z2-7`), stored only
//! under authenticated encryption. The plaintext leaves the service
//! exactly once: in the setup response, for QR provisioning.
//!
//! ## The 2FA Gates
//!
//! ```text
//!  password + trusted device OK          password OK, device untrusted
//!            │                                     │
//!            ▼                                     ▼
//!  otp_login_session:{token}         otp_verify_fingerprint_session:{token}
//!       (5 min, single use)                 (5 min, single use)
//!            │                                     │
//!   POST /auth/2fa/login                POST /auth/2fa/login/fingerprint
//!            │                                     │
//!            ▼                                     ▼
//!      session created                device trusted + session created
//! ```
//!
//! When TOTP is enabled, **no session exists until the gate is redeemed
//! with a valid code** - the gate tokens are the only carriers of
//! "earlier factors already verified" state across requests. When TOTP is
//! disabled, `check_and_init_login` bypasses straight to session
//! creation.

use serde::Serialize;
use shared::auth::SecretCipher;
use shared::errors::ApiError;
use shared::redis_client::RedisClient;
use std::sync::Arc;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::info;
use uuid::Uuid;

use crate::domain::ephemeral::{
    self, OtpFingerprintGate, OtpLoginGate, OTP_GATE_TTL,
};
use crate::repository::{FingerprintRepository, OtpRepository};
use crate::service::session_service::{SessionService, SessionWithAccess};

// =============================================================================
// Outcomes
// =============================================================================

/// Setup response: the only moment the plaintext secret leaves the
/// service.
#[derive(Debug, Clone, Serialize)]
pub struct TotpProvisioning {
    /// base32 shared secret for manual entry
    pub secret: String,
    /// otpauth:// URL for QR provisioning
    pub otpauth_url: String,
}

/// Outcome of the login gate check.
#[derive(Debug)]
pub enum LoginGate {
    /// TOTP disabled - session created immediately
    Session(SessionWithAccess),
    /// TOTP enabled - a challenge token was issued instead
    OtpRequired {
        /// Redeem within five minutes at `/auth/2fa/login`
        login_session_token: String,
    },
}

// =============================================================================
// Service
// =============================================================================

/// TOTP lifecycle and 2FA gate service.
#[derive(Clone)]
pub struct TotpService {
    /// Per-user TOTP configuration
    otps: OtpRepository,
    /// Fingerprint records, for the trust-gate redemption
    fingerprints: FingerprintRepository,
    /// Session creation once the factor clears
    sessions: SessionService,
    /// Ephemeral store for gate tokens
    redis: RedisClient,
    /// Encryption for stored secrets
    cipher: Arc<SecretCipher>,
    /// Issuer label for otpauth URLs
    issuer: String,
    /// App label for sessions created by the trust gate
    default_app: String,
}

impl TotpService {
    /// Creates a new TOTP service.
    pub fn new(
        otps: OtpRepository,
        fingerprints: FingerprintRepository,
        sessions: SessionService,
        redis: RedisClient,
        cipher: Arc<SecretCipher>,
        issuer: String,
        default_app: String,
    ) -> Self {
        Self { otps, fingerprints, sessions, redis, cipher, issuer, default_app }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Provisions a TOTP secret for a user.
    ///
    /// Rejects when a configuration already exists - re-provisioning
    /// would silently orphan the authenticator the user already scanned.
    /// The returned plaintext secret is never reproducible afterwards.
    pub async fn setup(&self, user_id: Uuid, account_name: &str) -> Result<TotpProvisioning, ApiError> {
        if self.otps.find_by_user(user_id).await?.is_some() {
            return Err(ApiError::Forbidden { message: "OTP already set up".to_string() });
        }

        let secret = Self::generate_secret();
        let totp = Self::build_totp(&secret, &self.issuer, account_name)?;
        let otpauth_url = totp.get_url();

        let encrypted = self.cipher.encrypt(&secret)?;
        self.otps.create(user_id, &encrypted).await?;

        info!(user_id = %user_id, "TOTP secret provisioned");

        Ok(TotpProvisioning { secret, otpauth_url })
    }

    /// Enables the second factor after proving possession of the
    /// authenticator with a currently valid code.
    pub async fn enable(&self, user_id: Uuid, otp: &str) -> Result<(), ApiError> {
        let config = self
            .otps
            .find_by_user(user_id)
            .await?
            .ok_or(ApiError::NotFound { resource: format!("otp-config:{}", user_id) })?;

        if config.otp_enable {
            return Err(ApiError::Forbidden { message: "OTP already enabled".to_string() });
        }

        self.verify_against_secret(&config.otp_secret_encrypted, user_id, otp)?;

        self.otps.set_enabled(user_id, true).await?;

        info!(user_id = %user_id, "TOTP enabled");

        Ok(())
    }

    /// Disables the second factor. The secret is retained so a later
    /// enable works against the same authenticator.
    pub async fn disable(&self, user_id: Uuid) -> Result<(), ApiError> {
        let config = self
            .otps
            .find_by_user(user_id)
            .await?
            .ok_or(ApiError::NotFound { resource: format!("otp-config:{}", user_id) })?;

        if !config.otp_enable {
            return Err(ApiError::Forbidden { message: "OTP not enabled".to_string() });
        }

        self.otps.set_enabled(user_id, false).await?;

        info!(user_id = %user_id, "TOTP disabled");

        Ok(())
    }

    /// Verifies a code for a user with an enabled configuration.
    pub async fn verify(&self, user_id: Uuid, otp: &str) -> Result<(), ApiError> {
        let config = self
            .otps
            .find_by_user(user_id)
            .await?
            .filter(|c| c.otp_enable)
            .ok_or(ApiError::Forbidden { message: "OTP not enabled".to_string() })?;

        self.verify_against_secret(&config.otp_secret_encrypted, user_id, otp)
    }

    /// Whether the user has an enabled second factor.
    pub async fn status(&self, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(self
            .otps
            .find_by_user(user_id)
            .await?
            .map(|c| c.otp_enable)
            .unwrap_or(false))
    }

    // =========================================================================
    // LOGIN GATE
    // =========================================================================

    /// Gate between "password and device accepted" and session creation.
    ///
    /// TOTP enabled: parks the verified login under an opaque token and
    /// answers with the challenge. Disabled: creates the session
    /// directly.
    pub async fn check_and_init_login(
        &self,
        user_id: Uuid,
        device_fingerprint_id: Uuid,
        browser: &str,
        device: &str,
        app: &str,
    ) -> Result<LoginGate, ApiError> {
        if !self.status(user_id).await? {
            let session = self.sessions.create(user_id, device_fingerprint_id, app).await?;
            return Ok(LoginGate::Session(session));
        }

        let token = ephemeral::generate_opaque_token();

        self.redis
            .set(
                &ephemeral::otp_login_session_key(&token),
                &OtpLoginGate {
                    user_id,
                    device_fingerprint_id,
                    browser: browser.to_string(),
                    device: device.to_string(),
                    app: app.to_string(),
                },
                Some(OTP_GATE_TTL),
            )
            .await?;

        info!(user_id = %user_id, "TOTP login challenge issued");

        Ok(LoginGate::OtpRequired { login_session_token: token })
    }

    /// Redeems a login gate token with a TOTP code and creates the
    /// session.
    pub async fn login_verify_otp(
        &self,
        login_session_token: &str,
        otp: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let gate: OtpLoginGate = self
            .redis
            .take(&ephemeral::otp_login_session_key(login_session_token))
            .await?
            .ok_or(ApiError::InvalidCode)?;

        self.verify(gate.user_id, otp).await?;

        let session = self
            .sessions
            .create(gate.user_id, gate.device_fingerprint_id, &gate.app)
            .await?;

        info!(user_id = %gate.user_id, "TOTP login completed");

        Ok(session)
    }

    // =========================================================================
    // FINGERPRINT-TRUST GATE
    // =========================================================================

    /// Gate for trusting an untrusted device behind TOTP.
    ///
    /// Returns a challenge token when TOTP is enabled, `None` otherwise
    /// (the email challenge alone then decides trust).
    pub async fn check_and_init_verify_fingerprint(
        &self,
        user_id: Uuid,
        device_fingerprint_id: Uuid,
    ) -> Result<Option<String>, ApiError> {
        if !self.status(user_id).await? {
            return Ok(None);
        }

        let token = ephemeral::generate_opaque_token();

        self.redis
            .set(
                &ephemeral::otp_verify_fingerprint_key(&token),
                &OtpFingerprintGate { user_id, device_fingerprint_id },
                Some(OTP_GATE_TTL),
            )
            .await?;

        info!(user_id = %user_id, "TOTP device-trust challenge issued");

        Ok(Some(token))
    }

    /// Redeems a trust gate token with a TOTP code: trusts the device
    /// AND creates the session.
    pub async fn fingerprint_trust_verify_otp(
        &self,
        verify_fingerprint_token: &str,
        otp: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let gate: OtpFingerprintGate = self
            .redis
            .take(&ephemeral::otp_verify_fingerprint_key(verify_fingerprint_token))
            .await?
            .ok_or(ApiError::InvalidCode)?;

        self.verify(gate.user_id, otp).await?;

        let fingerprint = self
            .fingerprints
            .set_trusted(gate.device_fingerprint_id)
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let session = self
            .sessions
            .create(gate.user_id, fingerprint.id, &self.default_app)
            .await?;

        info!(
            user_id = %gate.user_id,
            fingerprint_id = %fingerprint.id,
            "Device trusted via TOTP"
        );

        Ok(session)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Generates a fresh 32-byte secret, base32-encoded (`A-Z2-7`).
    fn generate_secret() -> String {
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        base32::encode(base32::Alphabet::RFC4648 { padding: false }, &bytes)
    }

    /// Builds the RFC 6238 instance: SHA-1, 6 digits, 30 s period, ±1
    /// step.
    fn build_totp(secret_base32: &str, issuer: &str, account_name: &str) -> Result<TOTP, ApiError> {
        let secret_bytes = Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .map_err(|_| ApiError::InternalError {
                message: "Stored TOTP secret is not valid base32".to_string(),
            })?;

        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes,
            Some(issuer.to_string()),
            account_name.to_string(),
        )
        .map_err(|e| ApiError::InternalError {
            message: format!("Failed to build TOTP instance: {}", e),
        })
    }

    /// Decrypts the stored secret and checks the code against the
    /// current time window.
    fn verify_against_secret(
        &self,
        secret_encrypted: &str,
        user_id: Uuid,
        otp: &str,
    ) -> Result<(), ApiError> {
        // Format gate before any crypto work
        if otp.len() != 6 || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::InvalidOtp);
        }

        let secret = self.cipher.decrypt(secret_encrypted)?;
        let totp = Self::build_totp(&secret, &self.issuer, &user_id.to_string())?;

        let valid = totp.check_current(otp).map_err(|e| ApiError::InternalError {
            message: format!("System clock error during TOTP check: {}", e),
        })?;

        if !valid {
            return Err(ApiError::InvalidOtp);
        }

        Ok(())
    }
}

impl std::fmt::Debug for TotpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpService").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_is_base32() {
        let secret = TotpService::generate_secret();

        // 32 bytes → 52 base32 characters unpadded
        assert_eq!(secret.len(), 52);
        assert!(secret
            .chars()
            .all(|c| ('A'..='Z').contains(&c) || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_secrets_are_unique() {
        assert_ne!(TotpService::generate_secret(), TotpService::generate_secret());
    }

    #[test]
    fn test_totp_roundtrip_current_window() {
        let secret = TotpService::generate_secret();
        let totp = TotpService::build_totp(&secret, "Decode", "alice@example.com").unwrap();

        let code = totp.generate_current().unwrap();
        assert!(totp.check_current(&code).unwrap());
    }

    #[test]
    fn test_wrong_code_fails() {
        let secret = TotpService::generate_secret();
        let totp = TotpService::build_totp(&secret, "Decode", "alice@example.com").unwrap();

        let code = totp.generate_current().unwrap();
        // Any different 6-digit string must fail
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!totp.check_current(wrong).unwrap());
    }

    #[test]
    fn test_otpauth_url_carries_issuer() {
        let secret = TotpService::generate_secret();
        let totp = TotpService::build_totp(&secret, "Decode", "alice@example.com").unwrap();

        let url = totp.get_url();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("Decode"));
    }

    #[test]
    fn test_invalid_base32_rejected() {
        assert!(TotpService::build_totp("not base32!!", "Decode", "a@x").is_err());
    }
}
