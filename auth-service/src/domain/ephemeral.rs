//! # Ephemeral Records
//!
//! Typed payloads, key builders, and TTLs for every short-lived artifact
//! the multi-step flows park in the ephemeral store.
//!
//! ## Why Typed
//!
//! Each cache key has exactly one payload shape. Pairing the key builder
//! with its struct in one place keeps writer and reader in agreement; a
//! flow can't stash one shape and redeem another.
//!
//! | Key | Payload | TTL |
//! |-----|---------|-----|
//! | `register_info:{email}` | [`RegisterInfo`] | 1 h |
//! | `email_verification_code:{code}` | [`EmailVerificationCode`] | 5 min |
//! | `fingerprint-email-verification:{code}` | [`FingerprintChallenge`] | 5 min |
//! | `change_password_verification_code:{code}` | [`PasswordResetTicket`] | 5 min |
//! | `sso:{token}` | [`SsoTicket`] | 60 s |
//! | `otp_login_session:{token}` | [`OtpLoginGate`] | 5 min |
//! | `otp_verify_fingerprint_session:{token}` | [`OtpFingerprintGate`] | 5 min |
//! | `wallet_pass_token:{token}` | [`WalletPassTicket`] | ≤ 5 min (written by the wallet sibling) |
//!
//! All artifacts are single-use: redeemed with a read-then-delete. The
//! gate payloads (`OtpLoginGate`, `OtpFingerprintGate`) are the only
//! legal carriers of "password and device already verified" state across
//! requests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// TTLs
// =============================================================================

/// Pending registrations wait for email verification up to an hour.
pub const REGISTER_INFO_TTL: Duration = Duration::from_secs(60 * 60);

/// Verification codes of every flavor live five minutes.
pub const VERIFICATION_CODE_TTL: Duration = Duration::from_secs(5 * 60);

/// SSO handoff tokens are redeemed within a minute or not at all.
pub const SSO_TOKEN_TTL: Duration = Duration::from_secs(60);

/// 2FA gate tokens live five minutes.
pub const OTP_GATE_TTL: Duration = Duration::from_secs(5 * 60);

// =============================================================================
// Token & Code Generation
// =============================================================================

/// URL-safe alphabet for verification codes and opaque tokens.
const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Verification codes are 6 characters.
const CODE_LEN: usize = 6;

/// Opaque tokens (2FA gates, SSO) are 32 characters.
const OPAQUE_TOKEN_LEN: usize = 32;

/// Generates a 6-character verification code.
pub fn generate_code() -> String {
    random_string(CODE_LEN)
}

/// Generates a 32-character opaque token.
pub fn generate_opaque_token() -> String {
    random_string(OPAQUE_TOKEN_LEN)
}

fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..URL_SAFE_ALPHABET.len());
            URL_SAFE_ALPHABET[idx] as char
        })
        .collect()
}

// =============================================================================
// Key Builders
// =============================================================================

/// `register_info:{email}`
pub fn register_info_key(email: &str) -> String {
    format!("register_info:{}", email)
}

/// `email_verification_code:{code}`
pub fn email_verification_code_key(code: &str) -> String {
    format!("email_verification_code:{}", code)
}

/// `fingerprint-email-verification:{code}`
pub fn fingerprint_verification_key(code: &str) -> String {
    format!("fingerprint-email-verification:{}", code)
}

/// `change_password_verification_code:{code}`
pub fn change_password_code_key(code: &str) -> String {
    format!("change_password_verification_code:{}", code)
}

/// `sso:{token}`
pub fn sso_key(token: &str) -> String {
    format!("sso:{}", token)
}

/// `otp_login_session:{token}`
pub fn otp_login_session_key(token: &str) -> String {
    format!("otp_login_session:{}", token)
}

/// `otp_verify_fingerprint_session:{token}`
pub fn otp_verify_fingerprint_key(token: &str) -> String {
    format!("otp_verify_fingerprint_session:{}", token)
}

/// `wallet_pass_token:{token}`
pub fn wallet_pass_token_key(token: &str) -> String {
    format!("wallet_pass_token:{}", token)
}

// =============================================================================
// Payloads
// =============================================================================

/// Pending registration, parked until the email code is redeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInfo {
    /// Requested username
    pub username: String,
    /// Address the code was sent to
    pub email: String,
    /// Already-hashed password (never the plaintext)
    pub password_hashed: String,
}

/// Registration email code, keyed by the code itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationCode {
    /// Email the pending registration is parked under
    pub email: String,
    /// The code, repeated in the payload for cross-checking
    pub code: String,
}

/// Device-trust email challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintChallenge {
    /// User whose device is being verified
    pub user_id: Uuid,
    /// The untrusted fingerprint hash awaiting trust
    pub fingerprint_hashed: String,
}

/// Password-reset code payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetTicket {
    /// User who requested the reset
    pub user_id: Uuid,
    /// The code, repeated for cross-checking
    pub verification_code: String,
}

/// One-shot cross-app handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoTicket {
    /// User handing themselves off
    pub user_id: Uuid,
    /// Destination application label
    pub app: String,
    /// Trusted fingerprint the new session will bind to
    pub device_fingerprint_id: Uuid,
}

/// "Password and device verified, TOTP pending" login gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpLoginGate {
    /// Authenticated user
    pub user_id: Uuid,
    /// Trusted fingerprint for the eventual session
    pub device_fingerprint_id: Uuid,
    /// Browser reported at login
    pub browser: String,
    /// Device reported at login
    pub device: String,
    /// Application label for the eventual session
    pub app: String,
}

/// "Password verified, device trust + TOTP pending" gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpFingerprintGate {
    /// Authenticated user
    pub user_id: Uuid,
    /// Untrusted fingerprint awaiting the TOTP proof
    pub device_fingerprint_id: Uuid,
}

/// Wallet handoff payload, written by the wallet sibling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletPassTicket {
    /// User the wallet authenticated
    pub user_id: Uuid,
    /// Fingerprint hash to create or locate as trusted
    pub fingerprint_hashed: String,
    /// Browser reported by the wallet
    pub browser: String,
    /// Device reported by the wallet
    pub device: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), 6);
        assert!(code
            .bytes()
            .all(|b| URL_SAFE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_opaque_token_shape() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), 32);
        assert!(token
            .bytes()
            .all(|b| URL_SAFE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_opaque_token(), generate_opaque_token());
    }

    #[test]
    fn test_key_builders() {
        assert_eq!(register_info_key("a@x"), "register_info:a@x");
        assert_eq!(
            email_verification_code_key("aB3-_9"),
            "email_verification_code:aB3-_9"
        );
        assert_eq!(
            fingerprint_verification_key("aB3-_9"),
            "fingerprint-email-verification:aB3-_9"
        );
        assert_eq!(
            change_password_code_key("aB3-_9"),
            "change_password_verification_code:aB3-_9"
        );
        assert_eq!(sso_key("tok"), "sso:tok");
        assert_eq!(otp_login_session_key("tok"), "otp_login_session:tok");
        assert_eq!(
            otp_verify_fingerprint_key("tok"),
            "otp_verify_fingerprint_session:tok"
        );
        assert_eq!(wallet_pass_token_key("tok"), "wallet_pass_token:tok");
    }

    #[test]
    fn test_ttls() {
        assert_eq!(REGISTER_INFO_TTL.as_secs(), 3600);
        assert_eq!(VERIFICATION_CODE_TTL.as_secs(), 300);
        assert_eq!(SSO_TOKEN_TTL.as_secs(), 60);
        assert_eq!(OTP_GATE_TTL.as_secs(), 300);
    }
}
