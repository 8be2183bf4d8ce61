//! # Data Transfer Objects (DTOs)
//!
//! Request and response shapes for the HTTP API. Requests are validated
//! with the `validator` crate in one explicit step per handler; responses
//! ride inside the uniform envelope
//! (`{success, statusCode, message, data?, error?}`).
//!
//! ## DTO Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              DTOs                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Request DTOs (input)              Response DTOs (output, in `data`)    │
//! │  ───────────────────               ─────────────────────                │
//! │  - RegisterRequest                 - SessionDto                         │
//! │  - VerifyEmailRequest              - OtpChallengeDto                    │
//! │  - LoginRequest                    - DeviceVerificationDto              │
//! │  - RefreshSessionRequest           - SsoTokenDto                        │
//! │  - OtpLoginRequest                 - OtpStatusDto                       │
//! │  - ...                             - HealthDto                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Validation Rules
//!
//! | Field | Rules |
//! |-------|-------|
//! | `email` | Valid email format, max 255 chars |
//! | `username` | 3-32 chars, letters/digits/`_`/`-` |
//! | `password` | 8-128 chars (full strength policy in the engine) |
//! | codes | exactly 6 chars, URL-safe alphabet |
//! | `otp` | exactly six digits |
//! | opaque tokens | non-blank |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::database::PoolHealth;
use shared::validation::validators;
use uuid::Uuid;
use validator::Validate;

use crate::service::SessionWithAccess;

// =============================================================================
// REGISTRATION
// =============================================================================

/// Request body for starting a registration.
///
/// # Example JSON
///
/// ```json
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "Abcdef1!"
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username
    #[validate(custom(function = "validators::valid_username"))]
    pub username: String,

    /// Email address the verification code goes to
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,

    /// Plain text password (full policy enforced by the password engine)
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Request body for completing a registration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    /// The 6-character code from the verification email
    #[validate(custom(function = "validators::valid_verification_code"))]
    pub code: String,
}

// =============================================================================
// LOGIN
// =============================================================================

/// Request body for login.
///
/// # Example JSON
///
/// ```json
/// {
///   "email_or_username": "alice",
///   "password": "Abcdef1!",
///   "fingerprint_hashed": "c2f7…",
///   "browser": "Firefox",
///   "device": "Linux"
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address or username
    #[validate(length(min = 3, max = 255, message = "Identifier must be 3-255 characters"))]
    pub email_or_username: String,

    /// Plain text password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Opaque client-computed device hash
    #[validate(custom(function = "validators::not_blank"))]
    #[validate(length(max = 255, message = "Fingerprint too long"))]
    pub fingerprint_hashed: String,

    /// Browser name
    #[validate(length(max = 100, message = "Browser name too long"))]
    pub browser: String,

    /// Device name
    #[validate(length(max = 100, message = "Device name too long"))]
    pub device: String,
}

/// Request body for redeeming a device email challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FingerprintEmailVerificationRequest {
    /// The 6-character code from the device-verification email
    #[validate(custom(function = "validators::valid_verification_code"))]
    pub code: String,
}

// =============================================================================
// FINGERPRINTS
// =============================================================================

/// Request body for revoking a device.
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeFingerprintRequest {
    /// Id of the fingerprint to revoke
    pub fingerprint_id: Uuid,
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Request body for rotating a session token.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshSessionRequest {
    /// The current session token
    #[validate(custom(function = "validators::not_blank"))]
    pub session_token: String,
}

/// Request body for logging out a session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogoutRequest {
    /// The session token to revoke
    #[validate(custom(function = "validators::not_blank"))]
    pub session_token: String,
}

/// Request body for the wallet-session path.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WalletSessionRequest {
    /// The pass token the wallet parked in the ephemeral store
    #[validate(custom(function = "validators::not_blank"))]
    pub wallet_pass_token: String,
}

// =============================================================================
// SSO
// =============================================================================

/// Request body for minting an SSO handoff token.
///
/// `user_id` is optional and, when present, must match the authenticated
/// principal - the principal is authoritative.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SsoCreateRequest {
    /// Destination application label
    #[validate(custom(function = "validators::not_blank"))]
    #[validate(length(max = 100, message = "App label too long"))]
    pub app: String,

    /// Trusted device hash the new session will bind to
    #[validate(custom(function = "validators::not_blank"))]
    pub fingerprint_hashed: String,

    /// Optional; rejected when it disagrees with the access token
    pub user_id: Option<Uuid>,
}

/// Request body for redeeming an SSO handoff token.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SsoValidateRequest {
    /// The one-shot handoff token
    #[validate(custom(function = "validators::not_blank"))]
    pub sso_token: String,
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

/// Request body for starting a password reset.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    /// Email address or username
    #[validate(length(min = 3, max = 255, message = "Identifier must be 3-255 characters"))]
    pub email_or_username: String,
}

/// Request body for checking a reset code.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyResetCodeRequest {
    /// The 6-character code from the reset email
    #[validate(custom(function = "validators::valid_verification_code"))]
    pub code: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// The 6-character code from the reset email
    #[validate(custom(function = "validators::valid_verification_code"))]
    pub code: String,

    /// The replacement password
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

// =============================================================================
// 2FA
// =============================================================================

/// Request body carrying a bare OTP (enable / verify).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpRequest {
    /// Six-digit TOTP code
    #[validate(custom(function = "validators::valid_otp_digits"))]
    pub otp: String,
}

/// Request body for redeeming a TOTP login gate.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpLoginRequest {
    /// Gate token issued by the login flow
    #[validate(custom(function = "validators::not_blank"))]
    pub login_session_token: String,

    /// Six-digit TOTP code
    #[validate(custom(function = "validators::valid_otp_digits"))]
    pub otp: String,
}

/// Request body for redeeming a TOTP device-trust gate.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpFingerprintLoginRequest {
    /// Gate token issued by the untrusted-device login branch
    #[validate(custom(function = "validators::not_blank"))]
    pub verify_fingerprint_session_token: String,

    /// Six-digit TOTP code
    #[validate(custom(function = "validators::valid_otp_digits"))]
    pub otp: String,
}

// =============================================================================
// RESPONSE DTOs
// =============================================================================

/// Session payload returned by every session-creating endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    /// Long-lived rotating bearer credential
    pub session_token: String,
    /// Short-lived access token bound to it
    pub access_token: String,
    /// Session owner
    pub user_id: Uuid,
    /// Application label
    pub app: String,
    /// Hard session expiry
    pub expires_at: DateTime<Utc>,
}

impl From<SessionWithAccess> for SessionDto {
    fn from(value: SessionWithAccess) -> Self {
        Self {
            session_token: value.session.session_token,
            access_token: value.access_token,
            user_id: value.session.user_id,
            app: value.session.app,
            expires_at: value.session.expires_at,
        }
    }
}

/// Payload when TOTP gates a login.
#[derive(Debug, Clone, Serialize)]
pub struct OtpChallengeDto {
    /// Redeem at `/auth/2fa/login` within five minutes
    pub login_session_token: String,
}

/// Payload when an untrusted device blocks a login.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceVerificationDto {
    /// Present when TOTP is enabled: redeem at
    /// `/auth/2fa/login/fingerprint` instead of the email code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_fingerprint_session_token: Option<String>,
}

/// Payload for a minted SSO handoff token.
#[derive(Debug, Clone, Serialize)]
pub struct SsoTokenDto {
    /// One-shot, 60-second handoff token
    pub sso_token: String,
}

/// Payload for the 2FA status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OtpStatusDto {
    /// Whether login requires the second factor
    pub enabled: bool,
}

/// Payload for the session-cleanup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupDto {
    /// How many expired sessions were marked revoked
    pub revoked: u64,
}

/// Health check payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthDto {
    /// Always "healthy" on 200
    pub status: String,
    /// Service name
    pub service: String,
    /// Current server time (RFC 3339)
    pub timestamp: String,
    /// Database probe latency and pool occupancy
    pub database: PoolHealth,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shared::validation::validate_request;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "Abcdef1!".to_string(),
        };
        assert!(validate_request(&valid).is_ok());

        let bad_email = RegisterRequest { email: "nope".to_string(), ..valid.clone() };
        assert!(validate_request(&bad_email).is_err());

        let short_password = RegisterRequest { password: "Ab1!".to_string(), ..valid };
        assert!(validate_request(&short_password).is_err());
    }

    #[test]
    fn test_login_request_requires_fingerprint() {
        let request = LoginRequest {
            email_or_username: "alice".to_string(),
            password: "Abcdef1!".to_string(),
            fingerprint_hashed: "   ".to_string(),
            browser: "Firefox".to_string(),
            device: "Linux".to_string(),
        };
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_otp_login_request_validates_digits() {
        let request = OtpLoginRequest {
            login_session_token: "token".to_string(),
            otp: "12345a".to_string(),
        };
        assert!(validate_request(&request).is_err());

        let request = OtpLoginRequest {
            login_session_token: "token".to_string(),
            otp: "123456".to_string(),
        };
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_session_dto_field_names() {
        let dto = SessionDto {
            session_token: "s".to_string(),
            access_token: "a".to_string(),
            user_id: Uuid::new_v4(),
            app: "decode".to_string(),
            expires_at: Utc::now(),
        };

        let json = serde_json::to_value(&dto).unwrap();
        // Clients key off these exact names
        assert!(json.get("session_token").is_some());
        assert!(json.get("access_token").is_some());
    }
}
