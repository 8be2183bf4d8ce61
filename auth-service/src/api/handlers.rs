//! # Request Handlers
//!
//! HTTP request handlers that bridge the API layer with the service
//! layer. Each handler follows this pattern:
//!
//! 1. **Extract** request data using Actix extractors
//! 2. **Validate** input using the `validator` crate
//! 3. **Authenticate** when the route is protected (access or service token)
//! 4. **Call** the service layer
//! 5. **Wrap** the result in the uniform envelope
//!
//! ## Error Handling
//!
//! All handlers return `Result<HttpResponse, ApiError>`. The `ApiError`
//! type converts to the error envelope via its `ResponseError`
//! implementation; no exception ever escapes a handler.
//!
//! ## Authentication
//!
//! | Guard | Checks |
//! |-------|--------|
//! | Bearer access token | JWT + bound session active/unexpired/unrevoked |
//! | Bearer service token | wallet issuer family, audience, `service` claim |
//!
//! ## Request Flow
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌─────────────┐     ┌──────────┐
//! │   Request   │────▶│ Middleware │────▶│   Handler   │────▶│ Envelope │
//! │  (JSON)     │     │ (CORS,Log) │     │ (Validate)  │     │  (JSON)  │
//! └─────────────┘     └────────────┘     └──────┬──────┘     └──────────┘
//!                                               │
//!                                               ▼
//!                                        ┌─────────────┐
//!                                        │   Service   │
//!                                        │   Layer     │
//!                                        └─────────────┘
//! ```

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use shared::auth::AccessClaims;
use shared::errors::ApiError;
use shared::response::{ok_message, ApiResponse};
use shared::validation;

use crate::service::{LoginInput, LoginOutcome};
use crate::AppState;

use super::dto::{
    ChangePasswordRequest, CleanupDto, DeviceVerificationDto, FingerprintEmailVerificationRequest,
    ForgotPasswordRequest, HealthDto, LoginRequest, LogoutRequest, OtpChallengeDto,
    OtpFingerprintLoginRequest, OtpLoginRequest, OtpRequest, OtpStatusDto, RefreshSessionRequest,
    RegisterRequest, RevokeFingerprintRequest, SessionDto, SsoCreateRequest, SsoTokenDto,
    SsoValidateRequest, VerifyEmailRequest, VerifyResetCodeRequest, WalletSessionRequest,
};

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// Liveness and dependency health.
///
/// # Route
///
/// `GET /auth/healthz`
///
/// Probes PostgreSQL (with pool latency/occupancy in the payload) and
/// Redis; either failing degrades to 503.
pub async fn healthz(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let database = shared::database::health_check(&state.db)
        .await
        .map_err(|_| ApiError::ServiceUnavailable { service: "postgres".to_string() })?;

    state
        .redis
        .ping()
        .await
        .map_err(|_| ApiError::ServiceUnavailable { service: "redis".to_string() })?;

    Ok(ApiResponse::ok(
        "Service healthy",
        HealthDto {
            status: "healthy".to_string(),
            service: "auth-service".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            database,
        },
    ))
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Starts a registration and emails a verification code.
///
/// # Route
///
/// `POST /auth/register/email-verification`
///
/// # Responses
///
/// - **200 OK**: Code sent
/// - **400 Bad Request**: Weak password, existing email/username
pub async fn register_email_verification(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state
        .auth
        .register(&body.username, &body.email, &body.password)
        .await?;

    Ok(ok_message("Verification code sent to email"))
}

/// Completes a registration with the emailed code.
///
/// # Route
///
/// `POST /auth/register/verify-email`
///
/// # Responses
///
/// - **201 Created**: `message = "User created successfully"`
/// - **400 Bad Request**: Unknown or expired code
pub async fn register_verify_email(
    state: web::Data<AppState>,
    body: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let user = state.auth.verify_email_register(&body.code).await?;

    Ok(ApiResponse::created("User created successfully", user))
}

// =============================================================================
// LOGIN
// =============================================================================

/// Runs the login state machine.
///
/// # Route
///
/// `POST /auth/login`
///
/// # Outcomes (all 200)
///
/// | Condition | `message` | `data` |
/// |-----------|-----------|--------|
/// | trusted device, no TOTP | "Login successful" | session + access tokens |
/// | trusted device, TOTP | "OTP required" | `login_session_token` |
/// | untrusted device | "Device fingerprint not trusted, send email verification" | optional trust-gate token |
///
/// # Errors
///
/// - **400 Bad Request**: `InvalidCredentials` for unknown identifier
///   *and* wrong password (no enumeration)
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let outcome = state
        .auth
        .login(LoginInput {
            email_or_username: body.email_or_username,
            password: body.password,
            fingerprint_hashed: body.fingerprint_hashed,
            browser: body.browser,
            device: body.device,
        })
        .await?;

    Ok(match outcome {
        LoginOutcome::Session(session) => {
            ApiResponse::ok("Login successful", SessionDto::from(session))
        }
        LoginOutcome::OtpRequired { login_session_token } => {
            ApiResponse::ok("OTP required", OtpChallengeDto { login_session_token })
        }
        LoginOutcome::DeviceVerificationRequired { verify_fingerprint_session_token } => {
            ApiResponse::ok(
                "Device fingerprint not trusted, send email verification",
                DeviceVerificationDto { verify_fingerprint_session_token },
            )
        }
    })
}

/// Redeems a device email challenge: trusts the device and opens the
/// session.
///
/// # Route
///
/// `POST /auth/login/fingerprint/email-verification`
pub async fn login_fingerprint_email_verification(
    state: web::Data<AppState>,
    body: web::Json<FingerprintEmailVerificationRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state.auth.login_verify_fingerprint_email(&body.code).await?;

    Ok(ApiResponse::ok("Device verified, session created", SessionDto::from(session)))
}

// =============================================================================
// FINGERPRINTS
// =============================================================================

/// Lists the caller's trusted devices with their active sessions.
///
/// # Route
///
/// `GET /auth/fingerprints` (Bearer access token)
pub async fn list_fingerprints(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let fingerprints = state.fingerprints.list(claims.sub).await?;

    Ok(ApiResponse::ok("Trusted devices", fingerprints))
}

/// Revokes a device and every session bound to it.
///
/// # Route
///
/// `POST /auth/fingerprints/revoke` (Bearer access token)
pub async fn revoke_fingerprint(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RevokeFingerprintRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;
    let body = body.into_inner();

    let revoked = state
        .fingerprints
        .revoke(body.fingerprint_id, claims.sub)
        .await?;

    Ok(ApiResponse::ok(
        "Device revoked",
        CleanupDto { revoked },
    ))
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Rotates a session token and mints a fresh access token.
///
/// # Route
///
/// `POST /auth/session/refresh`
///
/// The old session token becomes unusable atomically with the rotation;
/// a replayed old token answers **401 Unauthorized**.
pub async fn refresh_session(
    state: web::Data<AppState>,
    body: web::Json<RefreshSessionRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state.sessions.refresh(&body.session_token).await?;

    Ok(ApiResponse::ok("Session refreshed", SessionDto::from(session)))
}

/// Lists the caller's active sessions.
///
/// # Route
///
/// `POST /auth/session/active` (Bearer access token)
pub async fn active_sessions(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let sessions = state.sessions.list_active(claims.sub).await?;

    Ok(ApiResponse::ok("Active sessions", sessions))
}

/// Validates and revokes a session.
///
/// # Route
///
/// `POST /auth/session/logout`
pub async fn logout(
    state: web::Data<AppState>,
    body: web::Json<LogoutRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.sessions.logout(&body.session_token).await?;

    Ok(ok_message("Logged out successfully"))
}

/// Marks the caller's expired sessions as revoked.
///
/// # Route
///
/// `POST /auth/session/cleanup` (Bearer access token)
///
/// Hygiene only - validation never depends on this having run.
pub async fn cleanup_sessions(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let revoked = state.sessions.cleanup_expired(claims.sub).await?;

    Ok(ApiResponse::ok("Expired sessions cleaned up", CleanupDto { revoked }))
}

/// Wallet-session path: redeems a wallet pass token into a trusted
/// session.
///
/// # Route
///
/// `POST /auth/services/session/create-wallet-session`
///
/// # Authentication
///
/// - `Authorization: Bearer <service token>` minted by the wallet
/// - `User-Agent` must identify the wallet sibling
pub async fn create_wallet_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<WalletSessionRequest>,
) -> Result<HttpResponse, ApiError> {
    // Service-token gate first; the orchestrator re-checks the UA
    let token = extract_bearer_token(&req)?;
    state.service_tokens.verify_wallet_token(&token)?;

    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state
        .auth
        .create_wallet_session(&body.wallet_pass_token, &user_agent)
        .await?;

    Ok(ApiResponse::ok("Wallet session created", SessionDto::from(session)))
}

// =============================================================================
// SSO
// =============================================================================

/// Mints a one-shot cross-app handoff token.
///
/// # Route
///
/// `POST /auth/sso/create` (Bearer access token)
///
/// The authenticated principal is authoritative; a body `user_id` that
/// disagrees is rejected with **403 Forbidden**.
pub async fn sso_create(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SsoCreateRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    if let Some(user_id) = body.user_id {
        if user_id != claims.sub {
            return Err(ApiError::Forbidden {
                message: "user_id does not match the authenticated principal".to_string(),
            });
        }
    }

    let sso_token = state
        .sso
        .create(claims.sub, &body.app, &body.fingerprint_hashed)
        .await?;

    Ok(ApiResponse::ok("SSO token created", SsoTokenDto { sso_token }))
}

/// Redeems an SSO handoff token into a fresh session.
///
/// # Route
///
/// `POST /auth/sso/validate`
///
/// Single use: a second redemption of the same token answers
/// **400 Bad Request**.
pub async fn sso_validate(
    state: web::Data<AppState>,
    body: web::Json<SsoValidateRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state.sso.validate(&body.sso_token).await?;

    Ok(ApiResponse::ok("SSO session created", SessionDto::from(session)))
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

/// Starts a password reset and emails a code.
///
/// # Route
///
/// `POST /auth/password/forgot`
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.auth.initiate_password_reset(&body.email_or_username).await?;

    Ok(ok_message("Password reset code sent to email"))
}

/// Checks a reset code without consuming it.
///
/// # Route
///
/// `POST /auth/password/verify`
pub async fn verify_reset_code(
    state: web::Data<AppState>,
    body: web::Json<VerifyResetCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.auth.verify_password_reset(&body.code).await?;

    Ok(ok_message("Code is valid"))
}

/// Completes a password reset. The code is consumed here.
///
/// # Route
///
/// `POST /auth/password/change`
pub async fn change_password(
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.auth.change_password(&body.code, &body.new_password).await?;

    Ok(ok_message("Password changed successfully. Please log in with your new password."))
}

// =============================================================================
// USER INFO
// =============================================================================

/// Returns the authenticated user's directory profile.
///
/// # Route
///
/// `GET /auth/info/me` (Bearer access token)
pub async fn info_me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let user = state.auth.get_user_info(claims.sub).await?;

    Ok(ApiResponse::ok("User info", user))
}

// =============================================================================
// 2FA
// =============================================================================

/// Provisions a TOTP secret.
///
/// # Route
///
/// `POST /auth/2fa/setup` (Bearer access token)
///
/// The response is the only place the plaintext secret ever appears.
///
/// # Errors
///
/// - **403 Forbidden**: already set up
pub async fn totp_setup(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let provisioning = state.auth.totp_setup(claims.sub).await?;

    Ok(ApiResponse::ok("Scan the QR code with your authenticator", provisioning))
}

/// Enables the second factor after a valid current code.
///
/// # Route
///
/// `POST /auth/2fa/enable` (Bearer access token)
pub async fn totp_enable(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<OtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.totp.enable(claims.sub, &body.otp).await?;

    Ok(ok_message("Two-factor authentication enabled"))
}

/// Disables the second factor (the secret is retained).
///
/// # Route
///
/// `POST /auth/2fa/disable` (Bearer access token)
pub async fn totp_disable(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    state.totp.disable(claims.sub).await?;

    Ok(ok_message("Two-factor authentication disabled"))
}

/// Ad-hoc verification of a TOTP code.
///
/// # Route
///
/// `POST /auth/2fa/verify` (Bearer access token)
pub async fn totp_verify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<OtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.totp.verify(claims.sub, &body.otp).await?;

    Ok(ok_message("OTP valid"))
}

/// Whether the caller has an enabled second factor.
///
/// # Route
///
/// `GET /auth/2fa/status` (Bearer access token)
pub async fn totp_status(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let claims = authenticate(&req, &state).await?;

    let enabled = state.totp.status(claims.sub).await?;

    Ok(ApiResponse::ok("Two-factor status", OtpStatusDto { enabled }))
}

/// Redeems a TOTP login gate into a session.
///
/// # Route
///
/// `POST /auth/2fa/login`
pub async fn totp_login(
    state: web::Data<AppState>,
    body: web::Json<OtpLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state
        .auth
        .login_verify_otp(&body.login_session_token, &body.otp)
        .await?;

    Ok(ApiResponse::ok("Login successful", SessionDto::from(session)))
}

/// Redeems a TOTP device-trust gate: trusts the device and opens the
/// session.
///
/// # Route
///
/// `POST /auth/2fa/login/fingerprint`
pub async fn totp_login_fingerprint(
    state: web::Data<AppState>,
    body: web::Json<OtpFingerprintLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let session = state
        .auth
        .login_fingerprint_verify_otp(&body.verify_fingerprint_session_token, &body.otp)
        .await?;

    Ok(ApiResponse::ok("Device trusted, session created", SessionDto::from(session)))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Extracts the Bearer token from the Authorization header.
///
/// # Errors
///
/// `Unauthorized` when the header is missing, malformed, or empty - the
/// same kind every token failure maps to.
fn extract_bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(ApiError::Unauthorized)?
        .to_str()
        .map_err(|_| ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    Ok(token.to_string())
}

/// Full access-token authentication: JWT plus the bound session record.
async fn authenticate(
    req: &HttpRequest,
    state: &web::Data<AppState>,
) -> Result<AccessClaims, ApiError> {
    let token = extract_bearer_token(req)?;
    state.sessions.validate_access(&token).await
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_bearer_token_valid() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer my_token_123"))
            .to_http_request();

        let result = extract_bearer_token(&req);
        assert_eq!(result.unwrap(), "my_token_123");
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let req = TestRequest::default().to_http_request();

        assert!(matches!(extract_bearer_token(&req), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert!(matches!(extract_bearer_token(&req), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_extract_bearer_token_empty() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();

        assert!(matches!(extract_bearer_token(&req), Err(ApiError::Unauthorized)));
    }
}
