//! # Route Configuration
//!
//! Maps URL patterns to handler functions, one endpoint per orchestrator
//! operation.
//!
//! ## Route Structure
//!
//! ```text
//! /auth/
//! ├── healthz                              GET  → healthz
//! ├── register/
//! │   ├── email-verification               POST → register_email_verification
//! │   └── verify-email                     POST → register_verify_email
//! ├── login                                POST → login
//! ├── login/fingerprint/email-verification POST → login_fingerprint_email_verification
//! ├── fingerprints                         GET  → list_fingerprints          [access]
//! ├── fingerprints/revoke                  POST → revoke_fingerprint         [access]
//! ├── session/
//! │   ├── refresh                          POST → refresh_session
//! │   ├── active                           POST → active_sessions            [access]
//! │   ├── logout                           POST → logout
//! │   └── cleanup                          POST → cleanup_sessions           [access]
//! ├── services/session/create-wallet-session POST → create_wallet_session   [service]
//! ├── sso/
//! │   ├── create                           POST → sso_create                 [access]
//! │   └── validate                         POST → sso_validate
//! ├── password/
//! │   ├── forgot                           POST → forgot_password
//! │   ├── verify                           POST → verify_reset_code
//! │   └── change                           POST → change_password
//! ├── info/me                              GET  → info_me                    [access]
//! └── 2fa/
//!     ├── setup                            POST → totp_setup                 [access]
//!     ├── enable                           POST → totp_enable                [access]
//!     ├── disable                          POST → totp_disable               [access]
//!     ├── verify                           POST → totp_verify                [access]
//!     ├── status                           GET  → totp_status                [access]
//!     ├── login                            POST → totp_login
//!     └── login/fingerprint                POST → totp_login_fingerprint
//! ```
//!
//! `[access]` routes require a Bearer access token (validated against
//! the bound session); `[service]` routes require a Bearer service
//! token from the wallet sibling. The guards run inside the handlers so
//! every rejection passes through the same envelope conversion.

use actix_web::web;

use super::handlers;

/// Configures all routes for the auth service.
///
/// Called from `main.rs` during app initialization:
///
/// ```rust,ignore
/// App::new()
///     .configure(routes::configure)
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            // ─────────────────────────────────────────────────────────
            // Health
            // ─────────────────────────────────────────────────────────
            .route("/healthz", web::get().to(handlers::healthz))
            // ─────────────────────────────────────────────────────────
            // Registration
            // ─────────────────────────────────────────────────────────
            .route(
                "/register/email-verification",
                web::post().to(handlers::register_email_verification),
            )
            .route(
                "/register/verify-email",
                web::post().to(handlers::register_verify_email),
            )
            // ─────────────────────────────────────────────────────────
            // Login & device trust
            // ─────────────────────────────────────────────────────────
            .route("/login", web::post().to(handlers::login))
            .route(
                "/login/fingerprint/email-verification",
                web::post().to(handlers::login_fingerprint_email_verification),
            )
            .route("/fingerprints", web::get().to(handlers::list_fingerprints))
            .route(
                "/fingerprints/revoke",
                web::post().to(handlers::revoke_fingerprint),
            )
            // ─────────────────────────────────────────────────────────
            // Sessions
            // ─────────────────────────────────────────────────────────
            .route("/session/refresh", web::post().to(handlers::refresh_session))
            .route("/session/active", web::post().to(handlers::active_sessions))
            .route("/session/logout", web::post().to(handlers::logout))
            .route("/session/cleanup", web::post().to(handlers::cleanup_sessions))
            .route(
                "/services/session/create-wallet-session",
                web::post().to(handlers::create_wallet_session),
            )
            // ─────────────────────────────────────────────────────────
            // SSO
            // ─────────────────────────────────────────────────────────
            .route("/sso/create", web::post().to(handlers::sso_create))
            .route("/sso/validate", web::post().to(handlers::sso_validate))
            // ─────────────────────────────────────────────────────────
            // Password reset
            // ─────────────────────────────────────────────────────────
            .route("/password/forgot", web::post().to(handlers::forgot_password))
            .route("/password/verify", web::post().to(handlers::verify_reset_code))
            .route("/password/change", web::post().to(handlers::change_password))
            // ─────────────────────────────────────────────────────────
            // User info
            // ─────────────────────────────────────────────────────────
            .route("/info/me", web::get().to(handlers::info_me))
            // ─────────────────────────────────────────────────────────
            // Two-factor authentication
            // ─────────────────────────────────────────────────────────
            .route("/2fa/setup", web::post().to(handlers::totp_setup))
            .route("/2fa/enable", web::post().to(handlers::totp_enable))
            .route("/2fa/disable", web::post().to(handlers::totp_disable))
            .route("/2fa/verify", web::post().to(handlers::totp_verify))
            .route("/2fa/status", web::get().to(handlers::totp_status))
            .route("/2fa/login", web::post().to(handlers::totp_login))
            .route(
                "/2fa/login/fingerprint",
                web::post().to(handlers::totp_login_fingerprint),
            ),
    );
}
