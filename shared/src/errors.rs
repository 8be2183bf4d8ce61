//! # Application Error Types
//!
//! Unified error handling for the auth service with automatic HTTP conversion.
//!
//! ## Design Philosophy
//!
//! Each error variant maps to a specific HTTP status code and error code,
//! ensuring consistent API responses. Domain errors ("not present", "wrong
//! credential") are distinct from infrastructure errors, which are logged
//! with their cause and returned to clients as an opaque `ServerError`.
//!
//! ## Error Categories
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                           ApiError Categories                            │
//! ├─────────────────────────┬───────────────────┬────────────────────────────┤
//! │ Domain (400)            │ Auth (401, 403)   │ Lookup (404)               │
//! ├─────────────────────────┼───────────────────┼────────────────────────────┤
//! │ InvalidCredentials      │ Unauthorized      │ NotFound                   │
//! │ WeakPassword            │ Forbidden         │                            │
//! │ ExistingUser            │                   │                            │
//! │ InvalidCode             │                   │                            │
//! │ DeviceNotTrusted        │                   │                            │
//! │ InvalidOtp              │                   │                            │
//! │ ValidationError         │                   │                            │
//! │ BadRequest              │                   │                            │
//! ├─────────────────────────┴───────────────────┴────────────────────────────┤
//! │ Server (500, 503): DatabaseError, RedisError, UpstreamError,             │
//! │                    InternalError, ServiceUnavailable                     │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## HTTP Response Format
//!
//! All errors serialize to the uniform API envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "statusCode": 400,
//!   "message": "Invalid credentials",
//!   "error": "INVALID_CREDENTIALS"
//! }
//! ```
//!
//! Token-validation failures intentionally collapse to a single
//! `Unauthorized` response: which check failed (signature, issuer,
//! audience, expiry, revocation) is never disclosed to clients.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Main Error Enum
// =============================================================================

/// Application error type with automatic HTTP status mapping.
///
/// Each variant represents a specific error condition and maps to an
/// appropriate HTTP status code. The `#[error]` attribute defines the
/// client-visible message.
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Domain Errors (400 Bad Request)
    // =========================================================================

    /// Wrong password or unknown email/username.
    /// One message for both cases to prevent user enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password failed the strength check.
    /// Carries the feedback strings from the strength report.
    #[error("Password does not meet strength requirements")]
    WeakPassword {
        /// Which requirements failed, for client display
        feedback: Vec<String>,
    },

    /// Email or username already present in the user directory.
    #[error("User already exists: {resource}")]
    ExistingUser {
        /// Which identifier collided ("email" or "username")
        resource: String,
    },

    /// An ephemeral code lookup missed: unknown, expired, or already
    /// redeemed. One kind for all three; no state is mutated.
    #[error("Invalid or expired code")]
    InvalidCode,

    /// Login attempted from a device fingerprint that is not trusted.
    /// Carries no secret data.
    #[error("Device fingerprint not trusted, send email verification")]
    DeviceNotTrusted,

    /// One-time password failed format or verification.
    #[error("Invalid OTP")]
    InvalidOtp,

    /// Request body failed validation rules.
    /// Contains field-level errors from the `validator` crate.
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    /// Generic bad request with custom message.
    #[error("Invalid input: {message}")]
    BadRequest {
        /// Human-readable description of what's wrong
        message: String,
    },

    // =========================================================================
    // Authentication / Authorization (401, 403)
    // =========================================================================

    /// Token invalid, expired, or bound to a revoked session.
    /// No reason is disclosed.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed: role missing, OTP already set up,
    /// or principal mismatch.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// What was refused (safe for clients)
        message: String,
    },

    // =========================================================================
    // Lookup Errors (404)
    // =========================================================================

    /// Requested resource doesn't exist (user-info lookups).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Resource identifier (e.g., "user:123")
        resource: String,
    },

    // =========================================================================
    // Server Errors (500, 503)
    // =========================================================================
    // Logged with cause; clients receive an opaque message.

    /// PostgreSQL query failed.
    #[error("Internal server error")]
    DatabaseError(#[from] sqlx::Error),

    /// Redis operation failed.
    #[error("Internal server error")]
    RedisError(#[from] redis::RedisError),

    /// A sibling-service call failed at the transport level or returned
    /// a 5xx. The cause stays in the logs.
    #[error("Internal server error")]
    UpstreamError {
        /// Which sibling failed (not exposed to clients)
        service: String,
        /// Internal message for logging
        message: String,
    },

    /// Unspecified internal error. Last resort.
    #[error("Internal server error")]
    InternalError {
        /// Internal message for logging (not exposed to client)
        message: String,
    },

    /// A dependency (database, cache) is down. Used by health checks.
    #[error("Service unavailable")]
    ServiceUnavailable {
        /// Name of the unavailable dependency
        service: String,
    },
}

// =============================================================================
// Error Methods
// =============================================================================

impl ApiError {
    /// Returns a machine-readable error code.
    ///
    /// These codes are stable and can be used by API clients for
    /// programmatic error handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::WeakPassword { .. } => "WEAK_PASSWORD",
            Self::ExistingUser { .. } => "EXISTING_USER",
            Self::InvalidCode => "INVALID_CODE",
            Self::DeviceNotTrusted => "DEVICE_NOT_TRUSTED",
            Self::InvalidOtp => "INVALID_OTP",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DatabaseError(_)
            | Self::RedisError(_)
            | Self::UpstreamError { .. }
            | Self::InternalError { .. } => "SERVER_ERROR",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// This is the source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - domain-level rejections
            Self::InvalidCredentials
            | Self::WeakPassword { .. }
            | Self::ExistingUser { .. }
            | Self::InvalidCode
            | Self::DeviceNotTrusted
            | Self::InvalidOtp
            | Self::ValidationError(_)
            | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized - token invalid/expired/revoked
            Self::Unauthorized => StatusCode::UNAUTHORIZED,

            // 403 Forbidden - authenticated but not allowed
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found - user-info lookups
            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error - infrastructure failure
            Self::DatabaseError(_)
            | Self::RedisError(_)
            | Self::UpstreamError { .. }
            | Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable - dependency is down
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns `true` if this is a server-side error (5xx).
    ///
    /// Server errors are logged at ERROR level with their cause;
    /// client errors (4xx) at WARN level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::RedisError(_)
                | Self::UpstreamError { .. }
                | Self::InternalError { .. }
                | Self::ServiceUnavailable { .. }
        )
    }
}

// =============================================================================
// Response Structure
// =============================================================================

/// Uniform error envelope body.
///
/// Matches the success envelope shape (`success`, `statusCode`, `message`)
/// with an `error` field carrying the machine-readable code or, for
/// validation failures, the field-level details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Always `false` for errors
    pub success: bool,

    /// HTTP status code, repeated in the body
    pub status_code: u16,

    /// Human-readable message
    pub message: String,

    /// Machine-readable code, or a details object for validation errors
    pub error: serde_json::Value,
}

impl ErrorEnvelope {
    /// Builds the envelope for an `ApiError`.
    ///
    /// Server errors never expose their cause; validation errors include
    /// field-level details; weak-password errors include the feedback list.
    pub fn new(error: &ApiError) -> Self {
        let detail = match error {
            ApiError::ValidationError(errors) => json!({
                "code": error.error_code(),
                "details": errors,
            }),
            ApiError::WeakPassword { feedback } => json!({
                "code": error.error_code(),
                "feedback": feedback,
            }),
            _ => json!(error.error_code()),
        };

        Self {
            success: false,
            status_code: error.status_code().as_u16(),
            message: error.to_string(),
            error: detail,
        }
    }
}

// =============================================================================
// Actix-web Integration
// =============================================================================

/// Implements Actix-web's `ResponseError` trait.
///
/// This allows returning `ApiError` directly from handlers:
///
/// ```rust,ignore
/// async fn handler() -> Result<HttpResponse, ApiError> {
///     Err(ApiError::InvalidCode)
/// }
/// ```
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        // Delegate to our implementation
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_server_error() {
            // The cause stays here; the client sees the opaque envelope
            tracing::error!(error = ?self, code = self.error_code(), "Request failed");
        } else {
            tracing::warn!(code = self.error_code(), "Request rejected");
        }

        HttpResponse::build(self.status_code()).json(ErrorEnvelope::new(self))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_return_400() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCode.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DeviceNotTrusted.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidOtp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::WeakPassword { feedback: vec![] }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ExistingUser { resource: "email".to_string() }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden { message: "nope".to_string() }.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_lookup_errors_return_404() {
        assert_eq!(
            ApiError::NotFound { resource: "user:123".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_server_errors_are_opaque() {
        let err = ApiError::InternalError { message: "pool exhausted".to_string() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        // The client-visible message must not leak the internal one
        assert_eq!(err.to_string(), "Internal server error");

        let upstream = ApiError::UpstreamError {
            service: "user-directory".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(upstream.to_string(), "Internal server error");
    }

    #[test]
    fn test_server_errors_are_flagged() {
        assert!(ApiError::InternalError { message: "x".to_string() }.is_server_error());
        assert!(ApiError::ServiceUnavailable { service: "redis".to_string() }.is_server_error());
        assert!(!ApiError::InvalidCredentials.is_server_error());
        assert!(!ApiError::Unauthorized.is_server_error());
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ErrorEnvelope::new(&ApiError::InvalidCredentials);
        assert!(!envelope.success);
        assert_eq!(envelope.status_code, 400);
        assert_eq!(envelope.error, json!("INVALID_CREDENTIALS"));
    }

    #[test]
    fn test_weak_password_envelope_carries_feedback() {
        let err = ApiError::WeakPassword {
            feedback: vec!["Password must contain at least one digit".to_string()],
        };
        let envelope = ErrorEnvelope::new(&err);
        assert_eq!(envelope.error["code"], "WEAK_PASSWORD");
        assert!(envelope.error["feedback"].is_array());
    }
}
