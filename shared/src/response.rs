//! # Uniform API Response Envelope
//!
//! Every endpoint, success or failure, answers with the same envelope:
//!
//! ```json
//! {
//!   "success": true,
//!   "statusCode": 200,
//!   "message": "Login successful",
//!   "data": { "sessionToken": "..." }
//! }
//! ```
//!
//! Failures use the mirror shape with `success: false` and an `error`
//! field; see [`crate::errors::ErrorEnvelope`]. Handlers build successes
//! through the constructors here so the shape can't drift per endpoint.

use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope for API responses.
///
/// `data` is omitted from the JSON when there is no payload, so
/// message-only responses stay compact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    /// Always `true` for successes
    pub success: bool,

    /// HTTP status code, repeated in the body
    pub status_code: u16,

    /// Human-readable outcome description
    pub message: String,

    /// Operation payload, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> HttpResponse {
        Self::build(StatusCode::OK, message, Some(data))
    }

    /// 201 Created with a payload.
    pub fn created(message: impl Into<String>, data: T) -> HttpResponse {
        Self::build(StatusCode::CREATED, message, Some(data))
    }

    fn build(status: StatusCode, message: impl Into<String>, data: Option<T>) -> HttpResponse {
        HttpResponse::build(status).json(Self {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            data,
        })
    }
}

/// 200 OK with no payload. Free function so callers don't need a type
/// parameter for `()`.
pub fn ok_message(message: impl Into<String>) -> HttpResponse {
    ApiResponse::<serde_json::Value>::build(StatusCode::OK, message, None)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = ApiResponse {
            success: true,
            status_code: 200,
            message: "ok".to_string(),
            data: Some(json!({"value": 1})),
        };

        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["statusCode"], json!(200));
        assert_eq!(body["data"]["value"], json!(1));
    }

    #[test]
    fn test_empty_data_is_omitted() {
        let envelope: ApiResponse<serde_json::Value> = ApiResponse {
            success: true,
            status_code: 200,
            message: "ok".to_string(),
            data: None,
        };

        let body = serde_json::to_value(&envelope).unwrap();
        assert!(body.get("data").is_none());
    }
}
