//! # Request Validation Helpers
//!
//! Utilities for validating incoming request data using the `validator`
//! crate. Every handler performs one explicit decode + validate step and
//! rejects at the boundary; nothing past the DTO layer re-validates shape.
//!
//! ## How Validation Works
//!
//! We use the [`validator`](https://docs.rs/validator/) crate which provides
//! derive macros for declarative validation:
//!
//! ```rust,ignore
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct LoginRequest {
//!     #[validate(length(min = 3, max = 255))]
//!     email_or_username: String,
//!
//!     #[validate(length(min = 1))]
//!     password: String,
//! }
//! ```
//!
//! ## Validation Flow
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ JSON Request │────►│ Deserialize   │────►│   Validate   │
//! │              │     │ (serde)       │     │  (validator) │
//! └──────────────┘     └───────────────┘     └──────┬───────┘
//!                                                   │
//!         ┌─────────────────────────────────────────┴───────┐
//!         │                                                 │
//!         ▼                                                 ▼
//! ┌───────────────┐                               ┌─────────────────┐
//! │   Success     │                               │ ValidationError │
//! │ (continue)    │                               │  (400 + details)│
//! └───────────────┘                               └─────────────────┘
//! ```
//!
//! ## Custom Validators
//!
//! | Validator | Purpose |
//! |-----------|---------|
//! | `not_blank` | String is not empty after trimming |
//! | `valid_username` | Letters, digits, `_`, `-`; 3-32 chars |
//! | `valid_verification_code` | 6 chars from the URL-safe code alphabet |
//! | `valid_otp_digits` | Exactly six ASCII digits |

use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use validator::Validate;

// =============================================================================
// Core Validation Functions
// =============================================================================

/// Validates a request DTO that implements `Validate`.
///
/// This is the primary validation function. Use it in handlers to
/// validate incoming data.
///
/// ## Errors
///
/// Returns `ApiError::ValidationError` with field-level details if
/// validation fails.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::ValidationError)
}

/// Parses JSON string and validates in a single step.
///
/// Useful when you have raw JSON and need to parse + validate.
///
/// ## Errors
///
/// - `ApiError::BadRequest` if JSON parsing fails
/// - `ApiError::ValidationError` if validation fails
pub fn parse_and_validate<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ApiError> {
    let data: T =
        serde_json::from_str(json).map_err(|e| ApiError::BadRequest { message: e.to_string() })?;

    validate_request(&data)?;

    Ok(data)
}

// =============================================================================
// Custom Validators
// =============================================================================

/// Custom validation functions for use with `#[validate(custom)]`.
///
/// These functions follow the validator crate's signature:
/// `fn(&str) -> Result<(), ValidationError>`
pub mod validators {
    use validator::ValidationError;

    /// Validates that a string is not blank (empty or whitespace-only).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }

    /// Validates a username.
    ///
    /// ## Rules
    ///
    /// - 3 to 32 characters
    /// - Letters, digits, underscore, hyphen
    /// - Must start with a letter or digit
    pub fn valid_username(value: &str) -> Result<(), ValidationError> {
        if value.len() < 3 || value.len() > 32 {
            return Err(ValidationError::new("invalid_username"));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::new("invalid_username"));
        }

        if value.starts_with('_') || value.starts_with('-') {
            return Err(ValidationError::new("invalid_username"));
        }

        Ok(())
    }

    /// Validates a 6-character verification code.
    ///
    /// Codes are drawn from the URL-safe alphabet
    /// (`A-Z a-z 0-9 - _`), so anything else is rejected before it
    /// reaches the cache lookup.
    pub fn valid_verification_code(value: &str) -> Result<(), ValidationError> {
        if value.len() != 6 {
            return Err(ValidationError::new("invalid_code"));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::new("invalid_code"));
        }

        Ok(())
    }

    /// Validates a six-digit one-time password.
    pub fn valid_otp_digits(value: &str) -> Result<(), ValidationError> {
        if value.len() != 6 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new("invalid_otp"));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("  hello  ").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
    }

    #[test]
    fn test_valid_username() {
        assert!(valid_username("alice").is_ok());
        assert!(valid_username("alice_01").is_ok());
        assert!(valid_username("a-b-c").is_ok());
        assert!(valid_username("ab").is_err()); // too short
        assert!(valid_username("_alice").is_err()); // leading underscore
        assert!(valid_username("alice!").is_err()); // bad character
    }

    #[test]
    fn test_valid_verification_code() {
        assert!(valid_verification_code("aB3-_9").is_ok());
        assert!(valid_verification_code("abc12").is_err()); // too short
        assert!(valid_verification_code("abc1234").is_err()); // too long
        assert!(valid_verification_code("abc !2").is_err()); // bad character
    }

    #[test]
    fn test_valid_otp_digits() {
        assert!(valid_otp_digits("123456").is_ok());
        assert!(valid_otp_digits("12345").is_err());
        assert!(valid_otp_digits("12345a").is_err());
    }
}
