//! # Token Codec
//!
//! Signs and verifies the two user-facing token kinds.
//!
//! ## Token Kinds
//!
//! | Kind | Claims | Lifetime | Bound to |
//! |------|--------|----------|----------|
//! | Access | `{sub, session_token}` | 1 day | an active session record |
//! | Session | `{sub}` | 30 days | the `sessions` collection row |
//!
//! (Service-to-service tokens have their own codec in
//! [`service_token`](crate::auth::service_token); SSO handoff tokens are
//! opaque strings that live only in the ephemeral store.)
//!
//! ## Binding Model
//!
//! ```text
//! ┌──────────────────┐      session_token claim      ┌─────────────────┐
//! │   Access token   │ ────────────────────────────► │  sessions row   │
//! │  (JWT, 1 day)    │                               │  is_active=true │
//! └──────────────────┘                               └────────▲────────┘
//!                                                             │
//! ┌──────────────────┐        stored verbatim                 │
//! │  Session token   │ ───────────────────────────────────────┘
//! │  (JWT, 30 days)  │   rotation replaces it in place
//! └──────────────────┘
//! ```
//!
//! An access token is only as alive as the session it names: the session
//! manager re-checks the record on every validation. A session token is
//! itself the rotation unit - refreshing mints a new one and overwrites
//! the stored value atomically.
//!
//! ## Security Notes
//!
//! - **HS256** signing; each kind has its own secret
//! - Validated for: signature, expiration, issuer, audience
//! - Every failure surfaces as the single `Unauthorized` kind - callers
//!   (and therefore clients) cannot tell which check failed
//! - The `jti` claim makes every minted token unique, which is what keeps
//!   `session_token` unique across all sessions, past and present

use crate::config::JwtConfig;
use crate::errors::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Claims
// =============================================================================

/// Claims carried by an access token.
///
/// The `session_token` claim binds the access token to exactly one
/// session record; validation loads that record and rejects the token
/// when the session is missing, expired, or revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - the user's unique identifier
    pub sub: Uuid,

    /// The session token this access token is bound to
    pub session_token: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time as Unix timestamp
    pub exp: i64,

    /// Issued at time as Unix timestamp
    pub iat: i64,

    /// Unique token id
    pub jti: Uuid,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - the user's unique identifier
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time as Unix timestamp
    pub exp: i64,

    /// Issued at time as Unix timestamp
    pub iat: i64,

    /// Unique token id - this is what makes every minted session token
    /// distinct, even for the same user in the same second
    pub jti: Uuid,
}

// =============================================================================
// Codec
// =============================================================================

/// Signs and verifies access and session tokens.
///
/// Create once at startup and share via `Arc`; the keys are immutable
/// after construction.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    config: JwtConfig,
}

impl TokenCodec {
    /// Creates a codec from the JWT configuration.
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let session_encoding = EncodingKey::from_secret(config.session_secret.as_bytes());
        let session_decoding = DecodingKey::from_secret(config.session_secret.as_bytes());

        Self {
            access_encoding,
            access_decoding,
            session_encoding,
            session_decoding,
            config,
        }
    }

    /// Mints an access token bound to `session_token`.
    pub fn sign_access(&self, user_id: Uuid, session_token: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let ttl = Duration::seconds(self.config.access_token_ttl_seconds as i64);

        let claims = AccessClaims {
            sub: user_id,
            session_token: session_token.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.access_encoding).map_err(|e| {
            ApiError::InternalError { message: format!("Failed to sign access token: {}", e) }
        })
    }

    /// Mints a session token for `user_id`.
    pub fn sign_session(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now();
        let ttl = Duration::seconds(self.config.session_token_ttl_seconds as i64);

        let claims = SessionClaims {
            sub: user_id,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.session_encoding).map_err(|e| {
            ApiError::InternalError { message: format!("Failed to sign session token: {}", e) }
        })
    }

    /// Verifies an access token's signature, expiry, issuer, and audience.
    ///
    /// This is only the cryptographic half of access validation - the
    /// session manager still checks the bound session record.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, ApiError> {
        self.decode_token(token, &self.access_decoding)
    }

    /// Verifies a session token's signature, expiry, issuer, and audience.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, ApiError> {
        self.decode_token(token, &self.session_decoding)
    }

    /// Shared decode path. Any failure - bad signature, expiry, wrong
    /// issuer or audience, malformed token - collapses to `Unauthorized`.
    fn decode_token<C: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<C, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data: TokenData<C> =
            decode(token, key, &validation).map_err(|_| ApiError::Unauthorized)?;

        Ok(token_data.claims)
    }

    /// Extracts the token from an Authorization header.
    ///
    /// Expects the format: `Bearer <token>`
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header
            .strip_prefix("Bearer ")
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)
    }
}

// Implement Debug manually to avoid exposing keys
impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a test configuration with valid parameters.
    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access_secret_key_minimum_32_chars_ok".to_string(),
            session_secret: "session_secret_key_minimum_32_chars_x".to_string(),
            access_token_ttl_seconds: 86_400,
            session_token_ttl_seconds: 2_592_000,
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let codec = TokenCodec::new(test_config());
        let user_id = Uuid::new_v4();

        let session_token = codec.sign_session(user_id).unwrap();
        let access_token = codec.sign_access(user_id, &session_token).unwrap();

        let claims = codec.verify_access(&access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.session_token, session_token);
    }

    #[test]
    fn test_session_token_roundtrip() {
        let codec = TokenCodec::new(test_config());
        let user_id = Uuid::new_v4();

        let token = codec.sign_session(user_id).unwrap();
        let claims = codec.verify_session(&token).unwrap();

        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let codec = TokenCodec::new(test_config());
        let user_id = Uuid::new_v4();

        // Same user, same instant - jti still separates them
        let t1 = codec.sign_session(user_id).unwrap();
        let t2 = codec.sign_session(user_id).unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_kinds_do_not_cross_verify() {
        let codec = TokenCodec::new(test_config());
        let user_id = Uuid::new_v4();

        let session_token = codec.sign_session(user_id).unwrap();
        let access_token = codec.sign_access(user_id, &session_token).unwrap();

        // Signed with different secrets, so each fails the other's check
        assert!(matches!(codec.verify_access(&session_token), Err(ApiError::Unauthorized)));
        assert!(matches!(codec.verify_session(&access_token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_tampered_token_is_unauthorized() {
        let codec = TokenCodec::new(test_config());
        let token = codec.sign_session(Uuid::new_v4()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');

        assert!(matches!(codec.verify_session(&tampered), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_wrong_audience_is_unauthorized() {
        let codec = TokenCodec::new(test_config());

        let mut other_config = test_config();
        other_config.audience = "someone-else".to_string();
        let other_codec = TokenCodec::new(other_config);

        let token = other_codec.sign_session(Uuid::new_v4()).unwrap();
        assert!(matches!(codec.verify_session(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_extract_from_header() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {}", token);

        assert_eq!(TokenCodec::extract_from_header(&header).unwrap(), token);
        assert!(TokenCodec::extract_from_header("Basic dXNlcjpwYXNz").is_err());
        assert!(TokenCodec::extract_from_header("Bearer ").is_err());
    }
}
