//! # Service-to-Service Tokens
//!
//! Short-lived JWTs that authenticate sibling services to each other.
//!
//! ## Relationships
//!
//! ```text
//! ┌──────────────┐  mint_user_directory_token()  ┌─────────────────┐
//! │ auth-service │ ────────────────────────────► │ user-directory  │
//! └──────▲───────┘                               └─────────────────┘
//!        │ verify_wallet_token()
//!        │
//! ┌──────┴───────┐
//! │    wallet    │  (create-wallet-session path)
//! └──────────────┘
//! ```
//!
//! Each relationship has its own secret and its own issuer string - the
//! issuer is what selects the family during verification. The `service`
//! claim names the *callee*: tokens we mint for the user-directory carry
//! our name; tokens the wallet mints for us must carry ours too, which is
//! exactly what the verifier checks.
//!
//! ## Validation
//!
//! Inbound tokens are checked for signature, expiry, audience, issuer
//! family, and the exact `service` claim. Any failure collapses to the
//! single `Unauthorized` kind - no detail is disclosed.

use crate::config::ServiceAuthConfig;
use crate::errors::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

// =============================================================================
// Claims
// =============================================================================

/// Claims carried by a service token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// Name of the service this token authenticates *to*
    pub service: String,

    /// Issuer - identifies the minting sibling's family
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time as Unix timestamp
    pub exp: i64,

    /// Issued at time as Unix timestamp
    pub iat: i64,
}

// =============================================================================
// Service
// =============================================================================

/// Mints outbound and verifies inbound inter-service tokens.
///
/// Create once at startup and share via `Arc`.
#[derive(Clone)]
pub struct ServiceTokenService {
    user_directory_encoding: EncodingKey,
    wallet_decoding: DecodingKey,
    config: ServiceAuthConfig,
}

impl ServiceTokenService {
    /// Creates the service from configuration.
    pub fn new(config: ServiceAuthConfig) -> Self {
        let user_directory_encoding =
            EncodingKey::from_secret(config.user_directory_secret.as_bytes());
        let wallet_decoding = DecodingKey::from_secret(config.wallet_secret.as_bytes());

        Self {
            user_directory_encoding,
            wallet_decoding,
            config,
        }
    }

    /// Mints a fresh token for a user-directory call.
    ///
    /// Every outbound directory request mints its own token; they are
    /// cheap and live only minutes, so none is ever cached or reused
    /// across requests.
    pub fn mint_user_directory_token(&self) -> Result<String, ApiError> {
        let now = Utc::now();
        let ttl = Duration::seconds(self.config.token_ttl_seconds as i64);

        let claims = ServiceClaims {
            service: self.config.service_name.clone(),
            iss: self.config.user_directory_issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.user_directory_encoding).map_err(|e| {
            ApiError::InternalError { message: format!("Failed to sign service token: {}", e) }
        })
    }

    /// Verifies an inbound token minted by the wallet service.
    ///
    /// Checks signature, expiry, audience, the wallet issuer family, and
    /// that the `service` claim names this service exactly.
    pub fn verify_wallet_token(&self, token: &str) -> Result<ServiceClaims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.wallet_issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data: TokenData<ServiceClaims> =
            decode(token, &self.wallet_decoding, &validation).map_err(|_| ApiError::Unauthorized)?;

        // The wallet must have addressed this token to us by name
        if token_data.claims.service != self.config.service_name {
            return Err(ApiError::Unauthorized);
        }

        Ok(token_data.claims)
    }
}

// Implement Debug manually to avoid exposing keys
impl std::fmt::Debug for ServiceTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenService").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServiceAuthConfig {
        ServiceAuthConfig {
            service_name: "auth-service".to_string(),
            audience: "test-services".to_string(),
            token_ttl_seconds: 300,
            user_directory_secret: "user_directory_secret_32_chars_min_x".to_string(),
            user_directory_issuer: "test-auth-service".to_string(),
            wallet_secret: "wallet_secret_minimum_32_characters_x".to_string(),
            wallet_issuer: "test-wallet-service".to_string(),
        }
    }

    /// Builds a token the way the wallet sibling would.
    fn mint_wallet_token(config: &ServiceAuthConfig, service: &str, issuer: &str) -> String {
        let now = Utc::now();
        let claims = ServiceClaims {
            service: service.to_string(),
            iss: issuer.to_string(),
            aud: config.audience.clone(),
            exp: (now + Duration::seconds(300)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.wallet_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_outbound_token_carries_our_name() {
        let config = test_config();
        let service = ServiceTokenService::new(config.clone());

        let token = service.mint_user_directory_token().unwrap();

        // Decode with the directory's side of the secret to inspect claims
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.user_directory_issuer]);
        validation.set_audience(&[&config.audience]);
        let decoded: TokenData<ServiceClaims> = decode(
            &token,
            &DecodingKey::from_secret(config.user_directory_secret.as_bytes()),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.service, "auth-service");
    }

    #[test]
    fn test_valid_wallet_token_verifies() {
        let config = test_config();
        let service = ServiceTokenService::new(config.clone());

        let token = mint_wallet_token(&config, "auth-service", &config.wallet_issuer);
        let claims = service.verify_wallet_token(&token).unwrap();
        assert_eq!(claims.service, "auth-service");
    }

    #[test]
    fn test_wrong_service_claim_rejected() {
        let config = test_config();
        let service = ServiceTokenService::new(config.clone());

        // Token addressed to some other sibling must not pass here
        let token = mint_wallet_token(&config, "payments-service", &config.wallet_issuer);
        assert!(matches!(service.verify_wallet_token(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let config = test_config();
        let service = ServiceTokenService::new(config.clone());

        let token = mint_wallet_token(&config, "auth-service", "unknown-issuer");
        assert!(matches!(service.verify_wallet_token(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_outbound_token_does_not_verify_inbound() {
        let config = test_config();
        let service = ServiceTokenService::new(config);

        // Different secret family entirely
        let token = service.mint_user_directory_token().unwrap();
        assert!(matches!(service.verify_wallet_token(&token), Err(ApiError::Unauthorized)));
    }
}
