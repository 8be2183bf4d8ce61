//! # User Directory Client
//!
//! HTTP client for the user-profile service. This service never stores
//! users itself - every lookup, creation, and narrow update goes through
//! here.
//!
//! ## Request Shape
//!
//! Every call carries:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Authorization` | `Bearer <service JWT>` - minted fresh per request |
//! | `User-Agent` | `Auth-Service/1.0` |
//! | `Content-Type` | `application/json` |
//!
//! ## Remote Contract
//!
//! The directory answers with `{ok, data?, message?}`:
//!
//! - `ok = true` - `data` holds the payload
//! - `ok = false` - absence or remote-side rejection; `message` says why
//!
//! Transport failures and 5xx responses are infrastructure problems and
//! map to the `ServerError` class; `ok = false` maps to domain results
//! (`None`, `false`, or a domain error) so callers never see the wire.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use shared::auth::ServiceTokenService;
use shared::config::ServicesConfig;
use shared::errors::ApiError;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{DirectoryUser, DirectoryUserWithPassword, NewDirectoryUser};

/// User-Agent presented on every directory call.
const USER_AGENT: &str = "Auth-Service/1.0";

// =============================================================================
// Remote Envelope
// =============================================================================

/// The `{ok, data?, message?}` wrapper the directory answers with.
#[derive(Debug, serde::Deserialize)]
struct RemoteEnvelope<T> {
    ok: bool,
    data: Option<T>,
    message: Option<String>,
}

impl<T> RemoteEnvelope<T> {
    /// `ok = false` means absence, whatever the body carried.
    fn into_data(self) -> Option<T> {
        if self.ok {
            self.data
        } else {
            None
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the user-directory service.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct UserDirectoryClient {
    http: reqwest::Client,
    base_url: String,
    service_tokens: Arc<ServiceTokenService>,
}

impl UserDirectoryClient {
    /// Builds the client from configuration.
    pub fn new(
        config: &ServicesConfig,
        service_tokens: Arc<ServiceTokenService>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::InternalError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.user_directory_base_url.trim_end_matches('/').to_string(),
            service_tokens,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Whether a user with this email or username exists.
    pub async fn check_exists(&self, email_or_username: &str) -> Result<bool, ApiError> {
        let envelope: RemoteEnvelope<serde_json::Value> = self
            .get(&format!("/internal/users/exists/{}", email_or_username))
            .await?;

        Ok(envelope.ok)
    }

    /// Looks up a user by email or username.
    pub async fn get_by_email_or_username(
        &self,
        email_or_username: &str,
    ) -> Result<Option<DirectoryUser>, ApiError> {
        let envelope: RemoteEnvelope<DirectoryUser> = self
            .get(&format!("/internal/users/by-identifier/{}", email_or_username))
            .await?;

        Ok(envelope.into_data())
    }

    /// Looks up a user by id.
    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<DirectoryUser>, ApiError> {
        let envelope: RemoteEnvelope<DirectoryUser> =
            self.get(&format!("/internal/users/{}", user_id)).await?;

        Ok(envelope.into_data())
    }

    /// Looks up a user with their password hash, by id.
    pub async fn get_with_password_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DirectoryUserWithPassword>, ApiError> {
        let envelope: RemoteEnvelope<DirectoryUserWithPassword> = self
            .get(&format!("/internal/users/{}/with-password", user_id))
            .await?;

        Ok(envelope.into_data())
    }

    /// Looks up a user with their password hash, by email or username.
    ///
    /// This is the login lookup.
    pub async fn get_with_password_by_email_or_username(
        &self,
        email_or_username: &str,
    ) -> Result<Option<DirectoryUserWithPassword>, ApiError> {
        let envelope: RemoteEnvelope<DirectoryUserWithPassword> = self
            .get(&format!(
                "/internal/users/by-identifier/{}/with-password",
                email_or_username
            ))
            .await?;

        Ok(envelope.into_data())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates a user.
    ///
    /// An `ok = false` answer means the directory rejected the creation -
    /// in practice an identifier collided since the pre-checks passed -
    /// and maps to `ExistingUser`.
    pub async fn create(&self, new_user: &NewDirectoryUser) -> Result<DirectoryUser, ApiError> {
        let envelope: RemoteEnvelope<DirectoryUser> =
            self.post("/internal/users", new_user).await?;

        if !envelope.ok {
            return Err(ApiError::ExistingUser {
                resource: envelope.message.unwrap_or_else(|| "user".to_string()),
            });
        }

        envelope.data.ok_or_else(|| ApiError::UpstreamError {
            service: "user-directory".to_string(),
            message: "create answered ok without data".to_string(),
        })
    }

    /// Replaces a user's password hash.
    pub async fn change_password(&self, user_id: Uuid, new_hash: &str) -> Result<(), ApiError> {
        let envelope: RemoteEnvelope<serde_json::Value> = self
            .post(
                &format!("/internal/users/{}/password", user_id),
                &json!({ "passwordHashed": new_hash }),
            )
            .await?;

        if !envelope.ok {
            return Err(ApiError::NotFound { resource: format!("user:{}", user_id) });
        }

        Ok(())
    }

    /// Stamps a successful login on the user record.
    pub async fn update_last_login(&self, user_id: Uuid) -> Result<(), ApiError> {
        let envelope: RemoteEnvelope<serde_json::Value> = self
            .post(&format!("/internal/users/{}/last-login", user_id), &json!({}))
            .await?;

        if !envelope.ok {
            return Err(ApiError::NotFound { resource: format!("user:{}", user_id) });
        }

        Ok(())
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<RemoteEnvelope<T>, ApiError> {
        let token = self.service_tokens.mint_user_directory_token()?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport_error(path, e))?;

        Self::read_envelope(path, response).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RemoteEnvelope<T>, ApiError> {
        let token = self.service_tokens.mint_user_directory_token()?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::transport_error(path, e))?;

        Self::read_envelope(path, response).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<RemoteEnvelope<T>, ApiError> {
        let status = response.status();

        // 5xx means the directory itself is in trouble; nothing in the
        // body is trustworthy at that point
        if status.is_server_error() {
            return Err(ApiError::UpstreamError {
                service: "user-directory".to_string(),
                message: format!("{} answered {}", path, status),
            });
        }

        // 404s from the routing layer arrive without an envelope
        if status == StatusCode::NOT_FOUND {
            return Ok(RemoteEnvelope { ok: false, data: None, message: None });
        }

        response.json().await.map_err(|e| ApiError::UpstreamError {
            service: "user-directory".to_string(),
            message: format!("{} returned an unreadable body: {}", path, e),
        })
    }

    fn transport_error(path: &str, e: reqwest::Error) -> ApiError {
        ApiError::UpstreamError {
            service: "user-directory".to_string(),
            message: format!("{} transport failure: {}", path, e),
        }
    }
}

impl std::fmt::Debug for UserDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectoryClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::ServiceAuthConfig;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> UserDirectoryClient {
        let service_tokens = Arc::new(ServiceTokenService::new(ServiceAuthConfig {
            service_name: "auth-service".to_string(),
            audience: "test-services".to_string(),
            token_ttl_seconds: 300,
            user_directory_secret: "user_directory_secret_32_chars_min_x".to_string(),
            user_directory_issuer: "test-auth-service".to_string(),
            wallet_secret: "wallet_secret_minimum_32_characters_x".to_string(),
            wallet_issuer: "test-wallet-service".to_string(),
        }));

        UserDirectoryClient::new(
            &ServicesConfig {
                user_directory_base_url: base_url.to_string(),
                wallet_user_agent: "Decode-Wallet/1.0".to_string(),
                request_timeout_seconds: 5,
            },
            service_tokens,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_check_exists_true_and_false() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/internal/users/exists/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/internal/users/exists/nobody"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "message": "not found"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.check_exists("alice").await.unwrap());
        assert!(!client.check_exists("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_requests_are_service_authenticated() {
        let server = MockServer::start().await;

        // The mock only matches when the service headers are present
        Mock::given(method("GET"))
            .and(path("/internal/users/exists/alice"))
            .and(header_exists("authorization"))
            .and(header("user-agent", "Auth-Service/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.check_exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_lookup_parses_user_with_password() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/internal/users/by-identifier/alice/with-password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "data": {
                    "userId": "550e8400-e29b-41d4-a716-446655440000",
                    "email": "a@x",
                    "username": "alice",
                    "role": "user",
                    "passwordHashed": "$2b$12$abcdefghijklmnopqrstuv"
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let found = client
            .get_with_password_by_email_or_username("alice")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.user.username, "alice");
        assert!(found.password_hashed.starts_with("$2b$"));
    }

    #[tokio::test]
    async fn test_absence_maps_to_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/internal/users/by-identifier/ghost"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "message": "no such user"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.get_by_email_or_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_5xx_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/internal/users/exists/alice"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.check_exists("alice").await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamError { .. }));
    }

    #[tokio::test]
    async fn test_create_rejection_is_existing_user() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/internal/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "message": "email"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .create(&NewDirectoryUser {
                username: "alice".to_string(),
                email: "a@x".to_string(),
                password_hashed: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ExistingUser { .. }));
    }
}
