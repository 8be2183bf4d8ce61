//! # Redis Client - the Ephemeral Store
//!
//! TTL key/value façade over Redis for every transient artifact of the
//! multi-step auth flows.
//!
//! ## What Lives Here
//!
//! | Key pattern | Value | TTL |
//! |-------------|-------|-----|
//! | `register_info:{email}` | pending registration | 1 h |
//! | `email_verification_code:{code}` | registration code | 5 min |
//! | `fingerprint-email-verification:{code}` | device-trust code | 5 min |
//! | `change_password_verification_code:{code}` | reset code | 5 min |
//! | `sso:{token}` | cross-app handoff | 60 s |
//! | `otp_login_session:{token}` | 2FA login gate | 5 min |
//! | `otp_verify_fingerprint_session:{token}` | 2FA trust gate | 5 min |
//! | `wallet_pass_token:{token}` | wallet handoff (written by sibling) | ≤ 5 min |
//!
//! These records are the only legal carriers of "earlier step already
//! verified" state across requests. Consumers treat them as single-use:
//! read, then delete. Writes are atomic at key granularity; nothing here
//! provides cross-key consistency - the state machines re-derive durable
//! state from PostgreSQL on read.
//!
//! ## Connection Management
//!
//! A `ConnectionManager` reconnects automatically on failure. This is more
//! resilient than a bare connection for long-running services.
//!
//! ## Serialization
//!
//! Values are serialized to JSON on write. `get` transparently
//! deserializes, falling back to treating the stored payload as a raw
//! string when it isn't valid JSON (values written by sibling services
//! are not always JSON-encoded).

use crate::config::RedisConfig;
use crate::errors::ApiError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

// =============================================================================
// Redis Client
// =============================================================================

/// Async Redis client with automatic reconnection.
///
/// ## Thread Safety
///
/// The client is `Clone + Send + Sync`. Cloning is cheap (just an Arc
/// clone). Each operation uses an async connection from the manager.
#[derive(Clone)]
pub struct RedisClient {
    /// Connection manager for automatic reconnection
    conn: ConnectionManager,
}

impl RedisClient {
    /// Creates a new Redis client and establishes connection.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::RedisError` if:
    /// - URL is invalid
    /// - Redis server is unreachable
    /// - Authentication fails
    pub async fn new(config: &RedisConfig) -> Result<Self, ApiError> {
        info!(url = %config.url, "Connecting to Redis");

        let client = redis::Client::open(config.url.as_str()).map_err(ApiError::RedisError)?;

        // Connection manager handles reconnection automatically
        let conn = ConnectionManager::new(client)
            .await
            .map_err(ApiError::RedisError)?;

        info!("Redis connection established");

        Ok(Self { conn })
    }

    // =========================================================================
    // Basic Operations
    // =========================================================================

    /// Stores a value with optional TTL.
    ///
    /// The value is serialized to JSON before storage.
    pub async fn set<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ApiError> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                // SET with expiration (SETEX)
                conn.set_ex::<_, _, ()>(key, &serialized, duration.as_secs())
                    .await
                    .map_err(ApiError::RedisError)?;
            }
            None => {
                conn.set::<_, _, ()>(key, &serialized)
                    .await
                    .map_err(ApiError::RedisError)?;
            }
        }

        Ok(())
    }

    /// Retrieves and deserializes a value.
    ///
    /// Payloads that aren't valid JSON fall back to being read as a raw
    /// string (useful when `T` is `String` and the writer stored the value
    /// unencoded).
    ///
    /// ## Returns
    ///
    /// - `Ok(Some(value))` - Key exists and was deserialized
    /// - `Ok(None)` - Key doesn't exist
    /// - `Err(...)` - Redis error, or the payload doesn't fit `T` either way
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        let mut conn = self.conn.clone();

        let value: Option<String> = conn.get(key).await.map_err(ApiError::RedisError)?;

        match value {
            Some(s) => match serde_json::from_str(&s) {
                Ok(deserialized) => Ok(Some(deserialized)),
                // Raw-string fallback: re-wrap the payload as a JSON string
                Err(_) => serde_json::from_value(serde_json::Value::String(s))
                    .map(Some)
                    .map_err(|e| ApiError::InternalError { message: e.to_string() }),
            },
            None => Ok(None),
        }
    }

    /// Deletes a key.
    ///
    /// ## Returns
    ///
    /// - `true` - Key was deleted
    /// - `false` - Key didn't exist
    pub async fn delete(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await.map_err(ApiError::RedisError)?;
        Ok(deleted > 0)
    }

    /// Deletes several keys in one round trip.
    ///
    /// Returns how many of them existed.
    pub async fn delete_many(&self, keys: &[String]) -> Result<i64, ApiError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.del(keys).await.map_err(ApiError::RedisError)
    }

    /// Checks if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(ApiError::RedisError)
    }

    /// Returns the remaining TTL of a key in seconds.
    ///
    /// ## Returns
    ///
    /// - `Some(seconds)` - Key exists and has an expiry
    /// - `None` - Key doesn't exist, or exists without an expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, ApiError> {
        let mut conn = self.conn.clone();
        let ttl: i64 = conn.ttl(key).await.map_err(ApiError::RedisError)?;
        // Redis answers -2 for a missing key and -1 for a key with no expiry
        Ok(if ttl >= 0 { Some(ttl) } else { None })
    }

    /// Increments a counter (atomic operation).
    ///
    /// Creates the key with value 1 if it doesn't exist.
    ///
    /// ## Returns
    ///
    /// The new value after incrementing.
    pub async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.map_err(ApiError::RedisError)
    }

    /// Sets TTL on an existing key.
    ///
    /// ## Returns
    ///
    /// - `true` - TTL was set
    /// - `false` - Key doesn't exist
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as i64)
            .await
            .map_err(ApiError::RedisError)
    }

    /// Health check - verifies Redis is responding.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(ApiError::RedisError)?;
        Ok(())
    }

    // =========================================================================
    // Single-Use Redemption
    // =========================================================================

    /// Reads a value and deletes the key.
    ///
    /// This is the redemption primitive for every one-shot artifact
    /// (verification codes, 2FA gate tokens, SSO tokens). The read and the
    /// delete are two commands; a race between two redemptions may let both
    /// read before either deletes, which the consuming state machines
    /// tolerate because the mutation they guard is idempotent.
    ///
    /// ## Returns
    ///
    /// - `Ok(Some(value))` - Key existed; it is gone now
    /// - `Ok(None)` - Key was absent or already redeemed
    pub async fn take<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.delete(key).await?;
        }
        Ok(value)
    }
}

// Hide internal state in Debug output
impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}
