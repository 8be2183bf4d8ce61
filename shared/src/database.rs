//! # PostgreSQL Connection Pool
//!
//! Pool construction and health reporting for the collections this
//! service owns (`sessions`, `device_fingerprints`, `otps`).
//!
//! ## Why a Pool?
//!
//! Opening a PostgreSQL connection takes tens of milliseconds. A pool
//! keeps warm connections ready and bounds how many the service can hold,
//! protecting the database from connection storms.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Connection Pool                              │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  Handlers ──► acquire() ──► ┌──────────────────────┐              │
//! │                             │ min..max connections │ ──► Postgres │
//! │  Handlers ──► acquire() ──► └──────────────────────┘              │
//! │                                                                   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every pooled connection announces itself as `auth-service` via
//! `application_name`, so `pg_stat_activity` attributes session and
//! fingerprint traffic to this service rather than to an anonymous
//! client.
//!
//! `PgPool` is `Arc`-based internally: clone it freely, share it across
//! workers, never wrap it in another lock.

use crate::config::DatabaseConfig;
use crate::errors::ApiError;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::info;

/// `application_name` stamped on every pooled connection.
const APPLICATION_NAME: &str = "auth-service";

// =============================================================================
// Pool Creation
// =============================================================================

/// Creates a PostgreSQL connection pool from configuration.
///
/// ## Errors
///
/// Returns `ApiError::DatabaseError` if:
/// - Connection URL is invalid
/// - Database is unreachable
/// - Authentication fails
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, ApiError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_seconds = config.connect_timeout_seconds,
        max_lifetime_seconds = config.max_lifetime_seconds,
        "Creating database connection pool"
    );

    let connect_options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid database URL");
            ApiError::DatabaseError(e)
        })?
        .application_name(APPLICATION_NAME);

    let pool = PgPoolOptions::new()
        // Bound the pool from both ends
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        // How long to wait for a connection before timing out
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        // Recycle connections after this time (prevents stale connections)
        .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
        // Verify connection is valid before handing it out
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create database pool");
            ApiError::DatabaseError(e)
        })?;

    info!("Database connection pool created successfully");

    Ok(pool)
}

// =============================================================================
// Health Check
// =============================================================================

/// Snapshot of pool state, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    /// Round-trip time of the probe query, in milliseconds
    pub latency_ms: u64,
    /// Connections currently held by the pool
    pub connections: u32,
    /// How many of those are idle
    pub idle: usize,
}

/// Verifies database connectivity and reports pool state.
///
/// Runs a probe query through the pool (which also exercises
/// `test_before_acquire`) and measures its round trip. Used by
/// `/auth/healthz`.
///
/// ## Errors
///
/// Returns `ApiError::DatabaseError` if the probe fails.
pub async fn health_check(pool: &PgPool) -> Result<PoolHealth, ApiError> {
    let started = Instant::now();

    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(PoolHealth {
        latency_ms: started.elapsed().as_millis() as u64,
        connections: pool.size(),
        idle: pool.num_idle(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_health_serializes() {
        let health = PoolHealth { latency_ms: 3, connections: 5, idle: 4 };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["latency_ms"], 3);
        assert_eq!(json["connections"], 5);
        assert_eq!(json["idle"], 4);
    }

    #[test]
    fn test_connect_options_reject_garbage_url() {
        assert!(PgConnectOptions::from_str("not-a-postgres-url").is_err());
    }
}
