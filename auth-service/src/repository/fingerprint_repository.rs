//! # Device Fingerprint Repository
//!
//! Data access for the `device_fingerprints` collection.
//!
//! ## Uniqueness
//!
//! `(user_id, fingerprint_hash)` identifies at most one record, enforced
//! by a unique index. Creation is an upsert so two concurrent first
//! logins from the same new device converge on one row and both callers
//! get the same id back.
//!
//! ## Trust Flips
//!
//! The trust flag only moves through explicit flips:
//!
//! ```text
//! upsert(untrusted) ──► is_trusted stays as-is when the row exists
//! upsert(trusted)   ──► is_trusted becomes TRUE (wallet path is authoritative)
//! set_trusted       ──► TRUE  (email-OTP / TOTP proof)
//! set_untrusted     ──► FALSE (revocation; session fan-out is the caller's job)
//! ```

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DeviceFingerprint, NewDeviceFingerprint};

/// Repository for device fingerprint records.
#[derive(Debug, Clone)]
pub struct FingerprintRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl FingerprintRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds the record for `(user_id, fingerprint_hash)`, trusted or not.
    pub async fn find_by_user_and_hash(
        &self,
        user_id: Uuid,
        fingerprint_hash: &str,
    ) -> Result<Option<DeviceFingerprint>, ApiError> {
        let fingerprint = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            SELECT * FROM device_fingerprints
            WHERE user_id = $1 AND fingerprint_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(fingerprint_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprint)
    }

    /// Finds a record by id, scoped to its owner.
    pub async fn find_by_id_for_user(
        &self,
        fingerprint_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DeviceFingerprint>, ApiError> {
        let fingerprint = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            SELECT * FROM device_fingerprints
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(fingerprint_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprint)
    }

    /// Inserts or returns the existing record for the device.
    ///
    /// Idempotent on `(user_id, fingerprint_hash)`: repeated calls yield
    /// the same row id. An existing record's trust is never downgraded -
    /// `is_trusted OR EXCLUDED.is_trusted` lets the born-trusted wallet
    /// path promote a row while untrusted creation leaves it alone.
    pub async fn upsert(&self, new: NewDeviceFingerprint) -> Result<DeviceFingerprint, ApiError> {
        let fingerprint = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            INSERT INTO device_fingerprints (
                user_id, fingerprint_hash, browser, device, is_trusted
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, fingerprint_hash) DO UPDATE
            SET is_trusted = device_fingerprints.is_trusted OR EXCLUDED.is_trusted,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.fingerprint_hash)
        .bind(&new.browser)
        .bind(&new.device)
        .bind(new.is_trusted)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprint)
    }

    /// Flips a record to trusted after a successful challenge.
    ///
    /// Returns the updated record, or `None` when the id doesn't exist.
    pub async fn set_trusted(&self, fingerprint_id: Uuid) -> Result<Option<DeviceFingerprint>, ApiError> {
        let fingerprint = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            UPDATE device_fingerprints
            SET is_trusted = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(fingerprint_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprint)
    }

    /// Revokes trust. Idempotent: an already-untrusted record matches and
    /// simply stays untrusted.
    ///
    /// Scoped to the owner so one user can't revoke another's device.
    pub async fn set_untrusted(
        &self,
        fingerprint_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DeviceFingerprint>, ApiError> {
        let fingerprint = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            UPDATE device_fingerprints
            SET is_trusted = FALSE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(fingerprint_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprint)
    }

    /// Lists a user's trusted devices.
    pub async fn list_trusted(&self, user_id: Uuid) -> Result<Vec<DeviceFingerprint>, ApiError> {
        let fingerprints = sqlx::query_as::<_, DeviceFingerprint>(
            r#"
            SELECT * FROM device_fingerprints
            WHERE user_id = $1 AND is_trusted = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(fingerprints)
    }
}
