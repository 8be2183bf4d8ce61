//! # OTP Config Repository
//!
//! Data access for the `otps` collection: one TOTP configuration per
//! user, enforced by the unique index on `user_id`.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::OtpConfigRecord;

/// Repository for per-user TOTP configuration.
#[derive(Debug, Clone)]
pub struct OtpRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl OtpRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a user's TOTP configuration, if any.
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<OtpConfigRecord>, ApiError> {
        let config = sqlx::query_as::<_, OtpConfigRecord>(
            r#"
            SELECT * FROM otps
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(config)
    }

    /// Creates a disabled configuration holding the encrypted secret.
    ///
    /// A second setup attempt trips the unique index and comes back as
    /// `Forbidden` - provisioning twice would silently invalidate the
    /// authenticator the user already scanned.
    pub async fn create(
        &self,
        user_id: Uuid,
        otp_secret_encrypted: &str,
    ) -> Result<OtpConfigRecord, ApiError> {
        let config = sqlx::query_as::<_, OtpConfigRecord>(
            r#"
            INSERT INTO otps (user_id, otp_secret_encrypted, otp_enable)
            VALUES ($1, $2, FALSE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(otp_secret_encrypted)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("otps_user_id_key")
                    || db_err.constraint() == Some("otps_pkey")
                {
                    return ApiError::Forbidden {
                        message: "OTP already set up".to_string(),
                    };
                }
            }
            ApiError::DatabaseError(e)
        })?;

        Ok(config)
    }

    /// Flips the enable flag. The secret is left untouched either way.
    ///
    /// Returns the updated record, or `None` when the user has no
    /// configuration.
    pub async fn set_enabled(
        &self,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<Option<OtpConfigRecord>, ApiError> {
        let config = sqlx::query_as::<_, OtpConfigRecord>(
            r#"
            UPDATE otps
            SET otp_enable = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(config)
    }
}
