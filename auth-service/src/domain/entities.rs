//! # Auth Domain Entities
//!
//! Persistent business objects for session and device-trust management,
//! plus the remote representations exchanged with the user-directory
//! service.
//!
//! ## Entity Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Entities                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  user-directory service (remote)                                        │
//! │  ┌─────────────────────┐                                                │
//! │  │   DirectoryUser     │   read-mostly; this service never stores it    │
//! │  └─────────┬───────────┘                                                │
//! │            │ user_id                                                    │
//! │            ▼                                                            │
//! │  ┌─────────────────────┐  1:N   ┌─────────────────────┐                 │
//! │  │ DeviceFingerprint   │───────▶│      Session        │                 │
//! │  ├─────────────────────┤        ├─────────────────────┤                 │
//! │  │ - id (PK)           │        │ - id (PK)           │                 │
//! │  │ - user_id           │        │ - user_id           │                 │
//! │  │ - fingerprint_hash  │        │ - device_fp_id (FK) │                 │
//! │  │ - is_trusted        │        │ - session_token (U) │                 │
//! │  └─────────────────────┘        │ - is_active         │                 │
//! │                                 │ - revoked_at        │                 │
//! │  ┌─────────────────────┐        └─────────────────────┘                 │
//! │  │  OtpConfigRecord    │  at most one per user                          │
//! │  └─────────────────────┘                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machines
//!
//! - `DeviceFingerprint`: `Untrusted → Trusted` (email-OTP or TOTP proof,
//!   or born trusted on the wallet path); `Trusted → Untrusted` is
//!   revocation and fans out to every bound session. Records are never
//!   destroyed - revocation only flips the flag.
//! - `Session`: `Active → Rotated` (still active under the new token),
//!   `Active → Revoked`, `Active → Expired`. `Revoked` and `Expired` are
//!   terminal.
//!
//! ## Security Considerations
//!
//! - **Never expose `password_hashed`**: the `WithPassword` projection
//!   exists only for the login compare and never leaves the service layer
//! - **Fingerprints are opaque**: this service stores the client-supplied
//!   hash and never reconstructs device attributes from it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// SESSION
// =============================================================================

/// A session record as stored in the `sessions` collection.
///
/// ## Invariants
///
/// - `session_token` is unique across all sessions, past and present
/// - active ⇔ `is_active = true ∧ revoked_at IS NULL ∧ expires_at > now`
/// - rotation replaces `session_token` in place and bumps `last_used_at`
/// - revocation sets `is_active = false, revoked_at = now` and is
///   irreversible
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (UUID v4)
    pub id: Uuid,
    /// Owner of the session
    pub user_id: Uuid,
    /// Device fingerprint this session is bound to
    pub device_fingerprint_id: Uuid,
    /// Long-lived rotating bearer credential (signed JWT, stored verbatim)
    pub session_token: String,
    /// Application label ("decode", "decode by wallet", sibling app names)
    pub app: String,
    /// Hard expiry; validation rejects past this even while `is_active`
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Bumped on rotation
    pub last_used_at: DateTime<Utc>,
    /// Cleared exactly once, by revocation
    pub is_active: bool,
    /// Revocation timestamp (null while active)
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Data required to insert a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owner of the session
    pub user_id: Uuid,
    /// Device fingerprint to bind to
    pub device_fingerprint_id: Uuid,
    /// Freshly minted session token
    pub session_token: String,
    /// Application label
    pub app: String,
    /// `now + session_lifetime`
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// DEVICE FINGERPRINT
// =============================================================================

/// A device-trust record as stored in `device_fingerprints`.
///
/// `(user_id, fingerprint_hash)` identifies at most one record; creation
/// is an upsert so repeated logins from the same new device converge on
/// one row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    /// Unique identifier (UUID v4)
    pub id: Uuid,
    /// Owner of the device
    pub user_id: Uuid,
    /// Opaque client-supplied hash of device attributes
    pub fingerprint_hash: String,
    /// Browser name reported at first sighting
    pub browser: String,
    /// Device name reported at first sighting
    pub device: String,
    /// Trust flag; flipping it is the only lifecycle transition
    pub is_trusted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last trust-state change
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a fingerprint.
#[derive(Debug, Clone)]
pub struct NewDeviceFingerprint {
    /// Owner of the device
    pub user_id: Uuid,
    /// Opaque client-supplied hash
    pub fingerprint_hash: String,
    /// Browser name
    pub browser: String,
    /// Device name
    pub device: String,
    /// Whether the record is born trusted (wallet path) or not (login)
    pub is_trusted: bool,
}

/// A trusted fingerprint annotated with its currently active sessions.
///
/// Produced by the device list operation; serialized for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintWithSessions {
    /// The trusted device record
    pub fingerprint: DeviceFingerprint,
    /// Active sessions bound to it (may be empty)
    pub sessions: Vec<Session>,
}

// =============================================================================
// OTP CONFIG
// =============================================================================

/// Per-user TOTP configuration, at most one row per user.
///
/// `otp_secret_encrypted` holds the base32 shared secret under
/// AES-256-GCM (see `shared::auth::secret_cipher`); the plaintext exists
/// only in memory during setup and verification. Disabling keeps the
/// secret so re-enable works against the same authenticator.
#[derive(Debug, Clone, FromRow)]
pub struct OtpConfigRecord {
    /// Owner (primary key - uniqueness is the schema's job)
    pub user_id: Uuid,
    /// Encrypted TOTP shared secret
    pub otp_secret_encrypted: String,
    /// Whether login requires the second factor
    pub otp_enable: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last enable/disable flip
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// REMOTE USER REPRESENTATIONS
// =============================================================================

/// A user as the user-directory service reports it.
///
/// Read-mostly: this service only ever reads users and requests narrow
/// updates (password hash, last login).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    /// Directory-owned identifier
    pub user_id: Uuid,
    /// Unique email address
    pub email: String,
    /// Unique username
    pub username: String,
    /// Role: "user", "admin", or "moderator"
    pub role: String,
    /// Display name, when the user set one
    #[serde(default)]
    pub display_name: Option<String>,
    /// Last successful login recorded by the directory
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Directory user plus password hash, for the login compare only.
///
/// Never serialized into a response; the hash stays in the service layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUserWithPassword {
    /// The public projection
    #[serde(flatten)]
    pub user: DirectoryUser,
    /// bcrypt hash as stored by the directory
    pub password_hashed: String,
}

/// Data sent to the directory to create a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirectoryUser {
    /// Desired username (must be free)
    pub username: String,
    /// Verified email address
    pub email: String,
    /// Pre-hashed password (bcrypt)
    pub password_hashed: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_user_with_password_flattens() {
        let json = serde_json::json!({
            "userId": "550e8400-e29b-41d4-a716-446655440000",
            "email": "a@x",
            "username": "alice",
            "role": "user",
            "passwordHashed": "$2b$12$abcdefghijklmnopqrstuv"
        });

        let parsed: DirectoryUserWithPassword = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.user.username, "alice");
        assert!(parsed.password_hashed.starts_with("$2b$"));
    }

    #[test]
    fn test_directory_user_tolerates_missing_optionals() {
        let json = serde_json::json!({
            "userId": "550e8400-e29b-41d4-a716-446655440000",
            "email": "a@x",
            "username": "alice",
            "role": "user"
        });

        let parsed: DirectoryUser = serde_json::from_value(json).unwrap();
        assert!(parsed.display_name.is_none());
        assert!(parsed.last_login_at.is_none());
    }
}
