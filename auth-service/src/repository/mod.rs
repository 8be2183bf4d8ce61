//! # Repository Layer
//!
//! Data access for the three collections this service owns:
//!
//! | Repository | Collection | Unique constraints |
//! |------------|------------|--------------------|
//! | [`SessionRepository`] | `sessions` | `session_token` |
//! | [`FingerprintRepository`] | `device_fingerprints` | `(user_id, fingerprint_hash)` |
//! | [`OtpRepository`] | `otps` | `user_id` |
//!
//! Repositories hold a cloned `PgPool` and nothing else. All queries are
//! parameterized; monotonic state transitions (revoke, trust flips) are
//! single conditional UPDATEs so concurrent callers can't interleave
//! partial states.

pub mod fingerprint_repository;
pub mod otp_repository;
pub mod session_repository;

pub use fingerprint_repository::FingerprintRepository;
pub use otp_repository::OtpRepository;
pub use session_repository::SessionRepository;
