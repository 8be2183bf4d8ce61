//! # Authentication Primitives
//!
//! The cryptographic and token-handling building blocks shared by the
//! auth service:
//!
//! ```text
//! auth/
//! ├── jwt.rs           - Access/session token codec
//! ├── service_token.rs - Inter-service token mint/verify
//! ├── password.rs      - Strength, bcrypt hashing, similarity
//! └── secret_cipher.rs - AES-256-GCM for stored TOTP secrets
//! ```
//!
//! ## Overview
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`TokenCodec`] | Mint and verify access/session JWTs |
//! | [`ServiceTokenService`] | Authenticate sibling services |
//! | [`PasswordHasher`] / [`PasswordStrength`] | Password storage and policy |
//! | [`SecretCipher`] | TOTP secret encryption at rest |
//!
//! ## Token Families
//!
//! ```text
//! ┌────────────┐   1 day    bound to a session record
//! │  Access    │──────────► validated on every API call
//! ├────────────┤
//! │  Session   │   30 days  stored verbatim in `sessions`,
//! ├────────────┤            rotated on refresh
//! │  Service   │   minutes  sibling-to-sibling only
//! ├────────────┤
//! │  SSO       │   60 s     opaque, lives in the ephemeral store
//! └────────────┘
//! ```

pub mod jwt;
pub mod password;
pub mod secret_cipher;
pub mod service_token;

// Re-export main types for convenient access
pub use jwt::{AccessClaims, SessionClaims, TokenCodec};
pub use password::{PasswordHasher, PasswordStrength, StrengthReport};
pub use secret_cipher::SecretCipher;
pub use service_token::{ServiceClaims, ServiceTokenService};
