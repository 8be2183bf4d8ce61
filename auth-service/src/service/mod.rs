//! # Service Layer
//!
//! Business logic for authentication and session management, one service
//! per concern:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         AuthService (orchestrator)                  │
//! │   login / registration / password reset / wallet-session machines   │
//! └───────┬──────────────┬──────────────┬──────────────┬───────────────┘
//!         │              │              │              │
//!         ▼              ▼              ▼              ▼
//!  FingerprintService SessionService TotpService  UserDirectoryClient
//!         │              │              │
//!         └──────────────┴──────┬───────┘
//!                               ▼
//!               repositories · redis · EventBus
//!
//!  SsoService (single-step, called from the HTTP layer directly)
//! ```
//!
//! Cyclic references are broken by passing the narrow dependency each
//! side actually uses: the fingerprint service holds the session
//! *repository* for fan-out revocation, never the session service.

pub mod auth_service;
pub mod event_bus;
pub mod fingerprint_service;
pub mod session_service;
pub mod sso_service;
pub mod totp_service;

pub use auth_service::{AuthService, LoginInput, LoginOutcome};
pub use event_bus::EventBus;
pub use fingerprint_service::{FingerprintCheck, FingerprintService};
pub use session_service::{SessionService, SessionWithAccess};
pub use sso_service::SsoService;
pub use totp_service::{LoginGate, TotpProvisioning, TotpService};
