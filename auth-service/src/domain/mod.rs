//! # Domain Layer
//!
//! Core business objects for authentication and session management:
//!
//! - [`entities`] - Persistent records (`Session`, `DeviceFingerprint`,
//!   `OtpConfigRecord`) and the remote user representations
//! - [`ephemeral`] - Typed payloads, key builders, and TTLs for the
//!   ephemeral store, plus code/token generation
//! - [`events`] - Fire-and-forget outbound bus events
//!
//! The domain layer has no I/O: repositories and services give these
//! types behavior.

pub mod entities;
pub mod ephemeral;
pub mod events;

pub use entities::{
    DeviceFingerprint, DirectoryUser, DirectoryUserWithPassword, FingerprintWithSessions,
    NewDeviceFingerprint, NewDirectoryUser, NewSession, OtpConfigRecord, Session,
};
