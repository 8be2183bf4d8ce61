//! # Sibling Service Clients
//!
//! Outbound HTTP clients for the services this one depends on. Each call
//! is authenticated with a freshly minted service token
//! (see `shared::auth::service_token`).

pub mod user_directory;

pub use user_directory::UserDirectoryClient;
