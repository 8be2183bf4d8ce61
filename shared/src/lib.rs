//! # Decode - Shared Library
//!
//! Cross-cutting functionality for the Decode auth backend.
//!
//! This crate provides the utilities, types, and services the service
//! binaries build on. It follows the DRY principle to avoid duplication
//! and keep contracts consistent.
//!
//! ## Modules
//!
//! | Module | Purpose | Key Types |
//! |--------|---------|-----------|
//! | [`config`] | Environment-based configuration | [`AppConfig`] |
//! | [`errors`] | Standardized error handling | [`ApiError`], [`ApiResult`] |
//! | [`response`] | Uniform success envelope | [`ApiResponse`](response::ApiResponse) |
//! | [`auth`] | Token codecs, password engine, secret cipher | [`TokenCodec`](auth::TokenCodec) |
//! | [`database`] | PostgreSQL connection pool | [`create_pool`](database::create_pool) |
//! | [`redis_client`] | Ephemeral store façade | [`RedisClient`](redis_client::RedisClient) |
//! | [`tracing_config`] | Structured logging setup | [`init_tracing`](tracing_config::init_tracing) |
//! | [`validation`] | Request validation helpers | Custom validators |
//!
//! ## Design Decisions
//!
//! 1. **Single source of truth**: shared types live here to prevent drift
//! 2. **Security first**: token and password handling follow OWASP guidance
//! 3. **Observable by default**: structured logging and tracing built-in
//! 4. **Uniform surface**: every response, success or failure, uses one
//!    envelope shape

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod redis_client;
pub mod response;
pub mod tracing_config;
pub mod validation;

// Re-exports for convenience - import commonly used types directly from `shared`
pub use config::AppConfig;
pub use errors::{ApiError, ApiResult};
