//! # API Layer
//!
//! HTTP request/response processing for the auth endpoints.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            HTTP Request                                 │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Routes (routes.rs)                             │
//! │  URL patterns and HTTP methods, mapped to handlers                      │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handlers (handlers.rs)                           │
//! │  1. Extract request data (JSON body, headers)                           │
//! │  2. Validate with the DTOs (dto.rs)                                     │
//! │  3. Authenticate (access / service token) when protected                │
//! │  4. Call the service layer                                              │
//! │  5. Wrap the result in the uniform envelope                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod handlers;
pub mod routes;
