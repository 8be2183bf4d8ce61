//! # Tracing and Structured Logging Configuration
//!
//! Initializes the logging system with environment-appropriate settings.
//!
//! ## Output Formats
//!
//! | Environment | Format | Purpose |
//! |-------------|--------|---------|
//! | Development | Compact, colored, one line per event | Terminal readability |
//! | Production | JSON, flattened fields | Machine-parseable for log aggregation |
//!
//! ## Default Filters
//!
//! When `RUST_LOG` is unset the defaults keep this service's crates loud
//! and its dependencies quiet:
//!
//! | Environment | Default filter |
//! |-------------|----------------|
//! | Development | `info,auth_service=debug,shared=debug,hyper=warn,sqlx=warn,redis=warn` |
//! | Production | `info,sqlx=warn` |
//!
//! `sqlx` is capped in both: it logs every statement at INFO, which for
//! an auth service means a line per token validation.
//!
//! ## Filter Configuration
//!
//! Override via the `RUST_LOG` environment variable:
//!
//! ```bash
//! # Everything from the auth flows, step by step
//! RUST_LOG=info,auth_service=trace
//!
//! # Chase a Redis problem
//! RUST_LOG=info,redis=debug
//! ```
//!
//! ## Field Hygiene
//!
//! Never log passwords, raw tokens, TOTP secrets, or verification codes.
//! Log user ids, fingerprint ids, and session ids - identifiers, not
//! credentials.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

// =============================================================================
// Initialization
// =============================================================================

/// Initializes the tracing/logging system.
///
/// This should be called **once** at the very start of the application,
/// before any other code that might emit logs.
///
/// ## Parameters
///
/// - `service_name`: Name of the service; its crate target is raised to
///   DEBUG in the development defaults
/// - `is_production`: If true, outputs JSON; if false, compact colored
///   output
pub fn init_tracing(service_name: &str, is_production: bool) {
    // Crate targets use underscores, service names use hyphens
    let service_target = service_name.replace('-', "_");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info,sqlx=warn")
        } else {
            EnvFilter::new(format!(
                "info,{}=debug,shared=debug,hyper=warn,sqlx=warn,redis=warn",
                service_target
            ))
        }
    });

    if is_production {
        // JSON for log aggregation: fields flattened to the root, the
        // enclosing request span inlined, span-close events for timing
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        // Compact single-line output; file and line carry the context
        // that span lists would in production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    }

    tracing::info!(
        service = service_name,
        production = is_production,
        "Tracing initialized"
    );
}
