//! # Decode - Authentication Service
//!
//! The **auth-service** issues and validates tokens, manages sessions
//! and device trust, enforces the optional TOTP second factor, brokers
//! SSO handoffs between sibling apps, and authenticates sibling services
//! to each other.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │   routes    │  │  handlers   │  │    DTOs (Request/Res)   │  │
//! │  └──────┬──────┘  └──────┬──────┘  └────────────┬────────────┘  │
//! └─────────┼────────────────┼─────────────────────┼────────────────┘
//!           ▼                ▼                     ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │  AuthService (orchestrator) · SessionService · TotpService      │
//! │  FingerprintService · SsoService · EventBus                     │
//! └───────────┬──────────────────────────┬──────────────────────────┘
//!             ▼                          ▼
//! ┌──────────────────────┐   ┌────────────────────────────────────┐
//! │ Repositories (sqlx)  │   │ Collaborators: Redis (ephemeral    │
//! │ sessions ·           │   │ store), user-directory HTTP client │
//! │ device_fingerprints  │   │ (service-token signed), event bus  │
//! │ · otps               │   │                                    │
//! └──────────────────────┘   └────────────────────────────────────┘
//! ```
//!
//! ## Token Families
//!
//! | Kind | Lifetime | Purpose |
//! |------|----------|---------|
//! | Access | 1 day | API calls; bound to a session record |
//! | Session | 30 days | Rotating credential behind access tokens |
//! | Service | minutes | Sibling-to-sibling authentication |
//! | SSO | 60 s | One-shot cross-app handoff |
//!
//! ## Authentication Flow (trusted device, no TOTP)
//!
//! ```text
//! User                    Auth Service            user-directory     Postgres/Redis
//!   │                          │                        │                 │
//!   │  POST /auth/login        │                        │                 │
//!   │─────────────────────────▶│                        │                 │
//!   │                          │  lookup + password     │                 │
//!   │                          │───────────────────────▶│                 │
//!   │                          │  bcrypt compare        │                 │
//!   │                          │  fingerprint check ────────────────────▶ │
//!   │                          │  create session    ────────────────────▶ │
//!   │  {session_token,         │                        │                 │
//!   │   access_token}          │                        │                 │
//!   │◀─────────────────────────│                        │                 │
//! ```
//!
//! Untrusted devices detour through the email-OTP handshake, and an
//! enabled TOTP inserts a gate token before any session exists - see
//! [`service::auth_service`] for the full state machine.
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`].
//! Key settings:
//!
//! - `DATABASE_URL`, `REDIS_URL`
//! - `JWT_ACCESS_SECRET`, `JWT_SESSION_SECRET`
//! - `SERVICE_USER_DIRECTORY_SECRET`, `SERVICE_WALLET_SECRET`
//! - `OTP_ENCRYPTION_KEY`
//! - `USER_DIRECTORY_URL`

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::auth::{PasswordHasher, SecretCipher, ServiceTokenService, TokenCodec};
use shared::config::AppConfig;
use shared::redis_client::RedisClient;
use shared::{database, tracing_config};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

mod api;
mod clients;
mod domain;
mod repository;
mod service;

use api::routes;
use clients::UserDirectoryClient;
use repository::{FingerprintRepository, OtpRepository, SessionRepository};
use service::{
    AuthService, EventBus, FingerprintService, SessionService, SsoService, TotpService,
};

/// Shared application state injected into all request handlers.
///
/// Wrapped in [`actix_web::web::Data`]; every field is a cheap-to-clone
/// handle over pooled resources.
pub struct AppState {
    /// Orchestrator for the multi-step flows
    pub auth: AuthService,
    /// Session lifecycle (refresh, validation, revocation)
    pub sessions: SessionService,
    /// Device trust (list, revoke)
    pub fingerprints: FingerprintService,
    /// Second-factor lifecycle
    pub totp: TotpService,
    /// Cross-app handoffs
    pub sso: SsoService,
    /// Inbound service-token verification
    pub service_tokens: Arc<ServiceTokenService>,
    /// Database pool, for health checks
    pub db: PgPool,
    /// Redis client, for health checks
    pub redis: RedisClient,
}

/// Application entry point and server initialization.
///
/// # Initialization Sequence
///
/// 1. Load configuration from environment variables
/// 2. Initialize structured logging/tracing
/// 3. Create the PostgreSQL pool and Redis client
/// 4. Start the event-bus drain task
/// 5. Wire repositories, clients, and services
/// 6. Configure and start the HTTP server
///
/// # Error Handling
///
/// Critical initialization errors use `expect()` - the service must not
/// start half-wired (fail-fast).
///
/// # Graceful Shutdown
///
/// Actix-web handles SIGTERM/SIGINT: stops accepting connections, waits
/// for in-flight requests, then drops the pools.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Load configuration from environment
    // ─────────────────────────────────────────────────────────────────────
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Initialize structured logging
    // ─────────────────────────────────────────────────────────────────────
    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting auth-service"
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 3: Connect the stores
    // ─────────────────────────────────────────────────────────────────────
    let db_pool = database::create_pool(&config.database)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let redis_client = RedisClient::new(&config.redis)
        .await
        .expect("Failed to connect to Redis");

    // ─────────────────────────────────────────────────────────────────────
    // Step 4: Event bus (fire-and-forget; drain task owns the receiver)
    // ─────────────────────────────────────────────────────────────────────
    let (event_bus, event_rx) = EventBus::new();
    EventBus::spawn_drain(event_rx);

    // ─────────────────────────────────────────────────────────────────────
    // Step 5: Wire repositories, clients, and services
    // ─────────────────────────────────────────────────────────────────────
    let codec = Arc::new(TokenCodec::new(config.jwt.clone()));
    let service_tokens = Arc::new(ServiceTokenService::new(config.service_auth.clone()));
    let cipher = Arc::new(SecretCipher::new(&config.otp.encryption_key));
    let hasher = Arc::new(PasswordHasher::new(config.password.bcrypt_cost));

    let session_repo = SessionRepository::new(db_pool.clone());
    let fingerprint_repo = FingerprintRepository::new(db_pool.clone());
    let otp_repo = OtpRepository::new(db_pool.clone());

    let directory = UserDirectoryClient::new(&config.services, service_tokens.clone())
        .expect("Failed to build user-directory client");

    let sessions = SessionService::new(
        session_repo.clone(),
        codec.clone(),
        event_bus.clone(),
        config.jwt.clone(),
    );

    let fingerprints = FingerprintService::new(
        fingerprint_repo.clone(),
        session_repo.clone(),
        redis_client.clone(),
        event_bus.clone(),
    );

    let totp = TotpService::new(
        otp_repo,
        fingerprint_repo.clone(),
        sessions.clone(),
        redis_client.clone(),
        cipher,
        config.otp.issuer.clone(),
        config.default_app.clone(),
    );

    let sso = SsoService::new(redis_client.clone(), fingerprint_repo, sessions.clone());

    let auth = AuthService::new(
        directory,
        hasher,
        fingerprints.clone(),
        sessions.clone(),
        totp.clone(),
        redis_client.clone(),
        event_bus,
        config.default_app.clone(),
        config.services.wallet_user_agent.clone(),
    );

    let app_state = web::Data::new(AppState {
        auth,
        sessions,
        fingerprints,
        totp,
        sso,
        service_tokens,
        db: db_pool,
        redis: redis_client,
    });

    // ─────────────────────────────────────────────────────────────────────
    // Step 6: Configure and start HTTP server
    // ─────────────────────────────────────────────────────────────────────
    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let workers = config.server.workers;

    info!("Server listening on {}:{}", server_host, server_port);

    let mut server = HttpServer::new(move || {
        // In production, replace allow_any_origin with the configured
        // app origins
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            // Middleware stack (first added = last executed)
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            // Shared state
            .app_data(app_state.clone())
            // Routes
            .configure(routes::configure)
    });

    if workers > 0 {
        server = server.workers(workers);
    }

    server.bind((server_host, server_port))?.run().await
}
