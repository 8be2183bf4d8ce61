//! # Auth Orchestrator
//!
//! Drives the multi-step state machines: login, registration, device
//! trust, password reset, and the wallet-session path. Single-step
//! operations (session refresh, SSO, 2FA lifecycle) go to their
//! components directly; everything that composes password verification,
//! device trust, and the TOTP gates lives here.
//!
//! ## Login State Machine
//!
//! ```text
//!            lookup + bcrypt compare
//!                     │ miss → InvalidCredentials
//!                     ▼
//!              fingerprint check
//!            ┌────────┴─────────┐
//!        trusted            not trusted
//!            │                  │
//!       TOTP gate          create untrusted (idempotent)
//!      ┌─────┴─────┐       send email challenge
//!  disabled     enabled    TOTP gate
//!      │           │      ┌─────┴──────┐
//!   session   OtpRequired │ disabled   enabled
//!   created   {gate token}│    │          │
//!                         │ "device    gate token
//!                         │  verification  +
//!                         │  required"  email code
//! ```
//!
//! No branch creates a session before every applicable factor clears;
//! the ephemeral gate tokens are the only state carried between steps.
//!
//! ## Enumeration Hygiene
//!
//! Unknown identifier and wrong password both answer
//! `InvalidCredentials` - login never confirms that an account exists.

use shared::auth::{PasswordHasher, PasswordStrength};
use shared::errors::ApiError;
use shared::redis_client::RedisClient;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::UserDirectoryClient;
use crate::domain::ephemeral::{
    self, EmailVerificationCode, PasswordResetTicket, RegisterInfo, WalletPassTicket,
    REGISTER_INFO_TTL, VERIFICATION_CODE_TTL,
};
use crate::domain::events::EmailKind;
use crate::domain::{DirectoryUser, NewDirectoryUser};
use crate::service::event_bus::EventBus;
use crate::service::fingerprint_service::{FingerprintCheck, FingerprintService};
use crate::service::session_service::{SessionService, SessionWithAccess};
use crate::service::totp_service::{LoginGate, TotpProvisioning, TotpService};

/// App label for sessions created through the wallet handoff.
const WALLET_APP: &str = "decode by wallet";

// =============================================================================
// Inputs & Outcomes
// =============================================================================

/// Everything a login attempt carries.
#[derive(Debug, Clone)]
pub struct LoginInput {
    /// Email address or username
    pub email_or_username: String,
    /// Plaintext password
    pub password: String,
    /// Opaque client-computed device hash
    pub fingerprint_hashed: String,
    /// Browser name
    pub browser: String,
    /// Device name
    pub device: String,
}

/// How a login attempt resolved.
#[derive(Debug)]
pub enum LoginOutcome {
    /// All factors cleared - session created
    Session(SessionWithAccess),
    /// Password and device cleared; TOTP pending
    OtpRequired {
        /// Redeem at `/auth/2fa/login`
        login_session_token: String,
    },
    /// Device untrusted; email challenge sent
    DeviceVerificationRequired {
        /// Present when TOTP is enabled: redeem at
        /// `/auth/2fa/login/fingerprint` instead of the email code
        verify_fingerprint_session_token: Option<String>,
    },
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Composes the password engine, user directory, fingerprint manager,
/// session manager, and TOTP manager into the authentication flows.
#[derive(Clone)]
pub struct AuthService {
    /// Remote user store
    directory: UserDirectoryClient,
    /// Password hashing and comparison
    hasher: Arc<PasswordHasher>,
    /// Device trust state machine
    fingerprints: FingerprintService,
    /// Session lifecycle
    sessions: SessionService,
    /// Second factor and its gates
    totp: TotpService,
    /// Ephemeral store for registration and reset records
    redis: RedisClient,
    /// Fire-and-forget event publisher
    events: EventBus,
    /// App label for sessions without an explicit one
    default_app: String,
    /// User-Agent the wallet sibling must present
    wallet_user_agent: String,
}

impl AuthService {
    /// Creates the orchestrator over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: UserDirectoryClient,
        hasher: Arc<PasswordHasher>,
        fingerprints: FingerprintService,
        sessions: SessionService,
        totp: TotpService,
        redis: RedisClient,
        events: EventBus,
        default_app: String,
        wallet_user_agent: String,
    ) -> Self {
        Self {
            directory,
            hasher,
            fingerprints,
            sessions,
            totp,
            redis,
            events,
            default_app,
            wallet_user_agent,
        }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Starts a registration: validates the password, parks the pending
    /// account, and emails a verification code.
    ///
    /// Nothing reaches the user directory until the code is redeemed.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let report = PasswordStrength::check(password);
        if !report.ok {
            return Err(ApiError::WeakPassword { feedback: report.feedback });
        }

        let password_hashed = self.hasher.hash(password)?;

        // Fail fast on either identifier before writing anything
        if self.directory.check_exists(email).await? {
            return Err(ApiError::ExistingUser { resource: "email".to_string() });
        }
        if self.directory.check_exists(username).await? {
            return Err(ApiError::ExistingUser { resource: "username".to_string() });
        }

        self.redis
            .set(
                &ephemeral::register_info_key(email),
                &RegisterInfo {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hashed,
                },
                Some(REGISTER_INFO_TTL),
            )
            .await?;

        let code = ephemeral::generate_code();
        self.redis
            .set(
                &ephemeral::email_verification_code_key(&code),
                &EmailVerificationCode { email: email.to_string(), code: code.clone() },
                Some(VERIFICATION_CODE_TTL),
            )
            .await?;

        self.events.emit_code_email(EmailKind::CreateAccount, email, &code);

        info!(email = %email, username = %username, "Registration initiated");

        Ok(())
    }

    /// Completes a registration: redeems the code, creates the user in
    /// the directory, emits the welcome and graph-sync events, and
    /// clears both ephemeral records.
    pub async fn verify_email_register(&self, code: &str) -> Result<DirectoryUser, ApiError> {
        let code_key = ephemeral::email_verification_code_key(code);

        let ticket: EmailVerificationCode = self
            .redis
            .get(&code_key)
            .await?
            .filter(|t: &EmailVerificationCode| t.code == code)
            .ok_or(ApiError::InvalidCode)?;

        let info_key = ephemeral::register_info_key(&ticket.email);
        let pending: RegisterInfo = self
            .redis
            .get(&info_key)
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let user = self
            .directory
            .create(&NewDirectoryUser {
                username: pending.username.clone(),
                email: pending.email.clone(),
                password_hashed: pending.password_hashed,
            })
            .await?;

        self.events.emit_welcome_email(&user.email, &user.username);
        self.events.emit_user_created(user.user_id, &user.username, &user.email);

        self.redis.delete_many(&[code_key, info_key]).await?;

        info!(user_id = %user.user_id, username = %user.username, "User created");

        Ok(user)
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    /// Runs the login state machine.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ApiError> {
        let found = self
            .directory
            .get_with_password_by_email_or_username(&input.email_or_username)
            .await?
            .ok_or_else(|| {
                warn!(identifier = %input.email_or_username, "Login attempt for unknown identifier");
                ApiError::InvalidCredentials
            })?;

        if !self.hasher.verify(&input.password, &found.password_hashed)? {
            warn!(user_id = %found.user.user_id, "Failed login attempt - invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        let user = found.user;

        match self.fingerprints.check(user.user_id, &input.fingerprint_hashed).await? {
            FingerprintCheck::Trusted(fingerprint) => {
                match self
                    .totp
                    .check_and_init_login(
                        user.user_id,
                        fingerprint.id,
                        &input.browser,
                        &input.device,
                        &self.default_app,
                    )
                    .await?
                {
                    LoginGate::Session(session) => {
                        self.touch_last_login(user.user_id).await;
                        info!(user_id = %user.user_id, "User logged in");
                        Ok(LoginOutcome::Session(session))
                    }
                    LoginGate::OtpRequired { login_session_token } => {
                        Ok(LoginOutcome::OtpRequired { login_session_token })
                    }
                }
            }
            FingerprintCheck::NotFound => {
                let fingerprint = self
                    .fingerprints
                    .create_untrusted(
                        user.user_id,
                        &input.fingerprint_hashed,
                        &input.browser,
                        &input.device,
                    )
                    .await?;

                self.fingerprints
                    .send_email_challenge(user.user_id, &user.email, &input.fingerprint_hashed)
                    .await?;

                let verify_fingerprint_session_token = self
                    .totp
                    .check_and_init_verify_fingerprint(user.user_id, fingerprint.id)
                    .await?;

                info!(user_id = %user.user_id, "Login from untrusted device");

                Ok(LoginOutcome::DeviceVerificationRequired { verify_fingerprint_session_token })
            }
        }
    }

    /// Redeems a device email challenge: trusts the device and creates
    /// the session.
    pub async fn login_verify_fingerprint_email(
        &self,
        code: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let fingerprint = self.fingerprints.verify_email_challenge(code).await?;

        let session = self
            .sessions
            .create(fingerprint.user_id, fingerprint.id, &self.default_app)
            .await?;

        self.touch_last_login(fingerprint.user_id).await;

        Ok(session)
    }

    /// Redeems a TOTP login gate.
    pub async fn login_verify_otp(
        &self,
        login_session_token: &str,
        otp: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let session = self.totp.login_verify_otp(login_session_token, otp).await?;
        self.touch_last_login(session.session.user_id).await;
        Ok(session)
    }

    /// Redeems a TOTP device-trust gate.
    pub async fn login_fingerprint_verify_otp(
        &self,
        verify_fingerprint_token: &str,
        otp: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        let session = self
            .totp
            .fingerprint_trust_verify_otp(verify_fingerprint_token, otp)
            .await?;
        self.touch_last_login(session.session.user_id).await;
        Ok(session)
    }

    // =========================================================================
    // PASSWORD RESET
    // =========================================================================

    /// Starts a password reset: resolves the user, parks a code, emails
    /// it.
    pub async fn initiate_password_reset(&self, email_or_username: &str) -> Result<(), ApiError> {
        let user = self
            .directory
            .get_by_email_or_username(email_or_username)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", email_or_username) })?;

        let code = ephemeral::generate_code();
        self.redis
            .set(
                &ephemeral::change_password_code_key(&code),
                &PasswordResetTicket { user_id: user.user_id, verification_code: code.clone() },
                Some(VERIFICATION_CODE_TTL),
            )
            .await?;

        self.events
            .emit_code_email(EmailKind::ForgotPasswordVerify, &user.email, &code);

        info!(user_id = %user.user_id, "Password reset initiated");

        Ok(())
    }

    /// Checks a reset code without mutating anything.
    ///
    /// The record stays in place - the delete in
    /// [`change_password`](Self::change_password) is the serializing
    /// step.
    pub async fn verify_password_reset(&self, code: &str) -> Result<(), ApiError> {
        self.redis
            .get::<PasswordResetTicket>(&ephemeral::change_password_code_key(code))
            .await?
            .filter(|t| t.verification_code == code)
            .ok_or(ApiError::InvalidCode)?;

        Ok(())
    }

    /// Completes a password reset: re-reads the code, validates the new
    /// password, updates the directory, and deletes the record.
    pub async fn change_password(&self, code: &str, new_password: &str) -> Result<(), ApiError> {
        let key = ephemeral::change_password_code_key(code);

        let ticket: PasswordResetTicket = self
            .redis
            .get(&key)
            .await?
            .filter(|t: &PasswordResetTicket| t.verification_code == code)
            .ok_or(ApiError::InvalidCode)?;

        let report = PasswordStrength::check(new_password);
        if !report.ok {
            return Err(ApiError::WeakPassword { feedback: report.feedback });
        }

        let user = self
            .directory
            .get_by_user_id(ticket.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", ticket.user_id) })?;

        // The old password only exists hashed, so the account identifiers
        // are the dissimilarity reference
        if PasswordStrength::too_similar(new_password, &user.username)
            || PasswordStrength::too_similar(new_password, email_local_part(&user.email))
        {
            return Err(ApiError::WeakPassword {
                feedback: vec!["Password is too similar to your account identifiers".to_string()],
            });
        }

        let new_hash = self.hasher.hash(new_password)?;
        self.directory.change_password(ticket.user_id, &new_hash).await?;

        // Serializing step: the code dies here, not at verify
        self.redis.delete(&key).await?;

        info!(user_id = %ticket.user_id, "Password changed via reset code");

        Ok(())
    }

    // =========================================================================
    // WALLET SESSION
    // =========================================================================

    /// Redeems a wallet pass token into a trusted session.
    ///
    /// Service-authenticated path: the caller must present the wallet's
    /// User-Agent (the service token was already checked at the HTTP
    /// boundary). The embedded fingerprint is located or created *born
    /// trusted*, and the session is labeled as a wallet session.
    pub async fn create_wallet_session(
        &self,
        wallet_pass_token: &str,
        user_agent: &str,
    ) -> Result<SessionWithAccess, ApiError> {
        if user_agent != self.wallet_user_agent {
            warn!(user_agent = %user_agent, "Wallet session attempt with unexpected User-Agent");
            return Err(ApiError::Forbidden {
                message: "Unexpected caller".to_string(),
            });
        }

        let ticket: WalletPassTicket = self
            .redis
            .take(&ephemeral::wallet_pass_token_key(wallet_pass_token))
            .await?
            .ok_or(ApiError::InvalidCode)?;

        let fingerprint = self
            .fingerprints
            .create_trusted(
                ticket.user_id,
                &ticket.fingerprint_hashed,
                &ticket.browser,
                &ticket.device,
            )
            .await?;

        let session = self
            .sessions
            .create(ticket.user_id, fingerprint.id, WALLET_APP)
            .await?;

        self.touch_last_login(ticket.user_id).await;

        info!(user_id = %ticket.user_id, "Wallet session created");

        Ok(session)
    }

    // =========================================================================
    // PROFILE & 2FA COMPOSITION
    // =========================================================================

    /// Looks up the authenticated user's directory profile.
    pub async fn get_user_info(&self, user_id: Uuid) -> Result<DirectoryUser, ApiError> {
        self.directory
            .get_by_user_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })
    }

    /// Provisions TOTP, labeling the otpauth URL with the user's email.
    pub async fn totp_setup(&self, user_id: Uuid) -> Result<TotpProvisioning, ApiError> {
        let user = self.get_user_info(user_id).await?;
        self.totp.setup(user_id, &user.email).await
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Stamps last-login on the directory record.
    ///
    /// Best-effort: the session already exists and is honored, so a
    /// directory blip must not fail the login.
    async fn touch_last_login(&self, user_id: Uuid) {
        if let Err(e) = self.directory.update_last_login(user_id).await {
            warn!(user_id = %user_id, error = ?e, "Failed to update last login");
        }
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

/// Everything before the `@`, or the whole string when there isn't one.
fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("alice@example.com"), "alice");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
        assert_eq!(email_local_part("@leading"), "");
    }
}
