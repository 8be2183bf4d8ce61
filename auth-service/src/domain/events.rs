//! # Outbound Events
//!
//! Fire-and-forget messages this service publishes to the platform bus.
//! Nothing here is awaited: a handler's success never depends on
//! delivery, and the dispatchers on the far side own retries.
//!
//! ## Event Flow
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────────┐
//! │  Auth Service   │────▶│    EventBus     │────▶│  External dispatchers │
//! │  (produces)     │     │ (bounded queue) │     │  (email, graph, push) │
//! └─────────────────┘     └─────────────────┘     └──────────────────────┘
//! ```
//!
//! ## Queues
//!
//! | Event | Queue | Trigger |
//! |-------|-------|---------|
//! | `email_request` | email | registration code, welcome mail, device challenge, reset code |
//! | `user_created` | graph-sync | completed registration |
//! | `notification` | notifications | session creation |
//!
//! The email dispatcher receives the verification **code** - the code is
//! the only thing ever sent to the user; the ephemeral record stays
//! server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// EMAIL REQUESTS
// =============================================================================

/// Which template the email dispatcher should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailKind {
    /// Registration verification code
    CreateAccount,
    /// Post-registration welcome
    WelcomeMessage,
    /// Device-trust verification code
    FingerprintVerify,
    /// Password-reset verification code
    ForgotPasswordVerify,
}

/// Payload handed to the email dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailData {
    /// Recipient address
    pub email: String,
    /// Verification code, for the code-bearing kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Username, for personalized templates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A request for the email dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    /// Template selector
    #[serde(rename = "type")]
    pub kind: EmailKind,
    /// Template data
    pub data: EmailData,
}

// =============================================================================
// GRAPH SYNC
// =============================================================================

/// Emitted once per completed registration so the social-graph service
/// can materialize the new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreated {
    /// Directory-assigned id
    pub user_id: Uuid,
    /// Registered username
    pub username: String,
    /// Registered email
    pub email: String,
    /// When registration completed
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Emitted when a session is created, for the notifications service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// User the notification is for
    pub user_id: Uuid,
    /// Application label of the new session
    pub app: String,
    /// Human-readable message
    pub message: String,
    /// When the session was created
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// OUTBOUND ENVELOPE
// =============================================================================

/// Everything this service can publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// For the email dispatcher
    EmailRequest(EmailRequest),
    /// For the graph-sync queue
    UserCreated(UserCreated),
    /// For the notifications queue
    Notification(Notification),
}

impl OutboundEvent {
    /// Destination queue name for routing.
    pub fn queue(&self) -> &'static str {
        match self {
            Self::EmailRequest(_) => "email",
            Self::UserCreated(_) => "graph-sync",
            Self::Notification(_) => "notifications",
        }
    }

    /// Event type name for logging and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EmailRequest(_) => "email_request",
            Self::UserCreated(_) => "user_created",
            Self::Notification(_) => "notification",
        }
    }
}

/// Wrapper added to every published event.
///
/// Adds the metadata dispatchers need for deduplication and schema
/// evolution: a unique event id, the type name, a version, and the
/// publication timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event instance
    pub event_id: Uuid,
    /// Event type name for routing
    pub event_type: String,
    /// Schema version for evolution
    pub version: u32,
    /// The actual event data
    pub payload: OutboundEvent,
    /// When the envelope was created
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Creates a new envelope with auto-generated id and timestamp.
    pub fn new(payload: OutboundEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: payload.event_type().to_string(),
            version: 1,
            payload,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EmailKind::CreateAccount).unwrap();
        assert_eq!(json, "\"create-account\"");

        let json = serde_json::to_string(&EmailKind::ForgotPasswordVerify).unwrap();
        assert_eq!(json, "\"forgot-password-verify\"");
    }

    #[test]
    fn test_email_request_shape() {
        let request = EmailRequest {
            kind: EmailKind::FingerprintVerify,
            data: EmailData {
                email: "a@x".to_string(),
                code: Some("aB3-_9".to_string()),
                username: None,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "fingerprint-verify");
        assert_eq!(json["data"]["code"], "aB3-_9");
        // Absent fields stay out of the wire format
        assert!(json["data"].get("username").is_none());
    }

    #[test]
    fn test_queue_routing() {
        let email = OutboundEvent::EmailRequest(EmailRequest {
            kind: EmailKind::WelcomeMessage,
            data: EmailData { email: "a@x".to_string(), code: None, username: None },
        });
        assert_eq!(email.queue(), "email");

        let created = OutboundEvent::UserCreated(UserCreated {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x".to_string(),
            occurred_at: Utc::now(),
        });
        assert_eq!(created.queue(), "graph-sync");
        assert_eq!(created.event_type(), "user_created");
    }

    #[test]
    fn test_envelope_carries_type_and_version() {
        let event = OutboundEvent::Notification(Notification {
            user_id: Uuid::new_v4(),
            app: "decode".to_string(),
            message: "New session".to_string(),
            occurred_at: Utc::now(),
        });

        let envelope = EventEnvelope::new(event);
        assert_eq!(envelope.event_type, "notification");
        assert_eq!(envelope.version, 1);
    }
}
