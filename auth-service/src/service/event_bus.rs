//! # Event Bus
//!
//! Bounded, fire-and-forget queue between the auth flows and the
//! platform's external dispatchers.
//!
//! ## Delivery Model
//!
//! ```text
//! handler ──emit()──► bounded mpsc ──drain task──► dispatcher boundary
//!    │                                                  (email, graph,
//!    └── returns immediately, success                    notifications)
//!        independent of delivery
//! ```
//!
//! `emit` never blocks and never fails the caller: a full queue drops the
//! event with a warning. The flows treat every event as advisory - a
//! registration completes whether or not the welcome email ever renders.
//!
//! The drain task hands envelopes to the dispatcher boundary. Delivery to
//! the actual brokers is owned by the platform's messaging collaborator;
//! this service's contract ends at serialization.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::{
    EmailData, EmailKind, EmailRequest, EventEnvelope, Notification, OutboundEvent, UserCreated,
};

/// Default queue depth. Events are tiny; this absorbs bursts without
/// meaningfully delaying drops when the drain stalls.
const DEFAULT_CAPACITY: usize = 1024;

// =============================================================================
// Event Bus
// =============================================================================

/// Fire-and-forget publisher handle.
///
/// Cheap to clone; all clones feed one queue.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    ///
    /// Returns the publisher handle and the receiver to hand to
    /// [`spawn_drain`](Self::spawn_drain).
    pub fn new() -> (Self, mpsc::Receiver<EventEnvelope>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Spawns the drain task that forwards envelopes to the dispatcher
    /// boundary.
    pub fn spawn_drain(mut rx: mpsc::Receiver<EventEnvelope>) {
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match serde_json::to_string(&envelope) {
                    Ok(payload) => {
                        debug!(
                            event_id = %envelope.event_id,
                            event_type = %envelope.event_type,
                            queue = envelope.payload.queue(),
                            payload = %payload,
                            "Event dispatched"
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize outbound event");
                    }
                }
            }
        });
    }

    /// Publishes an event. Never blocks; a full queue drops the event.
    pub fn emit(&self, event: OutboundEvent) {
        let envelope = EventEnvelope::new(event);

        if let Err(e) = self.tx.try_send(envelope) {
            warn!(error = %e, "Event queue full, dropping event");
        }
    }

    // =========================================================================
    // Convenience Emitters
    // =========================================================================

    /// Emits an email request carrying a verification code.
    pub fn emit_code_email(&self, kind: EmailKind, email: &str, code: &str) {
        self.emit(OutboundEvent::EmailRequest(EmailRequest {
            kind,
            data: EmailData {
                email: email.to_string(),
                code: Some(code.to_string()),
                username: None,
            },
        }));
    }

    /// Emits the post-registration welcome email.
    pub fn emit_welcome_email(&self, email: &str, username: &str) {
        self.emit(OutboundEvent::EmailRequest(EmailRequest {
            kind: EmailKind::WelcomeMessage,
            data: EmailData {
                email: email.to_string(),
                code: None,
                username: Some(username.to_string()),
            },
        }));
    }

    /// Emits the graph-sync event for a completed registration.
    pub fn emit_user_created(&self, user_id: Uuid, username: &str, email: &str) {
        self.emit(OutboundEvent::UserCreated(UserCreated {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            occurred_at: Utc::now(),
        }));
    }

    /// Emits a session-created notification.
    pub fn emit_session_notification(&self, user_id: Uuid, app: &str) {
        self.emit(OutboundEvent::Notification(Notification {
            user_id,
            app: app.to_string(),
            message: format!("New session created for {}", app),
            occurred_at: Utc::now(),
        }));
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_delivers_envelope() {
        let (bus, mut rx) = EventBus::with_capacity(8);

        bus.emit_code_email(EmailKind::CreateAccount, "a@x", "aB3-_9");

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "email_request");
        assert_eq!(envelope.payload.queue(), "email");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_error() {
        let (bus, _rx) = EventBus::with_capacity(1);

        // Second emit lands on a full queue; the caller must not notice
        bus.emit_session_notification(Uuid::new_v4(), "decode");
        bus.emit_session_notification(Uuid::new_v4(), "decode");
    }

    #[tokio::test]
    async fn test_user_created_routes_to_graph_sync() {
        let (bus, mut rx) = EventBus::with_capacity(8);

        bus.emit_user_created(Uuid::new_v4(), "alice", "a@x");

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.payload.queue(), "graph-sync");
    }
}
