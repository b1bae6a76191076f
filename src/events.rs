// chatbud_backend/src/events.rs
// Razorpay webhook event schema

use serde::Deserialize;
use serde_json::Value;

pub const SUBSCRIPTION_ACTIVATED: &str = "subscription.activated";
pub const PAYMENT_CAPTURED: &str = "payment.captured";

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Top level of every Razorpay webhook delivery.
///
/// `payload` stays untyped here; each recognised event pulls its own entity
/// out of it so a shape mismatch only affects that event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct EntityWrapper {
    entity: Entity,
}

#[derive(Debug, Clone, Deserialize)]
struct Entity {
    /// An object when notes were attached, `[]` when none were.
    #[serde(default)]
    notes: Value,
}

/// The metadata we attach when creating a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionNotes {
    pub user_id: Option<String>,
}

impl SubscriptionNotes {
    /// Only a string `userId` key on an object counts; arrays and other
    /// shapes carry no user.
    pub fn from_value(notes: &Value) -> Self {
        let user_id = notes
            .as_object()
            .and_then(|map| map.get("userId"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { user_id }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECOGNISED EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RazorpayEvent {
    SubscriptionActivated { user_id: Option<String> },
    PaymentCaptured { user_id: Option<String> },
    Unrecognized(String),
}

impl RazorpayEvent {
    pub fn from_envelope(envelope: &WebhookEnvelope) -> Self {
        match envelope.event.as_str() {
            SUBSCRIPTION_ACTIVATED => RazorpayEvent::SubscriptionActivated {
                user_id: notes_user_id(&envelope.payload, "subscription"),
            },
            PAYMENT_CAPTURED => RazorpayEvent::PaymentCaptured {
                user_id: notes_user_id(&envelope.payload, "payment"),
            },
            other => RazorpayEvent::Unrecognized(other.to_string()),
        }
    }

    /// The application user this event upgrades, if it carries one.
    pub fn linked_user(&self) -> Option<&str> {
        let user_id = match self {
            RazorpayEvent::SubscriptionActivated { user_id } => user_id.as_deref(),
            RazorpayEvent::PaymentCaptured { user_id } => user_id.as_deref(),
            RazorpayEvent::Unrecognized(_) => None,
        }?;
        if user_id.is_empty() {
            None
        } else {
            Some(user_id)
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RazorpayEvent::SubscriptionActivated { .. } => SUBSCRIPTION_ACTIVATED,
            RazorpayEvent::PaymentCaptured { .. } => PAYMENT_CAPTURED,
            RazorpayEvent::Unrecognized(name) => name,
        }
    }
}

/// `payload.<kind>.entity.notes.userId`, or `None` if any step is missing.
fn notes_user_id(payload: &Value, kind: &str) -> Option<String> {
    let wrapper: EntityWrapper = serde_json::from_value(payload.get(kind)?.clone()).ok()?;
    SubscriptionNotes::from_value(&wrapper.entity.notes).user_id
}
