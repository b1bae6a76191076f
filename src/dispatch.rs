// chatbud_backend/src/dispatch.rs
// Verify-then-dispatch for Razorpay webhook deliveries

use async_trait::async_trait;

use crate::error::{StoreError, WebhookError};
use crate::events::{RazorpayEvent, WebhookEnvelope};
use crate::signature::verify_signature;

/// Value written to `users/<id>/subscription` on upgrade.
pub const PREMIUM_PLAN: &str = "premium";

/// Store that owns user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Partial update setting the user's `subscription` field to `"premium"`.
    async fn mark_premium(&self, user_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The store was updated for this user.
    Upgraded { user_id: String },
    /// Delivery acknowledged, nothing written.
    Unlinked,
}

/// Apply a verified event. At most one store write happens.
pub async fn dispatch(
    event: &RazorpayEvent,
    store: &dyn UserStore,
) -> Result<DispatchOutcome, StoreError> {
    let Some(user_id) = event.linked_user() else {
        tracing::info!(event = %event.name(), "[WEBHOOK] Webhook received but no userId found");
        return Ok(DispatchOutcome::Unlinked);
    };

    if let Err(e) = store.mark_premium(user_id).await {
        tracing::error!(event = %event.name(), user_id, error = %e, "[WEBHOOK] Premium upgrade failed");
        return Err(e);
    }

    tracing::info!(event = %event.name(), user_id, "[WEBHOOK] User upgraded to premium");
    Ok(DispatchOutcome::Upgraded {
        user_id: user_id.to_string(),
    })
}

/// Full handling of one delivery: signature, decode, dispatch.
///
/// `body` is the raw request body. Nothing is decoded before the signature
/// has been checked.
pub async fn handle_delivery(
    body: &[u8],
    signature: &str,
    secret: &str,
    store: &dyn UserStore,
) -> Result<DispatchOutcome, WebhookError> {
    if !verify_signature(body, signature, secret) {
        tracing::warn!("[WEBHOOK] Signature verification failed");
        return Err(WebhookError::InvalidSignature);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "[WEBHOOK] Signed body is not a webhook event");
        WebhookError::InvalidPayload(e)
    })?;

    let event = RazorpayEvent::from_envelope(&envelope);
    tracing::debug!(event = %event.name(), "[WEBHOOK] Received");

    Ok(dispatch(&event, store).await?)
}
