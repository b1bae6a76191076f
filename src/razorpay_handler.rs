// chatbud_backend/src/razorpay_handler.rs
// HTTP routes: subscription creation, Razorpay webhook, liveness

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, State},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::dispatch::{handle_delivery, DispatchOutcome, UserStore};
use crate::error::{SubscriptionError, WebhookError};
use crate::razorpay_client::SubscriptionGateway;
use crate::signature::SIGNATURE_HEADER;

pub const HEALTH_MESSAGE: &str = "ChatBud Backend Running";

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared, read-only handles built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub razorpay_key_id: String,
    pub webhook_secret: String,
    pub gateway: Arc<dyn SubscriptionGateway>,
    pub users: Arc<dyn UserStore>,
}

pub fn app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/create-subscription", post(create_subscription_handler))
        .route("/razorpay-webhook", post(razorpay_webhook_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

// ═══════════════════════════════════════════════════════════════════════════════
// CREATE SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "planId", default)]
    pub plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    #[serde(rename = "razorpayKey")]
    pub razorpay_key: String,
}

/// Whitespace-only counts as missing; anything else is forwarded untouched.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn create_subscription_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<Json<CreateSubscriptionResponse>, SubscriptionError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "[SUBSCRIPTION] Unreadable request body");
        SubscriptionError::MissingFields
    })?;

    let (Some(user_id), Some(plan_id)) = (non_blank(request.user_id), non_blank(request.plan_id))
    else {
        return Err(SubscriptionError::MissingFields);
    };

    let subscription_id = state
        .gateway
        .create_subscription(&plan_id, &user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %user_id, %plan_id, "[SUBSCRIPTION] Creation failed");
            SubscriptionError::from(e)
        })?;

    tracing::info!(%user_id, %plan_id, %subscription_id, "[SUBSCRIPTION] Created");

    Ok(Json(CreateSubscriptionResponse {
        subscription_id,
        razorpay_key: state.razorpay_key_id.clone(),
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// WEBHOOK
// ═══════════════════════════════════════════════════════════════════════════════

/// Takes the body as raw `Bytes`; the signature covers the exact wire bytes.
pub async fn razorpay_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let outcome = handle_delivery(&body, signature, &state.webhook_secret, state.users.as_ref()).await?;

    Ok(match outcome {
        DispatchOutcome::Upgraded { .. } => "OK",
        DispatchOutcome::Unlinked => "No user linked",
    })
}
