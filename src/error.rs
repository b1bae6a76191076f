// chatbud_backend/src/error.rs
// Error types, and their mapping to HTTP responses at the route boundary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure writing to the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user id {0:?} is not a valid database key")]
    InvalidKey(String),

    #[error("access token request failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("database rejected write ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Failure talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway response has no subscription id")]
    MissingId,
}

/// Problems with the Firebase settings, caught at startup.
#[derive(Debug, Error)]
pub enum FirebaseError {
    #[error("database URL {0:?} cannot be used as a base URL")]
    DatabaseUrl(String),

    #[error("service account is neither JSON nor base64-encoded JSON: {0}")]
    Malformed(String),

    #[error("service account private key is unusable: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("store update failed: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::InvalidSignature => {
                (StatusCode::BAD_REQUEST, "Invalid signature").into_response()
            }
            WebhookError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, "Invalid payload").into_response()
            }
            WebhookError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("missing userId or planId")]
    MissingFields,

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SubscriptionError::MissingFields => {
                (StatusCode::BAD_REQUEST, "Missing userId or planId")
            }
            SubscriptionError::Gateway(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Subscription creation failed",
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
