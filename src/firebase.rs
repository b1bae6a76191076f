// chatbud_backend/src/firebase.rs
// Firebase Realtime Database client (REST) used as the user store

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::FirebaseConfig;
use crate::dispatch::{UserStore, PREMIUM_PLAN};
use crate::error::{FirebaseError, StoreError};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE ACCOUNT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    /// Accepts the key file contents directly, or base64 of them.
    pub fn parse(blob: &str) -> Result<Self, FirebaseError> {
        let blob = blob.trim();
        if blob.starts_with('{') {
            return serde_json::from_str(blob)
                .map_err(|e| FirebaseError::Malformed(e.to_string()));
        }

        let decoded = STANDARD
            .decode(blob)
            .map_err(|e| FirebaseError::Malformed(e.to_string()))?;
        serde_json::from_slice(&decoded).map_err(|e| FirebaseError::Malformed(e.to_string()))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct FirebaseStore {
    database_url: Url,
    account: ServiceAccount,
    signing_key: EncodingKey,
    http_client: Client,
    auth_token: Arc<RwLock<Option<(String, DateTime<Utc>)>>>,
}

impl FirebaseStore {
    pub fn new(config: &FirebaseConfig, http_client: Client) -> Result<Self, FirebaseError> {
        let database_url = Url::parse(&config.database_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| FirebaseError::DatabaseUrl(config.database_url.clone()))?;
        let account = ServiceAccount::parse(&config.service_account)?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;

        Ok(Self {
            database_url,
            account,
            signing_key,
            http_client,
            auth_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get valid access token (cached or refreshed)
    async fn get_access_token(&self) -> Result<String, StoreError> {
        {
            let token_lock = self.auth_token.read().await;
            if let Some((token, expiry)) = &*token_lock {
                if *expiry > Utc::now() {
                    return Ok(token.clone());
                }
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: SCOPES,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| StoreError::Auth(e.to_string()))?;

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let resp = self
            .http_client
            .post(&self.account.token_uri)
            .form(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(StoreError::Auth(format!("token endpoint returned {}", resp.status())));
        }

        let body: serde_json::Value = resp.json().await?;
        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| StoreError::Auth("no access_token field".to_string()))?
            .to_string();
        let expires_in = body["expires_in"].as_i64().unwrap_or(3600);

        let mut token_lock = self.auth_token.write().await;
        *token_lock = Some((
            access_token.clone(),
            Utc::now() + Duration::seconds(expires_in - 60),
        ));
        tracing::debug!(expires_in, "[FIREBASE] Access token refreshed");

        Ok(access_token)
    }

    /// `<database>/users/<id>.json`, with the id percent-encoded as one segment.
    fn user_url(&self, user_id: &str) -> Url {
        let mut url = self.database_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("users")
                .push(&format!("{}.json", user_id));
        }
        url
    }
}

/// Firebase keys may not contain `. $ # [ ] /` or control characters.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control())
}

#[async_trait]
impl UserStore for FirebaseStore {
    async fn mark_premium(&self, user_id: &str) -> Result<(), StoreError> {
        if !is_valid_key(user_id) {
            return Err(StoreError::InvalidKey(user_id.to_string()));
        }

        let url = self.user_url(user_id);
        let token = self.get_access_token().await?;

        let resp = self
            .http_client
            .patch(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "subscription": PREMIUM_PLAN }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(user_id, "[FIREBASE] users/{} updated", user_id);
        Ok(())
    }
}
