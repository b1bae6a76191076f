// chatbud_backend/src/razorpay_client.rs
// Razorpay Subscriptions API client

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RazorpayConfig;
use crate::error::GatewayError;

/// Billing cycles a new subscription runs for.
const TOTAL_COUNT: u32 = 12;

/// Creates subscriptions on the payment gateway.
#[async_trait]
pub trait SubscriptionGateway: Send + Sync {
    /// Returns the gateway's subscription id. `user_id` is stored in the
    /// subscription notes so webhooks can be traced back to the user.
    async fn create_subscription(&self, plan_id: &str, user_id: &str)
        -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    plan_id: &'a str,
    customer_notify: u8,
    total_count: u32,
    notes: Notes<'a>,
}

#[derive(Debug, Serialize)]
struct Notes<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntity {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
    config: RazorpayConfig,
    http_client: Client,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn basic_auth(&self) -> String {
        let auth_str = format!("{}:{}", self.config.key_id, self.config.key_secret);
        format!("Basic {}", STANDARD.encode(auth_str))
    }
}

#[async_trait]
impl SubscriptionGateway for RazorpayClient {
    async fn create_subscription(
        &self,
        plan_id: &str,
        user_id: &str,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/subscriptions", self.config.api_base);
        let body = CreateSubscriptionBody {
            plan_id,
            customer_notify: 1,
            total_count: TOTAL_COUNT,
            notes: Notes { user_id },
        };

        let resp = self
            .http_client
            .post(&url)
            .header("Authorization", self.basic_auth())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let entity: SubscriptionEntity = resp.json().await?;
        entity
            .id
            .filter(|id| !id.is_empty())
            .ok_or(GatewayError::MissingId)
    }
}
