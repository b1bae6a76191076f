//! HTTP-level tests for the three routes, driven through the router with
//! in-memory fakes for the payment gateway and the user store.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use chatbud_backend::error::{GatewayError, StoreError};
use chatbud_backend::signature::compute_signature;
use chatbud_backend::{app, AppState, SubscriptionGateway, UserStore};

const WEBHOOK_SECRET: &str = "whsec_test_razorpay";
const KEY_ID: &str = "rzp_test_key";

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct MemoryUsers {
    plans: Mutex<Vec<(String, &'static str)>>,
    fail: bool,
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn mark_premium(&self, user_id: &str) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Rejected {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.plans
            .lock()
            .unwrap()
            .push((user_id.to_string(), "premium"));
        Ok(())
    }
}

#[derive(Default)]
struct FakeGateway {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl SubscriptionGateway for FakeGateway {
    async fn create_subscription(
        &self,
        plan_id: &str,
        user_id: &str,
    ) -> Result<String, GatewayError> {
        if self.fail {
            return Err(GatewayError::Rejected {
                status: 400,
                body: "The id provided does not exist".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push((plan_id.to_string(), user_id.to_string()));
        Ok("sub_TEST00000001".to_string())
    }
}

fn router(users: Arc<MemoryUsers>, gateway: Arc<FakeGateway>) -> Router {
    let state = Arc::new(AppState {
        razorpay_key_id: KEY_ID.to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        gateway,
        users,
    });
    app(state, Duration::from_secs(5))
}

fn webhook_request(body: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/razorpay-webhook")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("x-razorpay-signature", sig);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

fn signed(body: &[u8]) -> Request<Body> {
    let sig = compute_signature(body, WEBHOOK_SECRET);
    webhook_request(body, Some(&sig))
}

fn subscription_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/create-subscription")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn subscription_activated(user_id: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "account_id": "acc_TEST",
        "event": "subscription.activated",
        "contains": ["subscription"],
        "payload": {
            "subscription": {
                "entity": {
                    "id": "sub_TEST00000001",
                    "plan_id": "plan_monthly",
                    "status": "active",
                    "notes": { "userId": user_id }
                }
            }
        },
        "created_at": 1700000000
    }))
    .unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_check_reports_running() {
    let app = router(Arc::default(), Arc::default());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ChatBud Backend Running");
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn subscription_activated_upgrades_user() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());

    let response = app
        .oneshot(signed(&subscription_activated(json!("u1"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(
        *users.plans.lock().unwrap(),
        vec![("u1".to_string(), "premium")]
    );
}

#[tokio::test]
async fn payment_captured_upgrades_user() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = serde_json::to_vec(&json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": { "id": "pay_TEST", "amount": 49900, "notes": { "userId": "u2" } }
            }
        }
    }))
    .unwrap();

    let response = app.oneshot(signed(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(
        *users.plans.lock().unwrap(),
        vec![("u2".to_string(), "premium")]
    );
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_write() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = subscription_activated(json!("u1"));
    let wrong = compute_signature(&body, "not_the_secret");

    let response = app
        .oneshot(webhook_request(&body, Some(&wrong)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid signature");
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());

    let response = app
        .oneshot(webhook_request(&subscription_activated(json!("u1")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let original = subscription_activated(json!("u1"));
    let sig = compute_signature(&original, WEBHOOK_SECRET);
    let tampered = subscription_activated(json!("u9"));

    let response = app
        .oneshot(webhook_request(&tampered, Some(&sig)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unrecognized_event_is_acknowledged() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = serde_json::to_vec(&json!({
        "event": "subscription.charged",
        "payload": { "subscription": { "entity": { "notes": { "userId": "u1" } } } }
    }))
    .unwrap();

    let response = app.oneshot(signed(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "No user linked");
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_user_id_is_acknowledged() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());

    let response = app
        .oneshot(signed(&subscription_activated(json!(""))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "No user linked");
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_notes_object_is_acknowledged() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = br#"{"event":"subscription.activated","payload":{"subscription":{"entity":{"id":"sub_1"}}}}"#;

    let response = app.oneshot(signed(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "No user linked");
    assert!(users.plans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signed_non_json_body_is_bad_request() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());

    let response = app.oneshot(signed(b"event=payment.captured")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid payload");
}

#[tokio::test]
async fn store_failure_is_server_error() {
    let users = Arc::new(MemoryUsers {
        fail: true,
        ..Default::default()
    });
    let app = router(users, Arc::default());

    let response = app
        .oneshot(signed(&subscription_activated(json!("u1"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Server error");
}

#[tokio::test]
async fn replayed_webhook_is_harmless() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = subscription_activated(json!("u1"));

    for _ in 0..2 {
        let response = app.clone().oneshot(signed(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    let plans = users.plans.lock().unwrap();
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|(id, plan)| id == "u1" && *plan == "premium"));
}

#[tokio::test]
async fn whitespace_in_raw_body_is_part_of_the_signature() {
    let users = Arc::new(MemoryUsers::default());
    let app = router(users.clone(), Arc::default());
    let body = b"{\n  \"event\": \"payment.captured\",\n  \"payload\": {\"payment\": {\"entity\": {\"notes\": {\"userId\": \"u3\"}}}}\n}\n";

    let response = app.oneshot(signed(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *users.plans.lock().unwrap(),
        vec![("u3".to_string(), "premium")]
    );
}

// =============================================================================
// Create subscription
// =============================================================================

#[tokio::test]
async fn create_subscription_returns_id_and_key() {
    let gateway = Arc::new(FakeGateway::default());
    let app = router(Arc::default(), gateway.clone());

    let response = app
        .oneshot(subscription_request(
            r#"{"userId":"u1","planId":"plan_monthly"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "subscriptionId": "sub_TEST00000001", "razorpayKey": KEY_ID })
    );
    assert_eq!(
        *gateway.calls.lock().unwrap(),
        vec![("plan_monthly".to_string(), "u1".to_string())]
    );
}

#[tokio::test]
async fn create_subscription_forwards_ids_unchanged() {
    let gateway = Arc::new(FakeGateway::default());
    let app = router(Arc::default(), gateway.clone());

    let response = app
        .oneshot(subscription_request(
            r#"{"userId":" u1 ","planId":"plan_monthly "}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *gateway.calls.lock().unwrap(),
        vec![("plan_monthly ".to_string(), " u1 ".to_string())]
    );
}

#[tokio::test]
async fn create_subscription_requires_both_fields() {
    for body in [
        r#"{"userId":"u1"}"#,
        r#"{"planId":"plan_monthly"}"#,
        r#"{"userId":"","planId":"plan_monthly"}"#,
        r#"{"userId":"u1","planId":"   "}"#,
        r#"{}"#,
    ] {
        let gateway = Arc::new(FakeGateway::default());
        let app = router(Arc::default(), gateway.clone());

        let response = app.oneshot(subscription_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing userId or planId" })
        );
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn create_subscription_requires_string_ids() {
    let gateway = Arc::new(FakeGateway::default());
    let app = router(Arc::default(), gateway.clone());

    let response = app
        .oneshot(subscription_request(r#"{"userId":42,"planId":"plan_monthly"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing userId or planId" })
    );
    assert!(gateway.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_subscription_rejects_unparseable_body() {
    let app = router(Arc::default(), Arc::default());

    let response = app
        .oneshot(subscription_request("userId=u1&planId=p"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_failure_is_server_error() {
    let gateway = Arc::new(FakeGateway {
        fail: true,
        ..Default::default()
    });
    let app = router(Arc::default(), gateway);

    let response = app
        .oneshot(subscription_request(
            r#"{"userId":"u1","planId":"plan_missing"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Subscription creation failed" })
    );
}
