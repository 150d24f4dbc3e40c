mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use effibuild_api::auth::consts as perm;
use effibuild_api::entities::invoice::{Column as InvoiceColumn, Entity as InvoiceEntity};
use effibuild_api::entities::subscription::Entity as SubscriptionEntity;
use effibuild_api::services::billing::WebhookVerifier;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

const WEBHOOK_SECRET: &str = "whsec_integration_test";

fn signed_header(payload: &str) -> String {
    let verifier = WebhookVerifier::new(WEBHOOK_SECRET.to_string());
    let signature = verifier.sign("1700000000", payload);
    format!("t=1700000000,v1={signature}")
}

#[tokio::test]
async fn billing_customer_then_subscription_flow() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    let token = app.token_with_permissions(&[perm::BILLING_MANAGE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/billing/customers",
            Some(&token),
            Some(json!({"client_id": client.id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let billing_customer_id = body["data"]["billing_customer_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(billing_customer_id.starts_with("cus_test_"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/billing/subscriptions",
            Some(&token),
            Some(json!({"client_id": client.id, "plan": "price_pro_monthly"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["plan"], "price_pro_monthly");

    let subscription_id = Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap();
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/billing/subscriptions/{subscription_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let saved = SubscriptionEntity::find_by_id(subscription_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.status, "canceled");
}

#[tokio::test]
async fn subscription_without_billing_customer_is_rejected() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    let token = app.token_with_permissions(&[perm::BILLING_MANAGE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/billing/subscriptions",
            Some(&token),
            Some(json!({"client_id": client.id, "plan": "price_pro_monthly"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_valid_signature_records_invoice() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    let token = app.token_with_permissions(&[perm::BILLING_MANAGE]);

    // Link the client to a provider customer first
    let body = body_json(
        app.request(
            Method::POST,
            "/api/v1/billing/customers",
            Some(&token),
            Some(json!({"client_id": client.id})),
        )
        .await,
    )
    .await;
    let customer_id = body["data"]["billing_customer_id"].as_str().unwrap().to_string();

    let payload = json!({
        "type": "invoice.paid",
        "data": {
            "object": {
                "id": "in_test_1",
                "customer": customer_id,
                "amount_due": 4900
            }
        }
    })
    .to_string();

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/billing/webhook",
            &[
                ("content-type", "application/json"),
                ("stripe-signature", &signed_header(&payload)),
            ],
            payload,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let invoice = InvoiceEntity::find()
        .filter(InvoiceColumn::ProviderInvoiceId.eq("in_test_1"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("invoice should be recorded");
    assert_eq!(invoice.status, "paid");
    assert_eq!(invoice.client_id, client.id);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let app = TestApp::new().await;
    let payload = json!({"type": "invoice.paid", "data": {"object": {}}}).to_string();

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/billing/webhook",
            &[
                ("content-type", "application/json"),
                ("stripe-signature", "t=1700000000,v1=deadbeef"),
            ],
            payload,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let app = TestApp::new().await;
    let payload = json!({"type": "invoice.paid", "data": {"object": {}}}).to_string();

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/billing/webhook",
            &[("content-type", "application/json")],
            payload,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unhandled_webhook_event_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({"type": "charge.refunded", "data": {"object": {}}}).to_string();

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/billing/webhook",
            &[
                ("content-type", "application/json"),
                ("stripe-signature", &signed_header(&payload)),
            ],
            payload,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
