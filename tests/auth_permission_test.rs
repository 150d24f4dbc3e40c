mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use effibuild_api::auth::consts as perm;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/estimates", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/estimates",
            Some("not-a-real-token"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_without_permission_is_forbidden() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_READ]);

    // estimates:read does not grant create
    let response = app
        .request(
            Method::POST,
            "/api/v1/estimates",
            Some(&token),
            Some(json!({
                "project_id": Uuid::new_v4(),
                "customer_id": Uuid::new_v4(),
                "materials": [{"name": "x", "quantity": "1", "unit_price": "1", "unit": "piece"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn master_admin_bypasses_permission_checks() {
    let app = TestApp::new().await;
    let token = app.master_admin_token();

    let response = app
        .request(Method::GET, "/api/v1/estimates", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn permission_gate_is_per_resource() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_READ]);

    // A valid estimates permission does not open the clients API
    let response = app
        .request(Method::GET, "/api/v1/clients", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_endpoint_needs_no_auth() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
