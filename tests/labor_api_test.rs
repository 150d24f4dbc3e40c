mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use effibuild_api::auth::consts as perm;
use effibuild_api::entities::labor_rate::ComplexityFactors;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

fn standard_factors() -> ComplexityFactors {
    ComplexityFactors {
        low: dec!(1),
        medium: dec!(1.3),
        high: dec!(1.6),
    }
}

#[tokio::test]
async fn framing_calculation_matches_reference_scenario() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_CREATE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/calculate",
            Some(&token),
            Some(json!({
                "client_id": client.id,
                "project_type": "framing",
                "area": "1000",
                "complexity": "medium",
                "additional_factors": ["height_work"]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let data = &body["data"];

    // 1000 × 0.4 = 400 base hours; × 1.3 (medium) = 520; × 1.3 (height) = 676
    assert_eq!(
        Decimal::from_str(data["breakdown"]["base_hours"].as_str().unwrap()).unwrap(),
        dec!(400)
    );
    assert_eq!(
        Decimal::from_str(data["hours"].as_str().unwrap()).unwrap(),
        dec!(676)
    );
    assert_eq!(
        Decimal::from_str(data["total_cost"].as_str().unwrap()).unwrap(),
        dec!(50700)
    );
    assert_eq!(
        Decimal::from_str(data["complexity_factor"].as_str().unwrap()).unwrap(),
        dec!(1.3)
    );

    let adjustments = data["breakdown"]["adjustments"].as_array().unwrap();
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0]["factor"], "height_work");
}

#[tokio::test]
async fn missing_rate_is_not_found_not_zero() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_CREATE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/calculate",
            Some(&token),
            Some(json!({
                "client_id": client.id,
                "project_type": "framing",
                "area": "1000",
                "complexity": "medium"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_area_is_rejected() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_CREATE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/calculate",
            Some(&token),
            Some(json!({
                "client_id": client.id,
                "project_type": "framing",
                "area": "-50",
                "complexity": "medium"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_complexity_is_rejected() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_CREATE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/calculate",
            Some(&token),
            Some(json!({
                "client_id": client.id,
                "project_type": "framing",
                "area": "100",
                "complexity": "extreme"
            })),
        )
        .await;
    // Rejected at deserialization of the typed complexity enum
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn rates_listing_returns_client_rates() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    app.seed_labor_rate(client.id, "roofing", dec!(85), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_READ]);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/labor/rates/{}", client.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rates = body["data"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["project_type"], "framing");
    assert_eq!(rates[1]["project_type"], "roofing");
}

#[tokio::test]
async fn duplicate_rate_for_project_type_conflicts() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::LABOR_MANAGE]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/rates",
            Some(&token),
            Some(json!({
                "client_id": client.id,
                "project_type": "framing",
                "base_rate": "80",
                "complexity_factors": {"low": "1", "medium": "1.2", "high": "1.5"}
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rate_lookup_is_scoped_to_client() {
    let app = TestApp::new().await;
    let client = app.seed_client().await;
    app.seed_labor_rate(client.id, "framing", dec!(75), standard_factors())
        .await;
    let token = app.token_with_permissions(&[perm::ESTIMATES_CREATE]);

    // A different client has no framing rate
    let response = app
        .request(
            Method::POST,
            "/api/v1/labor/calculate",
            Some(&token),
            Some(json!({
                "client_id": Uuid::new_v4(),
                "project_type": "framing",
                "area": "100",
                "complexity": "low"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
