use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::billing::{
    CreateBillingCustomerRequest, CreatePaymentIntentRequest, CreateSubscriptionRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn create_billing_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateBillingCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = state.services.billing.create_customer(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::json!({
            "billing_customer_id": customer_id
        }))),
    ))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let subscription = state.services.billing.create_subscription(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(subscription))))
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let subscription = state.services.billing.cancel_subscription(id).await?;
    Ok(Json(ApiResponse::success(subscription)))
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let intent = state.services.billing.create_payment_intent(payload).await?;
    Ok(Json(ApiResponse::success(intent)))
}

/// Provider webhook: signature-verified, unauthenticated.
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, ServiceError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    state.services.billing.handle_webhook(signature, &body).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({"received": true}))))
}
