use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::labor::{CalculateLaborRequest, UpsertLaborRateRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/api/v1/labor/calculate",
    request_body = CalculateLaborRequest,
    responses(
        (status = 200, description = "Labor cost with per-factor breakdown"),
        (status = 404, description = "No labor rate for the client and project type"),
        (status = 400, description = "Invalid area or complexity")
    ),
    tag = "labor"
)]
pub async fn calculate_labor(
    State(state): State<AppState>,
    Json(payload): Json<CalculateLaborRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let calculation = state.services.labor.calculate(payload).await?;
    Ok(Json(ApiResponse::success(calculation)))
}

pub async fn get_labor_rates(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let rates = state.services.labor.list_rates(client_id).await?;
    Ok(Json(ApiResponse::success(rates)))
}

pub async fn create_labor_rate(
    State(state): State<AppState>,
    Json(payload): Json<UpsertLaborRateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let rate = state.services.labor.create_rate(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(rate))))
}

pub async fn update_labor_rate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertLaborRateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let rate = state.services.labor.update_rate(id, payload).await?;
    Ok(Json(ApiResponse::success(rate)))
}
