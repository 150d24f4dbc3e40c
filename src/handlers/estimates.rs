use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::estimates::{
    CreateEstimateRequest, EstimateListParams, UpdateEstimateRequest, UpdateEstimateStatusRequest,
};
use crate::{errors::ServiceError, pdf, ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/api/v1/estimates",
    request_body = CreateEstimateRequest,
    responses(
        (status = 201, description = "Estimate created with its material lines"),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Project or customer not found")
    ),
    tag = "estimates"
)]
pub async fn create_estimate(
    State(state): State<AppState>,
    Json(payload): Json<CreateEstimateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimate = state.services.estimates.create_estimate(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(estimate))))
}

#[utoipa::path(
    get,
    path = "/api/v1/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate id")),
    responses(
        (status = 200, description = "Hydrated estimate"),
        (status = 404, description = "Estimate not found")
    ),
    tag = "estimates"
)]
pub async fn get_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimate = state.services.estimates.get_estimate(id).await?;
    Ok(Json(ApiResponse::success(estimate)))
}

pub async fn list_estimates(
    State(state): State<AppState>,
    Query(params): Query<EstimateListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimates = state.services.estimates.list_estimates(params).await?;
    Ok(Json(ApiResponse::success(estimates)))
}

#[utoipa::path(
    put,
    path = "/api/v1/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate id")),
    request_body = UpdateEstimateRequest,
    responses(
        (status = 200, description = "Estimate with its material set replaced"),
        (status = 404, description = "Estimate not found")
    ),
    tag = "estimates"
)]
pub async fn update_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEstimateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimate = state.services.estimates.update_estimate(id, payload).await?;
    Ok(Json(ApiResponse::success(estimate)))
}

pub async fn update_estimate_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEstimateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimate = state.services.estimates.update_status(id, payload).await?;
    Ok(Json(ApiResponse::success(estimate)))
}

pub async fn delete_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.estimates.delete_estimate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_estimate_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let estimate = state.services.estimates.get_estimate(id).await?;
    let bytes = pdf::render_estimate(&estimate)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"estimate-{id}.pdf\""))
            .map_err(|e| ServiceError::InternalError(e.to_string()))?,
    );

    Ok((headers, bytes))
}
