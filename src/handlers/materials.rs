use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::materials::MaterialSearchParams;
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncMaterialRequest {
    pub sku: String,
}

pub async fn search_materials(
    State(state): State<AppState>,
    Query(params): Query<MaterialSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let materials = state.services.materials.search(params).await?;
    Ok(Json(ApiResponse::success(materials)))
}

pub async fn get_price_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = state.services.materials.price_history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/sync",
    request_body = SyncMaterialRequest,
    responses(
        (status = 200, description = "Sync outcome for the SKU"),
        (status = 502, description = "Supplier unavailable")
    ),
    tag = "materials"
)]
pub async fn sync_material(
    State(state): State<AppState>,
    Json(payload): Json<SyncMaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if payload.sku.trim().is_empty() {
        return Err(ServiceError::ValidationError("sku is required".to_string()));
    }
    let outcome = state.services.materials.sync_sku(&payload.sku).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn sync_all_materials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.materials.sync_all().await?;
    Ok(Json(ApiResponse::success(report)))
}
