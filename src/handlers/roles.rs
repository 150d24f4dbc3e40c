use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::PaginationParams;
use crate::services::roles::UpsertRoleRequest;
use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<UpsertRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state.services.roles.create_role(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state.services.roles.get_role(id).await?;
    Ok(Json(ApiResponse::success(role)))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state.services.roles.update_role(id, payload).await?;
    Ok(Json(ApiResponse::success(role)))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.roles.delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let roles = state
        .services
        .roles
        .list_roles(params.page, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(roles)))
}
