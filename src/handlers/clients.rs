use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::PaginationParams;
use crate::services::clients::{CreateClientRequest, UpdateClientRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let client = state.services.clients.create_client(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(client))))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let client = state.services.clients.get_client(id).await?;
    Ok(Json(ApiResponse::success(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let client = state.services.clients.update_client(id, payload).await?;
    Ok(Json(ApiResponse::success(client)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.clients.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let clients = state
        .services
        .clients
        .list_clients(params.page, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(clients)))
}
