use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::projects::{CreateProjectRequest, ProjectListParams, UpdateProjectRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.create_project(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.get_project(id).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.update_project(id, payload).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.projects.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let projects = state.services.projects.list_projects(params).await?;
    Ok(Json(ApiResponse::success(projects)))
}
