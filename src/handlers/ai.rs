use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::assistant::{
    AnalyzeBlueprintRequest, RegisterBlueprintRequest, SendMessageRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn register_blueprint(
    State(state): State<AppState>,
    Json(payload): Json<RegisterBlueprintRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let blueprint = state.services.assistant.register_blueprint(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(blueprint))))
}

#[utoipa::path(
    post,
    path = "/api/v1/ai/analyze-blueprint",
    request_body = AnalyzeBlueprintRequest,
    responses(
        (status = 200, description = "Material and labor recommendations"),
        (status = 404, description = "Blueprint not found"),
        (status = 504, description = "Assistant run timed out")
    ),
    tag = "ai"
)]
pub async fn analyze_blueprint(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeBlueprintRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let analysis = state.services.assistant.analyze_blueprint(payload).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

pub async fn create_thread(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let thread_id = state.services.assistant.create_thread().await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "thread_id": thread_id
    }))))
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let reply = state.services.assistant.send_message(payload).await?;
    Ok(Json(ApiResponse::success(reply)))
}

pub async fn list_thread_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let messages = state.services.assistant.list_messages(&thread_id).await?;
    Ok(Json(ApiResponse::success(messages)))
}
