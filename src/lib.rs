//! EffiBuild API Library
//!
//! Core functionality for the EffiBuild construction-estimation backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod pdf;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Full v1 API surface with per-resource permission gating.
pub fn api_v1_routes() -> Router<AppState> {
    // Estimates routes with permission gating
    let estimates_read = Router::new()
        .route("/estimates", get(handlers::estimates::list_estimates))
        .route("/estimates/:id", get(handlers::estimates::get_estimate))
        .route(
            "/estimates/:id/pdf",
            get(handlers::estimates::export_estimate_pdf),
        )
        .with_permission(perm::ESTIMATES_READ);

    let estimates_create = Router::new()
        .route(
            "/estimates",
            axum::routing::post(handlers::estimates::create_estimate),
        )
        .with_permission(perm::ESTIMATES_CREATE);

    let estimates_update = Router::new()
        .route(
            "/estimates/:id",
            axum::routing::put(handlers::estimates::update_estimate),
        )
        .route(
            "/estimates/:id/status",
            axum::routing::put(handlers::estimates::update_estimate_status),
        )
        .with_permission(perm::ESTIMATES_UPDATE);

    let estimates_delete = Router::new()
        .route(
            "/estimates/:id",
            axum::routing::delete(handlers::estimates::delete_estimate),
        )
        .with_permission(perm::ESTIMATES_DELETE);

    // Labor routes: lookups ride on the estimate permissions, rate
    // administration has its own
    // Same :id segment name as the PUT below; the GET binds it as a client id
    let labor_read = Router::new()
        .route("/labor/rates/:id", get(handlers::labor::get_labor_rates))
        .with_permission(perm::ESTIMATES_READ);

    let labor_calculate = Router::new()
        .route(
            "/labor/calculate",
            axum::routing::post(handlers::labor::calculate_labor),
        )
        .with_permission(perm::ESTIMATES_CREATE);

    let labor_manage = Router::new()
        .route(
            "/labor/rates",
            axum::routing::post(handlers::labor::create_labor_rate),
        )
        .route(
            "/labor/rates/:id",
            axum::routing::put(handlers::labor::update_labor_rate),
        )
        .with_permission(perm::LABOR_MANAGE);

    // Material catalog
    let materials_read = Router::new()
        .route("/materials/search", get(handlers::materials::search_materials))
        .route(
            "/materials/:id/price-history",
            get(handlers::materials::get_price_history),
        )
        .with_permission(perm::ESTIMATES_READ);

    let materials_sync = Router::new()
        .route(
            "/materials/sync",
            axum::routing::post(handlers::materials::sync_material),
        )
        .route(
            "/materials/sync-all",
            axum::routing::post(handlers::materials::sync_all_materials),
        )
        .with_permission(perm::MATERIALS_SYNC);

    // Tenancy administration
    let clients = Router::new()
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .with_permission(perm::CLIENTS_MANAGE);

    let projects = Router::new()
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .with_permission(perm::PROJECTS_MANAGE);

    let customers = Router::new()
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .with_permission(perm::CUSTOMERS_MANAGE);

    let users = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .with_permission(perm::USERS_MANAGE);

    let roles = Router::new()
        .route(
            "/roles",
            get(handlers::roles::list_roles).post(handlers::roles::create_role),
        )
        .route(
            "/roles/:id",
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role),
        )
        .with_permission(perm::ROLES_MANAGE);

    // Billing (webhook is signature-verified, not token-authenticated)
    let billing = Router::new()
        .route(
            "/billing/customers",
            axum::routing::post(handlers::billing::create_billing_customer),
        )
        .route(
            "/billing/subscriptions",
            axum::routing::post(handlers::billing::create_subscription),
        )
        .route(
            "/billing/subscriptions/:id",
            axum::routing::delete(handlers::billing::cancel_subscription),
        )
        .route(
            "/billing/payment-intents",
            axum::routing::post(handlers::billing::create_payment_intent),
        )
        .with_permission(perm::BILLING_MANAGE);

    let billing_webhook = Router::new().route(
        "/billing/webhook",
        axum::routing::post(handlers::billing::billing_webhook),
    );

    // AI assistant
    let ai_blueprints = Router::new()
        .route(
            "/ai/blueprints",
            axum::routing::post(handlers::ai::register_blueprint),
        )
        .route(
            "/ai/analyze-blueprint",
            axum::routing::post(handlers::ai::analyze_blueprint),
        )
        .with_permission(perm::ESTIMATES_CREATE);

    let ai_chat = Router::new()
        .route("/ai/threads", axum::routing::post(handlers::ai::create_thread))
        .route("/ai/messages", axum::routing::post(handlers::ai::send_message))
        .route(
            "/ai/threads/:thread_id/messages",
            get(handlers::ai::list_thread_messages),
        )
        .with_permission(perm::AI_USE);

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Estimates API
        .merge(estimates_read)
        .merge(estimates_create)
        .merge(estimates_update)
        .merge(estimates_delete)
        // Labor API
        .merge(labor_read)
        .merge(labor_calculate)
        .merge(labor_manage)
        // Materials API
        .merge(materials_read)
        .merge(materials_sync)
        // Tenancy administration
        .merge(clients)
        .merge(projects)
        .merge(customers)
        .merge(users)
        .merge(roles)
        // Billing API
        .merge(billing)
        .merge(billing_webhook)
        // AI assistant API
        .merge(ai_blueprints)
        .merge(ai_chat)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "effibuild-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }
}
