//! Test harness: an application instance backed by a throwaway SQLite file,
//! with the external collaborators (supplier, payment provider, assistant)
//! replaced by in-memory stubs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use effibuild_api::{
    auth::{AuthVerifier, Claims},
    config::AppConfig,
    db,
    entities::{client, customer, labor_rate, project},
    errors::ServiceError,
    events::EventSender,
    handlers::AppServices,
    services::assistant::{AssistantApi, AssistantMessage, RunState},
    services::billing::{
        PaymentProviderApi, ProviderCustomer, ProviderPaymentIntent, ProviderSubscription,
    },
    services::supplier::{SupplierApi, SupplierPrice, SupplierProduct},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "integration_test_secret_key_long_enough_for_validation";
const TEST_WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Supplier stub with a mutable price table keyed by SKU.
#[derive(Default)]
pub struct StubSupplier {
    pub prices: Mutex<HashMap<String, Decimal>>,
}

impl StubSupplier {
    pub fn set_price(&self, sku: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(sku.to_string(), price);
    }
}

#[async_trait]
impl SupplierApi for StubSupplier {
    async fn get_product_price(&self, sku: &str) -> Result<SupplierPrice, ServiceError> {
        self.prices
            .lock()
            .unwrap()
            .get(sku)
            .map(|price| SupplierPrice { price: *price })
            .ok_or_else(|| ServiceError::NotFound(format!("supplier has no product {sku}")))
    }

    async fn get_product_details(&self, sku: &str) -> Result<SupplierProduct, ServiceError> {
        if !self.prices.lock().unwrap().contains_key(sku) {
            return Err(ServiceError::NotFound(format!(
                "supplier has no product {sku}"
            )));
        }
        Ok(SupplierProduct {
            name: format!("Product {sku}"),
            description: Some(format!("Supplier item {sku}")),
            category: "lumber".to_string(),
            unit: "piece".to_string(),
        })
    }
}

/// Payment provider stub issuing deterministic ids.
#[derive(Default)]
pub struct StubPaymentProvider {
    counter: AtomicU32,
}

#[async_trait]
impl PaymentProviderApi for StubPaymentProvider {
    async fn create_customer(
        &self,
        _email: &str,
        _name: &str,
    ) -> Result<ProviderCustomer, ServiceError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderCustomer {
            id: format!("cus_test_{n}"),
        })
    }

    async fn create_subscription(
        &self,
        _customer_id: &str,
        _plan: &str,
    ) -> Result<ProviderSubscription, ServiceError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderSubscription {
            id: format!("sub_test_{n}"),
            status: "active".to_string(),
            current_period_end: Some(Utc::now().timestamp() + 2_592_000),
        })
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ServiceError> {
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            status: "canceled".to_string(),
            current_period_end: None,
        })
    }

    async fn create_payment_intent(
        &self,
        _amount_cents: i64,
        _currency: &str,
    ) -> Result<ProviderPaymentIntent, ServiceError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderPaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: Some(format!("pi_test_{n}_secret")),
            status: "requires_payment_method".to_string(),
        })
    }
}

/// Assistant stub that completes immediately with a canned analysis.
pub struct StubAssistant {
    pub reply: Mutex<String>,
}

impl Default for StubAssistant {
    fn default() -> Self {
        Self {
            reply: Mutex::new(
                r#"{
                    "materials": [
                        {"name": "2x4 Lumber", "description": "Framing lumber", "quantity": 120, "unit_price": 3.5, "unit": "piece"}
                    ],
                    "labor_estimate": {"hours": 40, "rate": 75, "total": 3000},
                    "recommendations": ["Order 10% extra lumber"]
                }"#
                .to_string(),
            ),
        }
    }
}

#[async_trait]
impl AssistantApi for StubAssistant {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        Ok(format!("thread_{}", Uuid::new_v4().simple()))
    }

    async fn add_message(&self, _thread_id: &str, _content: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<String, ServiceError> {
        Ok(format!("run_{}", Uuid::new_v4().simple()))
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<RunState, ServiceError> {
        Ok(RunState {
            id: run_id.to_string(),
            status: "completed".to_string(),
        })
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<AssistantMessage>, ServiceError> {
        Ok(vec![AssistantMessage {
            id: "msg_1".to_string(),
            role: "assistant".to_string(),
            content: self.reply.lock().unwrap().clone(),
        }])
    }
}

/// Helper harness spinning up application state over a fresh SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub supplier: Arc<StubSupplier>,
    pub assistant: Arc<StubAssistant>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("effibuild_test_{}.db", Uuid::new_v4()));
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.billing_webhook_secret = Some(TEST_WEBHOOK_SECRET.to_string());
        cfg.assistant_id = Some("asst_test".to_string());
        cfg.assistant_poll_interval_ms = 0;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(effibuild_api::events::process_events(event_rx));

        let supplier = Arc::new(StubSupplier::default());
        let assistant = Arc::new(StubAssistant::default());
        let payment_provider = Arc::new(StubPaymentProvider::default());

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            supplier.clone(),
            payment_provider,
            assistant.clone(),
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let auth_verifier = Arc::new(AuthVerifier::new(
            &cfg.jwt_secret,
            &cfg.auth_issuer,
            &cfg.auth_audience,
        ));

        let router = Router::new()
            .route("/", get(|| async { "up" }))
            .nest("/api/v1", effibuild_api::api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_verifier,
                |axum::extract::State(verifier): axum::extract::State<Arc<AuthVerifier>>,
                 mut req: axum::http::Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(verifier);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            supplier,
            assistant,
            _event_task: event_task,
        }
    }

    /// Signs a token carrying the given permissions.
    pub fn token_with_permissions(&self, permissions: &[&str]) -> String {
        self.sign_token("estimator", permissions)
    }

    /// Signs a token for the role that bypasses permission checks.
    pub fn master_admin_token(&self) -> String {
        self.sign_token("master_admin", &[])
    }

    fn sign_token(&self, role: &str, permissions: &[&str]) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            client_id: None,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
            iss: self.state.config.auth_issuer.clone(),
            aud: self.state.config.auth_audience.clone(),
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("token signing should not fail")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request should build"),
            None => builder.body(Body::empty()).expect("request should build"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level")
    }

    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: String,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::from(body))
            .expect("request should build");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level")
    }

    // Seed helpers

    pub async fn seed_client(&self) -> client::Model {
        client::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Hartwell Construction".to_string()),
            email: Set(Some("office@hartwell.example".to_string())),
            phone: Set(Some("555-0199".to_string())),
            address: Set(None),
            billing_customer_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed client")
    }

    pub async fn seed_project(&self, client_id: Uuid, project_type: &str) -> project::Model {
        project::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(client_id),
            name: Set("Garage extension".to_string()),
            description: Set(None),
            project_type: Set(project_type.to_string()),
            status: Set("active".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed project")
    }

    pub async fn seed_customer(&self, client_id: Uuid) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(client_id),
            name: Set("Jordan Fields".to_string()),
            email: Set(Some("jordan@example.com".to_string())),
            phone: Set(Some("555-0100".to_string())),
            address: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer")
    }

    pub async fn seed_labor_rate(
        &self,
        client_id: Uuid,
        project_type: &str,
        base_rate: Decimal,
        factors: labor_rate::ComplexityFactors,
    ) -> labor_rate::Model {
        labor_rate::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(client_id),
            project_type: Set(project_type.to_string()),
            base_rate: Set(base_rate),
            complexity_factors: Set(factors),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed labor rate")
    }
}

/// Reads a response body into JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
