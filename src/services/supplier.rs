//! Supplier pricing collaborator.
//!
//! The catalog sync consumes this through the `SupplierApi` trait so tests can
//! substitute an in-memory stub for the real OAuth-authenticated client.

use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{error, instrument};

/// Current price for a supplier SKU.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierPrice {
    pub price: Decimal,
}

/// Catalog details for a supplier SKU, used when seeding a new material.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub unit: String,
}

#[async_trait]
pub trait SupplierApi: Send + Sync {
    async fn get_product_price(&self, sku: &str) -> Result<SupplierPrice, ServiceError>;
    async fn get_product_details(&self, sku: &str) -> Result<SupplierProduct, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct AuthTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Lowe's-style pricing client: OAuth2 client-credentials with a cached
/// bearer token, refreshed shortly before expiry.
pub struct LowesClient {
    client: reqwest::Client,
    base_url: String,
    auth_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    token: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl LowesClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(StdDuration::from_secs(10))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: cfg.supplier_api_url.trim_end_matches('/').to_string(),
            auth_url: cfg.supplier_auth_url.clone(),
            client_id: cfg.supplier_client_id.clone(),
            client_secret: cfg.supplier_client_secret.clone(),
            token: RwLock::new(None),
        }
    }

    async fn auth_token(&self) -> Result<String, ServiceError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Utc::now() < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => {
                return Err(ServiceError::ExternalServiceError(
                    "supplier credentials are not configured".to_string(),
                ))
            }
        };

        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "supplier token request failed");
                ServiceError::ExternalServiceError(format!("supplier auth failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "supplier auth returned {}",
                response.status()
            )));
        }

        let token: AuthTokenResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("supplier auth response malformed: {e}"))
        })?;

        // Refresh one minute early so requests never race the expiry.
        let expires_at = Utc::now() + Duration::seconds((token.expires_in - 60).max(0));
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    #[instrument(skip(self), fields(endpoint = %endpoint))]
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, ServiceError> {
        let token = self.auth_token().await?;
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "supplier request failed");
                ServiceError::ExternalServiceError(format!("supplier request failed: {e}"))
            })?;

        match response.status() {
            status if status.is_success() => response.json::<T>().await.map_err(|e| {
                ServiceError::ExternalServiceError(format!("supplier response malformed: {e}"))
            }),
            reqwest::StatusCode::NOT_FOUND => Err(ServiceError::NotFound(format!(
                "supplier has no product at {endpoint}"
            ))),
            status => Err(ServiceError::ExternalServiceError(format!(
                "supplier returned {status} for {endpoint}"
            ))),
        }
    }
}

#[async_trait]
impl SupplierApi for LowesClient {
    async fn get_product_price(&self, sku: &str) -> Result<SupplierPrice, ServiceError> {
        self.request(&format!("/pricing/{sku}")).await
    }

    async fn get_product_details(&self, sku: &str) -> Result<SupplierProduct, ServiceError> {
        self.request(&format!("/products/{sku}")).await
    }
}
