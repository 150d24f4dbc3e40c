//! Billing collaborator.
//!
//! A thin HTTP client for a Stripe-style payment provider plus the local
//! subscription/invoice bookkeeping driven by its webhooks. The provider is
//! consumed through `PaymentProviderApi` so tests can stub it out.

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::client::{self, ActiveModel as ClientActiveModel, Entity as ClientEntity},
    entities::invoice::{self, ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity},
    entities::subscription::{
        self, ActiveModel as SubscriptionActiveModel, Entity as SubscriptionEntity,
        Model as SubscriptionModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[async_trait]
pub trait PaymentProviderApi: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
    ) -> Result<ProviderCustomer, ServiceError>;
    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: &str,
    ) -> Result<ProviderSubscription, ServiceError>;
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ServiceError>;
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
    ) -> Result<ProviderPaymentIntent, ServiceError>;
}

/// Form-encoded HTTP client for the payment provider.
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl StripeClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: cfg.billing_api_url.trim_end_matches('/').to_string(),
            api_key: cfg.billing_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ServiceError> {
        self.api_key.as_deref().ok_or_else(|| {
            ServiceError::ExternalServiceError("billing API key is not configured".to_string())
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        form: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(key)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "billing request failed");
                ServiceError::ExternalServiceError(format!("billing request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "billing provider returned {} for {endpoint}",
                response.status()
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("billing response malformed: {e}"))
        })
    }

    async fn delete<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, ServiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .delete(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "billing request failed");
                ServiceError::ExternalServiceError(format!("billing request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "billing provider returned {} for {endpoint}",
                response.status()
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("billing response malformed: {e}"))
        })
    }
}

#[async_trait]
impl PaymentProviderApi for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
    ) -> Result<ProviderCustomer, ServiceError> {
        self.post_form(
            "/customers",
            &[("email", email.to_string()), ("name", name.to_string())],
        )
        .await
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: &str,
    ) -> Result<ProviderSubscription, ServiceError> {
        self.post_form(
            "/subscriptions",
            &[
                ("customer", customer_id.to_string()),
                ("items[0][price]", plan.to_string()),
            ],
        )
        .await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ServiceError> {
        self.delete(&format!("/subscriptions/{subscription_id}")).await
    }

    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
    ) -> Result<ProviderPaymentIntent, ServiceError> {
        self.post_form(
            "/payment_intents",
            &[
                ("amount", amount_cents.to_string()),
                ("currency", currency.to_string()),
            ],
        )
        .await
    }
}

/// Verifies the provider's `t=<ts>,v1=<hex>` webhook signature header
/// (HMAC-SHA256 over `"{timestamp}.{payload}"`).
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn sign(&self, timestamp: &str, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn verify(&self, header: &str, payload: &str) -> Result<(), ServiceError> {
        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value.to_string()),
                Some(("v1", value)) => signature = Some(value.to_string()),
                _ => {}
            }
        }

        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => {
                return Err(ServiceError::Unauthorized(
                    "malformed webhook signature header".to_string(),
                ))
            }
        };

        let expected = self.sign(&timestamp, payload);
        if expected != signature {
            return Err(ServiceError::Unauthorized(
                "webhook signature mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBillingCustomerRequest {
    pub client_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "plan is required"))]
    pub plan: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentIntentRequest {
    pub amount: Decimal,
    #[validate(length(min = 3, max = 3, message = "currency must be 3 characters"))]
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

/// Links clients to provider customers, tracks subscriptions locally, and
/// applies webhook-driven invoice/subscription state changes.
#[derive(Clone)]
pub struct BillingService {
    db_pool: Arc<DbPool>,
    provider: Arc<dyn PaymentProviderApi>,
    webhook_secret: Option<String>,
    event_sender: Option<Arc<EventSender>>,
}

impl BillingService {
    pub fn new(
        db_pool: Arc<DbPool>,
        provider: Arc<dyn PaymentProviderApi>,
        webhook_secret: Option<String>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            provider,
            webhook_secret,
            event_sender,
        }
    }

    /// Registers the client with the payment provider and stores the provider
    /// customer id.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_customer(
        &self,
        request: CreateBillingCustomerRequest,
    ) -> Result<String, ServiceError> {
        let db = &*self.db_pool;
        let client = ClientEntity::find_by_id(request.client_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))?;

        if let Some(existing) = &client.billing_customer_id {
            return Ok(existing.clone());
        }

        let email = client.email.clone().unwrap_or_default();
        let customer = self.provider.create_customer(&email, &client.name).await?;

        let mut active: ClientActiveModel = client.into();
        active.billing_customer_id = Set(Some(customer.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(client_id = %request.client_id, "billing customer created");
        Ok(customer.id)
    }

    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let client = ClientEntity::find_by_id(request.client_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))?;

        let customer_id = client.billing_customer_id.clone().ok_or_else(|| {
            ServiceError::InvalidOperation(
                "Client has no billing customer; create one first".to_string(),
            )
        })?;

        let provider_sub = self
            .provider
            .create_subscription(&customer_id, &request.plan)
            .await?;

        let model = SubscriptionActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(request.client_id),
            provider_customer_id: Set(customer_id),
            provider_subscription_id: Set(provider_sub.id),
            plan: Set(request.plan),
            status: Set(provider_sub.status),
            current_period_end: Set(epoch_to_datetime(provider_sub.current_period_end)),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(subscription_id = %model.id, "subscription created");
        self.emit(Event::SubscriptionCreated(model.id)).await;
        Ok(model)
    }

    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn cancel_subscription(&self, id: Uuid) -> Result<SubscriptionModel, ServiceError> {
        let db = &*self.db_pool;
        let sub = SubscriptionEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Subscription not found".to_string()))?;

        let provider_sub = self
            .provider
            .cancel_subscription(&sub.provider_subscription_id)
            .await?;

        let mut active: SubscriptionActiveModel = sub.into();
        active.status = Set(provider_sub.status);
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(db).await?;

        info!(subscription_id = %id, "subscription canceled");
        self.emit(Event::SubscriptionCanceled(id)).await;
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }

        let amount_cents = (request.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::ValidationError("amount out of representable range".to_string())
            })?;

        let intent = self
            .provider
            .create_payment_intent(amount_cents, &request.currency.to_lowercase())
            .await?;

        Ok(PaymentIntentResponse {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }

    /// Applies a signature-verified webhook payload to local billing state.
    /// Unrecognized event types are acknowledged and ignored.
    #[instrument(skip(self, payload, signature_header))]
    pub async fn handle_webhook(
        &self,
        signature_header: Option<&str>,
        payload: &str,
    ) -> Result<(), ServiceError> {
        if let Some(secret) = &self.webhook_secret {
            let header = signature_header.ok_or_else(|| {
                ServiceError::Unauthorized("missing webhook signature".to_string())
            })?;
            WebhookVerifier::new(secret.clone()).verify(header, payload)?;
        }

        let envelope: WebhookEnvelope = serde_json::from_str(payload)
            .map_err(|e| ServiceError::ValidationError(format!("malformed webhook body: {e}")))?;

        match envelope.event_type.as_str() {
            "invoice.paid" | "invoice.payment_failed" => {
                self.apply_invoice_event(&envelope.event_type, &envelope.data.object)
                    .await
            }
            "customer.subscription.updated" | "customer.subscription.deleted" => {
                self.apply_subscription_event(&envelope.event_type, &envelope.data.object)
                    .await
            }
            other => {
                info!(event_type = %other, "ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn apply_invoice_event(
        &self,
        event_type: &str,
        object: &serde_json::Value,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let provider_invoice_id = object
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::ValidationError("invoice id missing".to_string()))?;
        let customer_id = object
            .get("customer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::ValidationError("invoice customer missing".to_string()))?;
        let amount_due_cents = object
            .get("amount_due")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let status = if event_type == "invoice.paid" {
            "paid"
        } else {
            "payment_failed"
        };

        let Some(client) = ClientEntity::find()
            .filter(client::Column::BillingCustomerId.eq(customer_id))
            .one(db)
            .await?
        else {
            warn!(customer_id = %customer_id, "webhook references unknown billing customer");
            return Ok(());
        };

        let amount_due = Decimal::new(amount_due_cents, 2);

        let existing = InvoiceEntity::find()
            .filter(invoice::Column::ProviderInvoiceId.eq(provider_invoice_id))
            .one(db)
            .await?;

        let invoice_id = match existing {
            Some(inv) => {
                let id = inv.id;
                let mut active: InvoiceActiveModel = inv.into();
                active.status = Set(status.to_string());
                active.amount_due = Set(amount_due);
                active.update(db).await?;
                id
            }
            None => {
                let model = InvoiceActiveModel {
                    id: Set(Uuid::new_v4()),
                    client_id: Set(client.id),
                    provider_invoice_id: Set(provider_invoice_id.to_string()),
                    amount_due: Set(amount_due),
                    status: Set(status.to_string()),
                    created_at: Set(Utc::now()),
                }
                .insert(db)
                .await?;
                model.id
            }
        };

        info!(invoice_id = %invoice_id, status = %status, "invoice state recorded");
        self.emit(Event::InvoiceRecorded(invoice_id)).await;
        Ok(())
    }

    async fn apply_subscription_event(
        &self,
        event_type: &str,
        object: &serde_json::Value,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let provider_subscription_id = object
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::ValidationError("subscription id missing".to_string()))?;

        let Some(sub) = SubscriptionEntity::find()
            .filter(subscription::Column::ProviderSubscriptionId.eq(provider_subscription_id))
            .one(db)
            .await?
        else {
            warn!(provider_subscription_id = %provider_subscription_id, "webhook references unknown subscription");
            return Ok(());
        };

        let sub_id = sub.id;
        let mut active: SubscriptionActiveModel = sub.into();

        if event_type == "customer.subscription.deleted" {
            active.status = Set("canceled".to_string());
        } else if let Some(status) = object.get("status").and_then(|v| v.as_str()) {
            active.status = Set(status.to_string());
        }
        if let Some(period_end) = object.get("current_period_end").and_then(|v| v.as_i64()) {
            active.current_period_end = Set(epoch_to_datetime(Some(period_end)));
        }
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(subscription_id = %sub_id, event_type = %event_type, "subscription state updated");
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send billing event");
            }
        }
    }
}

fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let verifier = WebhookVerifier::new("whsec_test".to_string());
        let payload = r#"{"type":"invoice.paid"}"#;
        let signature = verifier.sign("1700000000", payload);
        let header = format!("t=1700000000,v1={signature}");

        assert!(verifier.verify(&header, payload).is_ok());
    }

    #[test]
    fn tampered_payload_rejected() {
        let verifier = WebhookVerifier::new("whsec_test".to_string());
        let signature = verifier.sign("1700000000", r#"{"amount":100}"#);
        let header = format!("t=1700000000,v1={signature}");

        assert!(matches!(
            verifier.verify(&header, r#"{"amount":999}"#),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn malformed_header_rejected() {
        let verifier = WebhookVerifier::new("whsec_test".to_string());
        assert!(matches!(
            verifier.verify("v1=deadbeef", "{}"),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify("nonsense", "{}"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn epoch_conversion() {
        assert!(epoch_to_datetime(None).is_none());
        let dt = epoch_to_datetime(Some(1_700_000_000)).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
