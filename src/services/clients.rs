use crate::{
    db::DbPool,
    entities::client::{self, ActiveModel as ClientActiveModel, Entity as ClientEntity, Model as ClientModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "client name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, message = "client name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// CRUD over the tenancy boundary entity.
#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request))]
    pub async fn create_client(
        &self,
        request: CreateClientRequest,
    ) -> Result<ClientModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let model = ClientActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            email: Set(request.email),
            phone: Set(request.phone),
            address: Set(request.address),
            billing_customer_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(client_id = %model.id, "client created");
        Ok(model)
    }

    pub async fn get_client(&self, id: Uuid) -> Result<ClientModel, ServiceError> {
        ClientEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))
    }

    #[instrument(skip(self, request), fields(client_id = %id))]
    pub async fn update_client(
        &self,
        id: Uuid,
        request: UpdateClientRequest,
    ) -> Result<ClientModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let client = self.get_client(id).await?;
        let mut active: ClientActiveModel = client.into();
        active.name = Set(request.name);
        active.email = Set(request.email);
        active.phone = Set(request.phone);
        active.address = Set(request.address);
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(client_id = %id))]
    pub async fn delete_client(&self, id: Uuid) -> Result<(), ServiceError> {
        let client = self.get_client(id).await?;
        client.delete(&*self.db_pool).await?;
        info!(client_id = %id, "client deleted");
        Ok(())
    }

    pub async fn list_clients(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<ClientListResponse, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let paginator = ClientEntity::find()
            .order_by_asc(client::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let clients = paginator.fetch_page(page - 1).await?;

        Ok(ClientListResponse {
            clients,
            total,
            page,
            limit,
        })
    }

    /// Records the payment-provider customer id after billing onboarding.
    pub async fn set_billing_customer_id(
        &self,
        id: Uuid,
        billing_customer_id: String,
    ) -> Result<ClientModel, ServiceError> {
        let client = self.get_client(id).await?;
        let mut active: ClientActiveModel = client.into();
        active.billing_customer_id = Set(Some(billing_customer_id));
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db_pool).await?)
    }
}
