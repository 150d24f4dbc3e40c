use crate::{
    db::DbPool,
    entities::client::Entity as ClientEntity,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "customer name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, message = "customer name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub client_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        ClientEntity::find_by_id(request.client_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))?;

        let model = CustomerActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(request.client_id),
            name: Set(request.name),
            email: Set(request.email),
            phone: Set(request.phone),
            address: Set(request.address),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(customer_id = %model.id, "customer created");
        Ok(model)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        CustomerEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }

    #[instrument(skip(self, request), fields(customer_id = %id))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let customer = self.get_customer(id).await?;
        let mut active: CustomerActiveModel = customer.into();
        active.name = Set(request.name);
        active.email = Set(request.email);
        active.phone = Set(request.phone);
        active.address = Set(request.address);
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        let customer = self.get_customer(id).await?;
        customer.delete(&*self.db_pool).await?;
        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn list_customers(
        &self,
        params: CustomerListParams,
    ) -> Result<CustomerListResponse, ServiceError> {
        let page = params.page.max(1);
        let limit = params.limit.clamp(1, 100);

        let mut query = CustomerEntity::find().order_by_asc(customer::Column::Name);
        if let Some(client_id) = params.client_id {
            query = query.filter(customer::Column::ClientId.eq(client_id));
        }

        let paginator = query.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page - 1).await?;

        Ok(CustomerListResponse {
            customers,
            total,
            page,
            limit,
        })
    }
}
