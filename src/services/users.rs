use crate::{
    db::DbPool,
    entities::client::Entity as ClientEntity,
    entities::role::Entity as RoleEntity,
    entities::user::{self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel},
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
pub struct CreateUserRequest {
    pub client_id: Option<Uuid>,
    pub role_id: Uuid,
    #[validate(length(min = 1, message = "user name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub role_id: Uuid,
    #[validate(length(min = 1, message = "user name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        RoleEntity::find_by_id(request.role_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Role not found".to_string()))?;

        if let Some(client_id) = request.client_id {
            ClientEntity::find_by_id(client_id)
                .one(&*self.db_pool)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))?;
        }

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(&*self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                request.email
            )));
        }

        let model = UserActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(request.client_id),
            role_id: Set(request.role_id),
            name: Set(request.name),
            email: Set(request.email),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(user_id = %model.id, "user created");
        Ok(model)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        UserEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, request), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        RoleEntity::find_by_id(request.role_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Role not found".to_string()))?;

        let user = self.get_user(id).await?;
        let mut active: UserActiveModel = user.into();
        active.role_id = Set(request.role_id);
        active.name = Set(request.name);
        active.email = Set(request.email);
        active.active = Set(request.active);
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let user = self.get_user(id).await?;
        user.delete(&*self.db_pool).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn list_users(&self, page: u64, limit: u64) -> Result<UserListResponse, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let paginator = UserEntity::find()
            .order_by_asc(user::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page - 1).await?;

        Ok(UserListResponse {
            users,
            total,
            page,
            limit,
        })
    }
}
