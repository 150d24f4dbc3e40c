use crate::{
    db::DbPool,
    entities::role::{
        self, ActiveModel as RoleActiveModel, Entity as RoleEntity, Model as RoleModel,
        PermissionList,
    },
    entities::user::{self, Entity as UserEntity},
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
pub struct UpsertRoleRequest {
    #[validate(length(min = 1, message = "role name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleListResponse {
    pub roles: Vec<RoleModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct RoleService {
    db_pool: Arc<DbPool>,
}

impl RoleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request))]
    pub async fn create_role(&self, request: UpsertRoleRequest) -> Result<RoleModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let existing = RoleEntity::find()
            .filter(role::Column::Name.eq(request.name.clone()))
            .one(&*self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Role {} already exists",
                request.name
            )));
        }

        let model = RoleActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            permissions: Set(PermissionList(request.permissions)),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(role_id = %model.id, "role created");
        Ok(model)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<RoleModel, ServiceError> {
        RoleEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Role not found".to_string()))
    }

    #[instrument(skip(self, request), fields(role_id = %id))]
    pub async fn update_role(
        &self,
        id: Uuid,
        request: UpsertRoleRequest,
    ) -> Result<RoleModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let role = self.get_role(id).await?;
        let mut active: RoleActiveModel = role.into();
        active.name = Set(request.name);
        active.description = Set(request.description);
        active.permissions = Set(PermissionList(request.permissions));
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a role; refused while any user still carries it.
    #[instrument(skip(self), fields(role_id = %id))]
    pub async fn delete_role(&self, id: Uuid) -> Result<(), ServiceError> {
        let role = self.get_role(id).await?;

        let in_use = UserEntity::find()
            .filter(user::Column::RoleId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Role is assigned to {in_use} user(s)"
            )));
        }

        role.delete(&*self.db_pool).await?;
        info!(role_id = %id, "role deleted");
        Ok(())
    }

    pub async fn list_roles(&self, page: u64, limit: u64) -> Result<RoleListResponse, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let paginator = RoleEntity::find()
            .order_by_asc(role::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let roles = paginator.fetch_page(page - 1).await?;

        Ok(RoleListResponse {
            roles,
            total,
            page,
            limit,
        })
    }
}
