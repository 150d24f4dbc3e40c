use crate::{
    db::DbPool,
    entities::client::Entity as ClientEntity,
    entities::project::{
        self, ActiveModel as ProjectActiveModel, Entity as ProjectEntity, Model as ProjectModel,
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
pub struct CreateProjectRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "project name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "project_type is required"))]
    pub project_type: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, message = "project name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "project_type is required"))]
    pub project_type: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectListParams {
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
pub struct ProjectListResponse {
    pub projects: Vec<ProjectModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct ProjectService {
    db_pool: Arc<DbPool>,
}

impl ProjectService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_project(
        &self,
        request: CreateProjectRequest,
    ) -> Result<ProjectModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        ClientEntity::find_by_id(request.client_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Client not found".to_string()))?;

        let model = ProjectActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(request.client_id),
            name: Set(request.name),
            description: Set(request.description),
            project_type: Set(request.project_type),
            status: Set("active".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(project_id = %model.id, "project created");
        Ok(model)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<ProjectModel, ServiceError> {
        ProjectEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))
    }

    #[instrument(skip(self, request), fields(project_id = %id))]
    pub async fn update_project(
        &self,
        id: Uuid,
        request: UpdateProjectRequest,
    ) -> Result<ProjectModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let project = self.get_project(id).await?;
        let mut active: ProjectActiveModel = project.into();
        active.name = Set(request.name);
        active.description = Set(request.description);
        active.project_type = Set(request.project_type);
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(project_id = %id))]
    pub async fn delete_project(&self, id: Uuid) -> Result<(), ServiceError> {
        let project = self.get_project(id).await?;
        project.delete(&*self.db_pool).await?;
        info!(project_id = %id, "project deleted");
        Ok(())
    }

    pub async fn list_projects(
        &self,
        params: ProjectListParams,
    ) -> Result<ProjectListResponse, ServiceError> {
        let page = params.page.max(1);
        let limit = params.limit.clamp(1, 100);

        let mut query = ProjectEntity::find().order_by_desc(project::Column::CreatedAt);
        if let Some(client_id) = params.client_id {
            query = query.filter(project::Column::ClientId.eq(client_id));
        }

        let paginator = query.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let projects = paginator.fetch_page(page - 1).await?;

        Ok(ProjectListResponse {
            projects,
            total,
            page,
            limit,
        })
    }
}
