use crate::{
    db::DbPool,
    entities::customer::Entity as CustomerEntity,
    entities::estimate::{
        self, ActiveModel as EstimateActiveModel, Entity as EstimateEntity, Model as EstimateModel,
    },
    entities::estimate_material::{
        self, ActiveModel as EstimateMaterialActiveModel, Entity as EstimateMaterialEntity,
        Model as EstimateMaterialModel,
    },
    entities::project::Entity as ProjectEntity,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Estimate lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EstimateStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

/// One material line in a create/update request. `total_price` is never
/// accepted from the caller; it is always derived.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EstimateMaterialInput {
    #[validate(length(min = 1, message = "material name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[validate(length(min = 1, message = "material unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub ai_recommended: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEstimateRequest {
    pub project_id: Uuid,
    pub customer_id: Uuid,
    pub blueprint_id: Option<Uuid>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one material is required"))]
    pub materials: Vec<EstimateMaterialInput>,
}

/// Whole-collection replacement: the supplied list becomes the estimate's
/// entire material set.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateEstimateRequest {
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one material is required"))]
    pub materials: Vec<EstimateMaterialInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateEstimateStatusRequest {
    pub status: EstimateStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EstimateListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub project_id: Option<Uuid>,
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateMaterialResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
    pub total_price: Decimal,
    pub ai_recommended: bool,
}

/// Hydrated estimate: header plus line items plus customer/project display
/// fields for the dashboard and the PDF export.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub customer_id: Uuid,
    pub blueprint_id: Option<Uuid>,
    pub status: String,
    pub notes: Option<String>,
    pub total_cost: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub project_name: Option<String>,
    pub materials: Vec<EstimateMaterialResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EstimateListResponse {
    pub estimates: Vec<EstimateResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Maintains an estimate's line items and derived total as one consistent
/// unit: every multi-row write happens inside a single transaction.
#[derive(Clone)]
pub struct EstimateService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl EstimateService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an estimate with its initial material set atomically.
    #[instrument(skip(self, request), fields(project_id = %request.project_id, customer_id = %request.customer_id))]
    pub async fn create_estimate(
        &self,
        request: CreateEstimateRequest,
    ) -> Result<EstimateResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_materials(&request.materials)?;

        let db = &*self.db_pool;

        ProjectEntity::find_by_id(request.project_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))?;
        CustomerEntity::find_by_id(request.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        let estimate_id = Uuid::new_v4();
        let now = Utc::now();
        let total_cost = materials_total(&request.materials);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for estimate creation");
            ServiceError::DatabaseError(e)
        })?;

        EstimateActiveModel {
            id: Set(estimate_id),
            project_id: Set(request.project_id),
            customer_id: Set(request.customer_id),
            blueprint_id: Set(request.blueprint_id),
            status: Set(EstimateStatus::Draft.to_string()),
            notes: Set(request.notes),
            total_cost: Set(total_cost),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to insert estimate header");
            ServiceError::DatabaseError(e)
        })?;

        insert_materials(&txn, estimate_id, &request.materials, now).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to commit estimate creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(estimate_id = %estimate_id, total_cost = %total_cost, "estimate created");
        self.emit(Event::EstimateCreated(estimate_id)).await;

        self.get_estimate(estimate_id).await
    }

    /// Replaces the estimate's whole material collection and recomputes the
    /// total, atomically. A partial list is not a patch: whatever is not in
    /// the request is gone afterwards.
    #[instrument(skip(self, request), fields(estimate_id = %estimate_id))]
    pub async fn update_estimate(
        &self,
        estimate_id: Uuid,
        request: UpdateEstimateRequest,
    ) -> Result<EstimateResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_materials(&request.materials)?;

        let db = &*self.db_pool;
        let estimate = EstimateEntity::find_by_id(estimate_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Estimate not found".to_string()))?;

        let now = Utc::now();
        let total_cost = materials_total(&request.materials);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to start transaction for estimate update");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: EstimateActiveModel = estimate.into();
        active.notes = Set(request.notes);
        active.total_cost = Set(total_cost);
        active.updated_at = Set(Some(now));
        active.update(&txn).await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to update estimate header");
            ServiceError::DatabaseError(e)
        })?;

        EstimateMaterialEntity::delete_many()
            .filter(estimate_material::Column::EstimateId.eq(estimate_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, estimate_id = %estimate_id, "Failed to delete existing materials");
                ServiceError::DatabaseError(e)
            })?;

        insert_materials(&txn, estimate_id, &request.materials, now).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to commit estimate update");
            ServiceError::DatabaseError(e)
        })?;

        info!(estimate_id = %estimate_id, total_cost = %total_cost, "estimate updated");
        self.emit(Event::EstimateUpdated(estimate_id)).await;

        self.get_estimate(estimate_id).await
    }

    /// Moves the estimate through its lifecycle (draft, pending, approved,
    /// rejected).
    #[instrument(skip(self, request), fields(estimate_id = %estimate_id))]
    pub async fn update_status(
        &self,
        estimate_id: Uuid,
        request: UpdateEstimateStatusRequest,
    ) -> Result<EstimateResponse, ServiceError> {
        let db = &*self.db_pool;
        let estimate = EstimateEntity::find_by_id(estimate_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Estimate not found".to_string()))?;

        let old_status = estimate.status.clone();
        let new_status = request.status.to_string();

        let mut active: EstimateActiveModel = estimate.into();
        active.status = Set(new_status.clone());
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(estimate_id = %estimate_id, old_status = %old_status, new_status = %new_status, "estimate status updated");
        self.emit(Event::EstimateStatusChanged {
            estimate_id,
            old_status,
            new_status,
        })
        .await;

        self.get_estimate(estimate_id).await
    }

    /// Deletes the estimate and its line items in one transaction.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn delete_estimate(&self, estimate_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let estimate = EstimateEntity::find_by_id(estimate_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Estimate not found".to_string()))?;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to start transaction for estimate deletion");
            ServiceError::DatabaseError(e)
        })?;

        EstimateMaterialEntity::delete_many()
            .filter(estimate_material::Column::EstimateId.eq(estimate_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, estimate_id = %estimate_id, "Failed to delete estimate materials");
                ServiceError::DatabaseError(e)
            })?;

        estimate.delete(&txn).await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to delete estimate header");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, "Failed to commit estimate deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(estimate_id = %estimate_id, "estimate deleted");
        self.emit(Event::EstimateDeleted(estimate_id)).await;

        Ok(())
    }

    /// Fetches the hydrated estimate: header, display fields, and materials
    /// in insertion order.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn get_estimate(&self, estimate_id: Uuid) -> Result<EstimateResponse, ServiceError> {
        let db = &*self.db_pool;

        let estimate = EstimateEntity::find_by_id(estimate_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Estimate not found".to_string()))?;

        self.hydrate(estimate).await
    }

    /// Lists estimates newest first, optionally filtered by project and
    /// status.
    #[instrument(skip(self))]
    pub async fn list_estimates(
        &self,
        params: EstimateListParams,
    ) -> Result<EstimateListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = params.page.max(1);
        let limit = params.limit.clamp(1, 100);

        let mut query = EstimateEntity::find().order_by_desc(estimate::Column::CreatedAt);
        if let Some(project_id) = params.project_id {
            query = query.filter(estimate::Column::ProjectId.eq(project_id));
        }
        if let Some(status) = &params.status {
            let status = EstimateStatus::from_str(status).map_err(|_| {
                ServiceError::ValidationError(format!("Unknown estimate status: {status}"))
            })?;
            query = query.filter(estimate::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let headers = paginator.fetch_page(page - 1).await?;

        let mut estimates = Vec::with_capacity(headers.len());
        for header in headers {
            estimates.push(self.hydrate(header).await?);
        }

        Ok(EstimateListResponse {
            estimates,
            total,
            page,
            limit,
        })
    }

    async fn hydrate(&self, estimate: EstimateModel) -> Result<EstimateResponse, ServiceError> {
        let db = &*self.db_pool;

        let customer = CustomerEntity::find_by_id(estimate.customer_id).one(db).await?;
        let project = ProjectEntity::find_by_id(estimate.project_id).one(db).await?;

        let materials = EstimateMaterialEntity::find()
            .filter(estimate_material::Column::EstimateId.eq(estimate.id))
            .order_by_asc(estimate_material::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(EstimateResponse {
            id: estimate.id,
            project_id: estimate.project_id,
            customer_id: estimate.customer_id,
            blueprint_id: estimate.blueprint_id,
            status: estimate.status,
            notes: estimate.notes,
            total_cost: estimate.total_cost,
            customer_name: customer.as_ref().map(|c| c.name.clone()),
            customer_email: customer.as_ref().and_then(|c| c.email.clone()),
            customer_phone: customer.as_ref().and_then(|c| c.phone.clone()),
            project_name: project.map(|p| p.name),
            materials: materials.into_iter().map(material_to_response).collect(),
            created_at: estimate.created_at,
            updated_at: estimate.updated_at,
        })
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send estimate event");
            }
        }
    }
}

/// Sum of quantity × unit price across the request's lines.
pub fn materials_total(materials: &[EstimateMaterialInput]) -> Decimal {
    materials
        .iter()
        .map(|m| m.quantity * m.unit_price)
        .sum()
}

fn validate_materials(materials: &[EstimateMaterialInput]) -> Result<(), ServiceError> {
    for material in materials {
        material
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if material.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "quantity for {} must be greater than zero",
                material.name
            )));
        }
        if material.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "unit price for {} must not be negative",
                material.name
            )));
        }
    }
    Ok(())
}

async fn insert_materials(
    txn: &sea_orm::DatabaseTransaction,
    estimate_id: Uuid,
    materials: &[EstimateMaterialInput],
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    for material in materials {
        EstimateMaterialActiveModel {
            id: Set(Uuid::new_v4()),
            estimate_id: Set(estimate_id),
            name: Set(material.name.clone()),
            description: Set(material.description.clone()),
            quantity: Set(material.quantity),
            unit_price: Set(material.unit_price),
            unit: Set(material.unit.clone()),
            total_price: Set(material.quantity * material.unit_price),
            ai_recommended: Set(material.ai_recommended),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            error!(error = %e, estimate_id = %estimate_id, material = %material.name, "Failed to insert estimate material");
            ServiceError::DatabaseError(e)
        })?;
    }
    Ok(())
}

fn material_to_response(model: EstimateMaterialModel) -> EstimateMaterialResponse {
    EstimateMaterialResponse {
        id: model.id,
        name: model.name,
        description: model.description,
        quantity: model.quantity,
        unit_price: model.unit_price,
        unit: model.unit,
        total_price: model.total_price,
        ai_recommended: model.ai_recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(name: &str, quantity: Decimal, unit_price: Decimal) -> EstimateMaterialInput {
        EstimateMaterialInput {
            name: name.to_string(),
            description: None,
            quantity,
            unit_price,
            unit: "unit".to_string(),
            ai_recommended: false,
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let materials = vec![
            input("screws", dec!(10), dec!(5.5)),
            input("beam", dec!(2), dec!(100)),
        ];
        assert_eq!(materials_total(&materials), dec!(255.00));
    }

    #[test]
    fn total_of_empty_list_is_zero() {
        assert_eq!(materials_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn zero_quantity_rejected() {
        let materials = vec![input("screws", dec!(0), dec!(5.5))];
        assert!(matches!(
            validate_materials(&materials),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_unit_price_rejected() {
        let materials = vec![input("screws", dec!(1), dec!(-4))];
        assert!(matches!(
            validate_materials(&materials),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn free_material_is_allowed() {
        let materials = vec![input("offcut", dec!(3), dec!(0))];
        assert!(validate_materials(&materials).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let materials = vec![input("", dec!(1), dec!(1))];
        assert!(matches!(
            validate_materials(&materials),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            EstimateStatus::Draft,
            EstimateStatus::Pending,
            EstimateStatus::Approved,
            EstimateStatus::Rejected,
        ] {
            let rendered = status.to_string();
            assert_eq!(EstimateStatus::from_str(&rendered).unwrap(), status);
        }
        assert!(EstimateStatus::from_str("archived").is_err());
    }
}
