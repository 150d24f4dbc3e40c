use crate::{
    db::DbPool,
    entities::labor_rate::{
        self, ActiveModel as LaborRateActiveModel, ComplexityFactors, Entity as LaborRateEntity,
        Model as LaborRateModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Job difficulty tier. Typed so unknown strings are rejected at the API
/// boundary instead of silently producing a zero multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Hours of labor per unit area, by project type.
fn hours_per_unit_area(project_type: &str) -> Decimal {
    match project_type {
        "foundation" => dec!(0.5),
        "framing" => dec!(0.4),
        "roofing" => dec!(0.3),
        "drywall" => dec!(0.2),
        "painting" => dec!(0.1),
        _ => dec!(0.3),
    }
}

/// Multiplier for a named situational factor. Unrecognized names are a
/// deliberate no-op so callers can attach free-form tags without breaking
/// the calculation.
fn factor_multiplier(factor: &str) -> Decimal {
    match factor {
        "difficult_access" => dec!(1.2),
        "height_work" => dec!(1.3),
        "weather_conditions" => dec!(1.15),
        _ => Decimal::ONE,
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CalculateLaborRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "project_type is required"))]
    pub project_type: String,
    pub area: Decimal,
    pub complexity: Complexity,
    #[serde(default)]
    pub additional_factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FactorAdjustment {
    pub factor: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaborBreakdown {
    pub base_hours: Decimal,
    pub adjustments: Vec<FactorAdjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaborCalculation {
    pub hours: Decimal,
    pub rate: Decimal,
    pub complexity_factor: Decimal,
    pub total_cost: Decimal,
    pub breakdown: LaborBreakdown,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertLaborRateRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "project_type is required"))]
    pub project_type: String,
    pub base_rate: Decimal,
    pub complexity_factors: ComplexityFactors,
}

/// Converts a project description into a billable labor cost using the
/// client's configured rates.
#[derive(Clone)]
pub struct LaborService {
    db_pool: Arc<DbPool>,
}

impl LaborService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Calculates the labor cost for a project description. Pure over its
    /// inputs apart from the single rate lookup.
    #[instrument(skip(self, request), fields(client_id = %request.client_id, project_type = %request.project_type))]
    pub async fn calculate(
        &self,
        request: CalculateLaborRequest,
    ) -> Result<LaborCalculation, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if request.area <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "area must be greater than zero".to_string(),
            ));
        }

        let rate = LaborRateEntity::find()
            .filter(labor_rate::Column::ClientId.eq(request.client_id))
            .filter(labor_rate::Column::ProjectType.eq(request.project_type.clone()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Labor rate not found for project type {}",
                    request.project_type
                ))
            })?;

        Ok(compute(
            &rate,
            request.area,
            request.complexity,
            &request.additional_factors,
        ))
    }

    /// Lists all labor rates configured for a client.
    pub async fn list_rates(&self, client_id: Uuid) -> Result<Vec<LaborRateModel>, ServiceError> {
        let rates = LaborRateEntity::find()
            .filter(labor_rate::Column::ClientId.eq(client_id))
            .order_by_asc(labor_rate::Column::ProjectType)
            .all(&*self.db_pool)
            .await?;
        Ok(rates)
    }

    /// Creates a labor rate for a (client, project type) pair.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_rate(
        &self,
        request: UpsertLaborRateRequest,
    ) -> Result<LaborRateModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_rate(&request)?;

        let existing = LaborRateEntity::find()
            .filter(labor_rate::Column::ClientId.eq(request.client_id))
            .filter(labor_rate::Column::ProjectType.eq(request.project_type.clone()))
            .one(&*self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Labor rate for project type {} already exists",
                request.project_type
            )));
        }

        let model = LaborRateActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(request.client_id),
            project_type: Set(request.project_type),
            base_rate: Set(request.base_rate),
            complexity_factors: Set(request.complexity_factors),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(labor_rate_id = %model.id, "labor rate created");
        Ok(model)
    }

    /// Replaces the base rate and complexity factors of an existing rate.
    #[instrument(skip(self, request), fields(labor_rate_id = %id))]
    pub async fn update_rate(
        &self,
        id: Uuid,
        request: UpsertLaborRateRequest,
    ) -> Result<LaborRateModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_rate(&request)?;

        let rate = LaborRateEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Labor rate not found".to_string()))?;

        let mut active: LaborRateActiveModel = rate.into();
        active.base_rate = Set(request.base_rate);
        active.complexity_factors = Set(request.complexity_factors);
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db_pool).await?)
    }
}

fn validate_rate(request: &UpsertLaborRateRequest) -> Result<(), ServiceError> {
    if request.base_rate <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "base_rate must be greater than zero".to_string(),
        ));
    }
    let factors = &request.complexity_factors;
    if factors.low <= Decimal::ZERO || factors.medium <= Decimal::ZERO || factors.high <= Decimal::ZERO
    {
        return Err(ServiceError::ValidationError(
            "complexity factors must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// The calculation itself, separated from the rate lookup so it stays a pure
/// function.
pub fn compute(
    rate: &LaborRateModel,
    area: Decimal,
    complexity: Complexity,
    additional_factors: &[String],
) -> LaborCalculation {
    let base_hours = area * hours_per_unit_area(&rate.project_type);

    let complexity_factor = match complexity {
        Complexity::Low => rate.complexity_factors.low,
        Complexity::Medium => rate.complexity_factors.medium,
        Complexity::High => rate.complexity_factors.high,
    };
    let adjusted_hours = base_hours * complexity_factor;

    let adjustments: Vec<FactorAdjustment> = additional_factors
        .iter()
        .map(|factor| FactorAdjustment {
            factor: factor.clone(),
            value: factor_multiplier(factor),
        })
        .collect();

    let final_hours = adjustments
        .iter()
        .fold(adjusted_hours, |hours, adj| hours * adj.value);

    let total_cost = final_hours * rate.base_rate;

    LaborCalculation {
        hours: final_hours,
        rate: rate.base_rate,
        complexity_factor,
        total_cost,
        breakdown: LaborBreakdown {
            base_hours,
            adjustments,
        },
    }
}
