use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A line item on an estimate. Prices are snapshotted by value at estimate
/// time; there is no foreign key back into the material catalog.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimate_materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
    pub total_price: Decimal,
    pub ai_recommended: bool,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::estimate::Entity",
        from = "Column::EstimateId",
        to = "super::estimate::Column::Id"
    )]
    Estimate,
}

impl Related<super::estimate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estimate.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// `total_price` is always derived from quantity and unit price, even when
    /// only one of the two changes.
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        let quantity = match &active_model.quantity {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(*v),
            ActiveValue::NotSet => None,
        };
        let unit_price = match &active_model.unit_price {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(*v),
            ActiveValue::NotSet => None,
        };

        if let (Some(quantity), Some(unit_price)) = (quantity, unit_price) {
            active_model.total_price = Set(quantity * unit_price);
        }

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
