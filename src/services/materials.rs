use crate::{
    db::DbPool,
    entities::material::{
        self, ActiveModel as MaterialActiveModel, Entity as MaterialEntity, Model as MaterialModel,
    },
    entities::material_price_history::{
        self, ActiveModel as PriceHistoryActiveModel, Entity as PriceHistoryEntity,
        Model as PriceHistoryModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::supplier::SupplierApi,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const SEARCH_LIMIT: u64 = 50;
const PRICE_HISTORY_LIMIT: u64 = 30;
const LOWES_SUPPLIER: &str = "lowes";

#[derive(Debug, Deserialize, ToSchema)]
pub struct MaterialSearchParams {
    pub query: String,
    pub category: Option<String>,
}

/// Outcome of syncing one SKU against the supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A new catalog entry was created from supplier product details.
    Inserted,
    /// The supplier price differed; price and history were updated.
    Updated,
    /// The supplier price matched the stored price; nothing written.
    Unchanged,
}

/// Result of a batch sync run.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct SyncReport {
    pub synced: u32,
    pub unchanged: u32,
    pub failed: u32,
}

/// Keeps the local material catalog in step with the supplier's current
/// prices, retaining an append-only price history.
#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    supplier: Arc<dyn SupplierApi>,
    event_sender: Option<Arc<EventSender>>,
}

impl MaterialService {
    pub fn new(
        db_pool: Arc<DbPool>,
        supplier: Arc<dyn SupplierApi>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            supplier,
            event_sender,
        }
    }

    /// Name/description search over the catalog, optionally narrowed by
    /// category, name ascending.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: MaterialSearchParams,
    ) -> Result<Vec<MaterialModel>, ServiceError> {
        let pattern = format!("%{}%", params.query);

        let mut query = MaterialEntity::find().filter(
            Condition::any()
                .add(material::Column::Name.like(pattern.clone()))
                .add(material::Column::Description.like(pattern)),
        );
        if let Some(category) = params.category {
            query = query.filter(material::Column::Category.eq(category));
        }

        let materials = query
            .order_by_asc(material::Column::Name)
            .limit(SEARCH_LIMIT)
            .all(&*self.db_pool)
            .await?;

        Ok(materials)
    }

    pub async fn get_material(&self, id: Uuid) -> Result<MaterialModel, ServiceError> {
        MaterialEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Material not found".to_string()))
    }

    /// Latest recorded prices for a material, newest first.
    #[instrument(skip(self), fields(material_id = %id))]
    pub async fn price_history(&self, id: Uuid) -> Result<Vec<PriceHistoryModel>, ServiceError> {
        // 404 on an unknown material rather than an empty history
        self.get_material(id).await?;

        let history = PriceHistoryEntity::find()
            .filter(material_price_history::Column::MaterialId.eq(id))
            .order_by_desc(material_price_history::Column::RecordedAt)
            .limit(PRICE_HISTORY_LIMIT)
            .all(&*self.db_pool)
            .await?;

        Ok(history)
    }

    /// Syncs a single SKU: inserts an unknown material from supplier details,
    /// updates price and history when the supplier price moved, and writes
    /// nothing at all when the price is unchanged.
    #[instrument(skip(self), fields(sku = %sku))]
    pub async fn sync_sku(&self, sku: &str) -> Result<SyncOutcome, ServiceError> {
        let price_data = self.supplier.get_product_price(sku).await?;
        let db = &*self.db_pool;
        let now = Utc::now();

        let existing = MaterialEntity::find()
            .filter(material::Column::SupplierSku.eq(sku))
            .one(db)
            .await?;

        match existing {
            Some(existing) => {
                if existing.unit_price == price_data.price {
                    return Ok(SyncOutcome::Unchanged);
                }

                let old_price = existing.unit_price;
                let material_id = existing.id;

                let txn = db.begin().await?;

                let mut active: MaterialActiveModel = existing.into();
                active.unit_price = Set(price_data.price);
                active.last_sync = Set(Some(now));
                active.updated_at = Set(Some(now));
                active.update(&txn).await?;

                PriceHistoryActiveModel {
                    id: Set(Uuid::new_v4()),
                    material_id: Set(material_id),
                    price: Set(price_data.price),
                    recorded_at: Set(now),
                }
                .insert(&txn)
                .await?;

                txn.commit().await?;

                info!(material_id = %material_id, %old_price, new_price = %price_data.price, "material price updated");
                self.emit(Event::MaterialPriceChanged {
                    material_id,
                    old_price,
                    new_price: price_data.price,
                })
                .await;

                Ok(SyncOutcome::Updated)
            }
            None => {
                let details = self.supplier.get_product_details(sku).await?;
                let material_id = Uuid::new_v4();

                let txn = db.begin().await?;

                MaterialActiveModel {
                    id: Set(material_id),
                    supplier_sku: Set(Some(sku.to_string())),
                    name: Set(details.name),
                    description: Set(details.description),
                    category: Set(details.category),
                    unit: Set(details.unit),
                    unit_price: Set(price_data.price),
                    supplier: Set(LOWES_SUPPLIER.to_string()),
                    last_sync: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(None),
                }
                .insert(&txn)
                .await?;

                PriceHistoryActiveModel {
                    id: Set(Uuid::new_v4()),
                    material_id: Set(material_id),
                    price: Set(price_data.price),
                    recorded_at: Set(now),
                }
                .insert(&txn)
                .await?;

                txn.commit().await?;

                info!(material_id = %material_id, price = %price_data.price, "material added from supplier");
                self.emit(Event::MaterialAdded {
                    material_id,
                    sku: sku.to_string(),
                })
                .await;

                Ok(SyncOutcome::Inserted)
            }
        }
    }

    /// Syncs every supplier-backed material. One SKU failing is logged and
    /// skipped; the batch always runs to completion.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncReport, ServiceError> {
        let materials = MaterialEntity::find()
            .filter(material::Column::Supplier.eq(LOWES_SUPPLIER))
            .filter(material::Column::SupplierSku.is_not_null())
            .all(&*self.db_pool)
            .await?;

        let mut report = SyncReport::default();

        for material in materials {
            let Some(sku) = material.supplier_sku.as_deref() else {
                continue;
            };
            match self.sync_sku(sku).await {
                Ok(SyncOutcome::Unchanged) => report.unchanged += 1,
                Ok(_) => report.synced += 1,
                Err(e) => {
                    error!(sku = %sku, error = %e, "material sync failed, skipping");
                    report.failed += 1;
                }
            }
        }

        info!(
            synced = report.synced,
            unchanged = report.unchanged,
            failed = report.failed,
            "catalog sync completed"
        );
        Ok(report)
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send material event");
            }
        }
    }
}

/// Spawns the periodic catalog sync. The first tick fires after one full
/// interval so startup isn't serialized behind a supplier round-trip.
pub fn start_sync_worker(service: MaterialService, sync_interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(sync_interval);
        ticker.tick().await; // consume the immediate first tick
        loop {
            ticker.tick().await;
            info!("starting scheduled material sync");
            if let Err(e) = service.sync_all().await {
                error!(error = %e, "scheduled material sync failed");
            }
        }
    });
}
