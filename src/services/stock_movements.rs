use crate::{
    db::DbPool,
    entities::{
        product,
        stock_movement::{self, Entity as StockMovement, MovementReference, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::products::ProductService,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for recording one stock movement
#[derive(Debug, Clone)]
pub struct RecordMovement {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reference: MovementReference,
    pub reference_id: Option<Uuid>,
    pub performed_by: String,
    pub note: Option<String>,
}

/// A committed movement together with the product state it produced
#[derive(Debug, Clone)]
pub struct AppliedMovement {
    pub entry: stock_movement::Model,
    pub product: product::Model,
}

/// Filter for querying the movement ledger
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    pub movement_type: Option<MovementType>,
    pub reference_type: Option<MovementReference>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// The movement ledger: single choke point for all stock mutation.
///
/// Every quantity change goes through `record` (or, for multi-line order
/// workflows, `apply_movement` inside the caller's transaction): the ledger
/// row and the product quantity update commit together or not at all.
/// A per-product async mutex serializes the read-modify-write so concurrent
/// deductions cannot both observe the same previous stock.
#[derive(Clone)]
pub struct StockMovementService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    product_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl StockMovementService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db,
            event_sender,
            product_locks: Arc::new(DashMap::new()),
        }
    }

    fn product_lock(&self, product_id: Uuid) -> Arc<Mutex<()>> {
        self.product_locks
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Acquires the locks for a set of products in sorted id order, so two
    /// multi-product operations can never deadlock on each other.
    pub(crate) async fn lock_products(&self, product_ids: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<Uuid> = product_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.product_lock(id).lock_owned().await);
        }
        guards
    }

    /// Records one stock movement atomically: movement insert and product
    /// quantity update commit together.
    #[instrument(skip(self))]
    pub async fn record(&self, input: RecordMovement) -> Result<stock_movement::Model, ServiceError> {
        let _guard = self.product_lock(input.product_id).lock_owned().await;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let applied = Self::apply_movement(&txn, &input).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            movement_id = %applied.entry.id,
            product_id = %applied.product.id,
            movement_type = %applied.entry.r#type,
            quantity = applied.entry.quantity,
            previous_stock = applied.entry.previous_stock,
            new_stock = applied.entry.new_stock,
            "Stock movement recorded"
        );

        self.emit_movement_events(&applied).await;

        Ok(applied.entry)
    }

    /// Applies one movement inside an open transaction. Callers that span
    /// several lines (order delivery, invoice payment) run this per line in
    /// their own transaction, holding the product locks for the whole batch.
    pub(crate) async fn apply_movement<C>(
        conn: &C,
        input: &RecordMovement,
    ) -> Result<AppliedMovement, ServiceError>
    where
        C: ConnectionTrait,
    {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Movement quantity must be a positive integer".to_string(),
            ));
        }
        if input.performed_by.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Movement must identify who performed it".to_string(),
            ));
        }

        let current = product::Entity::find_by_id(input.product_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product with ID {} not found", input.product_id))
            })?;

        let previous_stock = current.quantity;
        let new_stock = match input.movement_type.apply(previous_stock, input.quantity) {
            Some(stock) => stock,
            None => match input.movement_type {
                MovementType::Out => {
                    return Err(ServiceError::insufficient_stock(
                        current.sku.clone(),
                        input.quantity,
                        previous_stock,
                    ));
                }
                MovementType::In => {
                    return Err(ServiceError::ValidationError(format!(
                        "Movement quantity {} overflows the stock level of product {}",
                        input.quantity, current.sku
                    )));
                }
            },
        };

        let updated = ProductService::adjust_quantity(conn, current, new_stock).await?;

        let entry = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(updated.id),
            r#type: Set(input.movement_type.as_str().to_string()),
            quantity: Set(input.quantity),
            previous_stock: Set(previous_stock),
            new_stock: Set(new_stock),
            reference_type: Set(input.reference.as_str().to_string()),
            reference_id: Set(input.reference_id),
            performed_by: Set(input.performed_by.clone()),
            note: Set(input.note.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

        Ok(AppliedMovement {
            entry,
            product: updated,
        })
    }

    /// Emits the post-commit events for one applied movement.
    pub(crate) async fn emit_movement_events(&self, applied: &AppliedMovement) {
        self.event_sender
            .send_or_log(Event::StockMovementRecorded {
                movement_id: applied.entry.id,
                product_id: applied.product.id,
                movement_type: applied.entry.r#type.clone(),
                quantity: applied.entry.quantity,
                previous_stock: applied.entry.previous_stock,
                new_stock: applied.entry.new_stock,
                reference_type: applied.entry.reference_type.clone(),
            })
            .await;

        if applied.product.is_low_stock() {
            self.event_sender
                .send_or_log(Event::LowStockDetected {
                    product_id: applied.product.id,
                    sku: applied.product.sku.clone(),
                    quantity: applied.product.quantity,
                    threshold: applied.product.low_stock_threshold,
                })
                .await;
        }
    }

    /// Lists the full movement history for one product, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let db = &*self.db;

        let exists = product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .is_some();
        if !exists {
            return Err(ServiceError::NotFound(format!(
                "Product with ID {} not found",
                product_id
            )));
        }

        let paginator = StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Queries the ledger across products by type, reference and date range.
    #[instrument(skip(self))]
    pub async fn query(
        &self,
        filter: MovementQuery,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let db = &*self.db;

        let mut find = StockMovement::find();
        if let Some(movement_type) = filter.movement_type {
            find = find.filter(stock_movement::Column::Type.eq(movement_type.as_str()));
        }
        if let Some(reference) = filter.reference_type {
            find = find.filter(stock_movement::Column::ReferenceType.eq(reference.as_str()));
        }
        if let Some(start) = filter.start_date {
            find = find.filter(stock_movement::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            find = find.filter(stock_movement::Column::CreatedAt.lte(end));
        }

        let paginator = find
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
