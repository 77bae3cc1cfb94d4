use crate::{
    db::DbPool,
    entities::{
        product,
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItem},
        stock_movement::{MovementReference, MovementType},
        vendor,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_movements::{AppliedMovement, RecordMovement, StockMovementService},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One requested purchase order line
#[derive(Debug, Clone)]
pub struct PurchaseOrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit cost; defaults to the product's purchase price when omitted
    pub purchase_price: Option<Decimal>,
}

/// Input for creating a purchase order
#[derive(Debug, Clone)]
pub struct CreatePurchaseOrder {
    /// Generated when omitted
    pub order_number: Option<String>,
    pub vendor_id: Uuid,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderLineInput>,
}

/// Patch for a pending purchase order
#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseOrder {
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Replaces the full line item set when provided
    pub items: Option<Vec<PurchaseOrderLineInput>>,
}

/// Filter for listing purchase orders
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub vendor_id: Option<Uuid>,
}

/// Purchase order workflow: pending -> delivered | cancelled. Delivery
/// receives stock via the movement ledger, all lines or none.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockMovementService,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockMovementService) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    fn generate_order_number() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("PO-{}", suffix[..8].to_uppercase())
    }

    fn validate_lines(items: &[PurchaseOrderLineInput]) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase order needs at least one line item".to_string(),
            ));
        }
        for item in items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Line item quantity must be a positive integer".to_string(),
                ));
            }
            if let Some(price) = item.purchase_price {
                if price < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(
                        "Line item purchase price cannot be negative".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolves line inputs against the catalog, filling in default unit
    /// costs. New orders may only reference active products.
    async fn resolve_lines(
        &self,
        items: &[PurchaseOrderLineInput],
    ) -> Result<Vec<(Uuid, i32, Decimal)>, ServiceError> {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Product with ID {} not found",
                        item.product_id
                    ))
                })?;
            if !product.is_active() {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is inactive and cannot be ordered",
                    product.sku
                )));
            }
            let unit_cost = item.purchase_price.unwrap_or(product.purchase_price);
            lines.push((product.id, item.quantity, unit_cost));
        }
        Ok(lines)
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrder,
    ) -> Result<purchase_order::Model, ServiceError> {
        Self::validate_lines(&input.items)?;

        let vendor = vendor::Entity::find_by_id(input.vendor_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor with ID {} not found", input.vendor_id))
            })?;
        if !vendor.is_active() {
            return Err(ServiceError::ValidationError(format!(
                "Vendor {} is inactive",
                vendor.name
            )));
        }

        let order_number = match &input.order_number {
            Some(number) if !number.trim().is_empty() => number.trim().to_string(),
            _ => Self::generate_order_number(),
        };

        let existing = PurchaseOrder::find()
            .filter(purchase_order::Column::OrderNumber.eq(&order_number))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Order number {} already exists",
                order_number
            )));
        }

        let lines = self.resolve_lines(&input.items).await?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let created = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            vendor_id: Set(input.vendor_id),
            status: Set(PurchaseOrderStatus::Pending.as_str().to_string()),
            expected_delivery_date: Set(input.expected_delivery_date),
            received_at: Set(None),
            notes: Set(input.notes.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        for (product_id, quantity, unit_cost) in lines {
            purchase_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_order_id: Set(created.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                purchase_price: Set(unit_cost),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %created.id, order_number = %created.order_number, "Purchase order created");
        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated(created.id))
            .await;

        Ok(created)
    }

    /// Conditional pending-only touch: stamps `updated_at` where the order
    /// is still pending, claiming the row for this transaction. Zero rows
    /// means the order is already terminal.
    async fn claim_pending(
        txn: &DatabaseTransaction,
        order_id: Uuid,
        attempted: &str,
    ) -> Result<(), ServiceError> {
        let result = PurchaseOrder::update_many()
            .col_expr(
                purchase_order::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(purchase_order::Column::Id.eq(order_id))
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Pending.as_str()))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            let current = PurchaseOrder::find_by_id(order_id)
                .one(txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Purchase order with ID {} not found",
                        order_id
                    ))
                })?;
            return Err(ServiceError::invalid_transition(
                "purchase order",
                &current.status,
                attempted,
            ));
        }
        Ok(())
    }

    /// Updates a purchase order while it is still pending.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        order_id: Uuid,
        patch: UpdatePurchaseOrder,
    ) -> Result<purchase_order::Model, ServiceError> {
        // Existence check first so unknown ids report 404, not 409
        self.get(order_id).await?;

        if let Some(items) = &patch.items {
            Self::validate_lines(items)?;
        }
        let replacement_lines = match &patch.items {
            Some(items) => Some(self.resolve_lines(items).await?),
            None => None,
        };

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        Self::claim_pending(&txn, order_id, "updated").await?;

        let mut active: purchase_order::ActiveModel =
            PurchaseOrder::find_by_id(order_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Purchase order with ID {} not found",
                        order_id
                    ))
                })?
                .into();
        if let Some(expected) = patch.expected_delivery_date {
            active.expected_delivery_date = Set(Some(expected));
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await.map_err(ServiceError::db_error)?;

        if let Some(lines) = replacement_lines {
            PurchaseOrderItem::delete_many()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            for (product_id, quantity, unit_cost) in lines {
                purchase_order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    purchase_order_id: Set(order_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    purchase_price: Set(unit_cost),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            }
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderUpdated(order_id))
            .await;

        self.get(order_id).await
    }

    /// Marks a purchase order delivered: per line, one "in" movement
    /// referencing the purchase, then the status flip — all in one
    /// transaction. A failing line aborts the whole transition and the
    /// order stays pending.
    #[instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        order_id: Uuid,
        performed_by: &str,
    ) -> Result<purchase_order::Model, ServiceError> {
        let existing = self.get(order_id).await?;
        if !existing.is_pending() {
            return Err(ServiceError::invalid_transition(
                "purchase order",
                &existing.status,
                PurchaseOrderStatus::Delivered.as_str(),
            ));
        }

        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Purchase order has no line items".to_string(),
            ));
        }

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let _guards = self.ledger.lock_products(&product_ids).await;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let now = Utc::now();
        let result = PurchaseOrder::update_many()
            .col_expr(
                purchase_order::Column::Status,
                Expr::value(PurchaseOrderStatus::Delivered.as_str()),
            )
            .col_expr(purchase_order::Column::ReceivedAt, Expr::value(Some(now)))
            .col_expr(purchase_order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(purchase_order::Column::Id.eq(order_id))
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Pending.as_str()))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            let current = PurchaseOrder::find_by_id(order_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Purchase order with ID {} not found",
                        order_id
                    ))
                })?;
            return Err(ServiceError::invalid_transition(
                "purchase order",
                &current.status,
                PurchaseOrderStatus::Delivered.as_str(),
            ));
        }

        let mut applied: Vec<AppliedMovement> = Vec::with_capacity(items.len());
        for item in &items {
            let movement = StockMovementService::apply_movement(
                &txn,
                &RecordMovement {
                    product_id: item.product_id,
                    movement_type: MovementType::In,
                    quantity: item.quantity,
                    reference: MovementReference::Purchase,
                    reference_id: Some(order_id),
                    performed_by: performed_by.to_string(),
                    note: Some(format!("Purchase order {}", existing.order_number)),
                },
            )
            .await?;
            applied.push(movement);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %order_id, lines = applied.len(), "Purchase order delivered");
        for movement in &applied {
            self.ledger.emit_movement_events(movement).await;
        }
        self.event_sender
            .send_or_log(Event::PurchaseOrderDelivered(order_id))
            .await;

        self.get(order_id).await
    }

    /// Cancels a pending purchase order. No ledger effect.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        self.get(order_id).await?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let result = PurchaseOrder::update_many()
            .col_expr(
                purchase_order::Column::Status,
                Expr::value(PurchaseOrderStatus::Cancelled.as_str()),
            )
            .col_expr(
                purchase_order::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(purchase_order::Column::Id.eq(order_id))
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Pending.as_str()))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            let current = PurchaseOrder::find_by_id(order_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Purchase order with ID {} not found",
                        order_id
                    ))
                })?;
            return Err(ServiceError::invalid_transition(
                "purchase order",
                &current.status,
                PurchaseOrderStatus::Cancelled.as_str(),
            ));
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %order_id, "Purchase order cancelled");
        self.event_sender
            .send_or_log(Event::PurchaseOrderCancelled(order_id))
            .await;

        self.get(order_id).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        PurchaseOrder::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order with ID {} not found", order_id))
            })
    }

    /// Fetches a purchase order together with its line items.
    #[instrument(skip(self))]
    pub async fn get_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError> {
        let header = self.get(order_id).await?;
        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((header, items))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PurchaseOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let db = &*self.db;

        let mut find = PurchaseOrder::find();
        if let Some(status) = filter.status {
            find = find.filter(purchase_order::Column::Status.eq(status.as_str()));
        }
        if let Some(vendor_id) = filter.vendor_id {
            find = find.filter(purchase_order::Column::VendorId.eq(vendor_id));
        }

        let paginator = find
            .order_by_desc(purchase_order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
