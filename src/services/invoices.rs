use crate::{
    db::DbPool,
    entities::{
        invoice::{self, Entity as Invoice, InvoiceStatus, PaymentMethod},
        invoice_item::{self, Entity as InvoiceItem},
        product,
        stock_movement::{MovementReference, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_movements::{AppliedMovement, RecordMovement, StockMovementService},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One requested invoice line
#[derive(Debug, Clone)]
pub struct InvoiceLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price; defaults to the product's selling price when omitted
    pub selling_price: Option<Decimal>,
}

/// Input for creating an invoice
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    /// Generated when omitted
    pub invoice_number: Option<String>,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<InvoiceLineInput>,
}

/// Filter for listing invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_name: Option<String>,
}

/// Invoice workflow: pending -> paid | cancelled. Payment deducts stock via
/// the movement ledger, all lines or none.
#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockMovementService,
}

impl InvoiceService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockMovementService) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    fn generate_invoice_number() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("INV-{}", suffix[..8].to_uppercase())
    }

    /// Creates a pending invoice. Totals are computed server-side from the
    /// line items; product references must be active catalog entries.
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateInvoice) -> Result<invoice::Model, ServiceError> {
        if input.customer_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Customer name is required".to_string(),
            ));
        }
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "An invoice needs at least one line item".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Line item quantity must be a positive integer".to_string(),
                ));
            }
            if let Some(price) = item.selling_price {
                if price < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(
                        "Line item selling price cannot be negative".to_string(),
                    ));
                }
            }
        }

        let invoice_number = match &input.invoice_number {
            Some(number) if !number.trim().is_empty() => number.trim().to_string(),
            _ => Self::generate_invoice_number(),
        };

        let existing = Invoice::find()
            .filter(invoice::Column::InvoiceNumber.eq(&invoice_number))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Invoice number {} already exists",
                invoice_number
            )));
        }

        // Resolve products and unit prices before writing anything
        let mut lines: Vec<(Uuid, i32, Decimal)> = Vec::with_capacity(input.items.len());
        let mut total_amount = Decimal::ZERO;
        for item in &input.items {
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
                    "Product {} is inactive and cannot be sold",
                    product.sku
                )));
            }
            let unit_price = item.selling_price.unwrap_or(product.selling_price);
            total_amount += unit_price * Decimal::from(item.quantity);
            lines.push((product.id, item.quantity, unit_price));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let created = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(invoice_number),
            customer_name: Set(input.customer_name.trim().to_string()),
            payment_method: Set(input.payment_method.as_str().to_string()),
            status: Set(InvoiceStatus::Pending.as_str().to_string()),
            total_amount: Set(total_amount),
            paid_at: Set(None),
            notes: Set(input.notes.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        for (product_id, quantity, unit_price) in lines {
            invoice_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(created.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                selling_price: Set(unit_price),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %created.id, invoice_number = %created.invoice_number, "Invoice created");
        self.event_sender
            .send_or_log(Event::InvoiceCreated(created.id))
            .await;

        Ok(created)
    }

    /// Flips a pending invoice to a terminal status inside `txn`. Zero rows
    /// affected means the invoice is already terminal (or a concurrent
    /// transition won the race), reported as InvalidTransition.
    async fn flip_pending_status(
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
        to: InvoiceStatus,
        stamp_paid_at: bool,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let mut update = Invoice::update_many()
            .col_expr(invoice::Column::Status, Expr::value(to.as_str()))
            .col_expr(invoice::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(invoice::Column::Id.eq(invoice_id))
            .filter(invoice::Column::Status.eq(InvoiceStatus::Pending.as_str()));
        if stamp_paid_at {
            update = update.col_expr(invoice::Column::PaidAt, Expr::value(Some(now)));
        }

        let result = update.exec(txn).await.map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            let current = Invoice::find_by_id(invoice_id)
                .one(txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Invoice with ID {} not found", invoice_id))
                })?;
            return Err(ServiceError::invalid_transition(
                "invoice",
                &current.status,
                to.as_str(),
            ));
        }
        Ok(())
    }

    /// Marks an invoice paid: per line, one "out" movement referencing the
    /// sale. The cumulative deduction per product is pre-checked against
    /// current stock in line order, so the first shortfall is the one
    /// reported; any failure aborts the whole transition with no partial
    /// writes.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        invoice_id: Uuid,
        performed_by: &str,
    ) -> Result<invoice::Model, ServiceError> {
        let existing = self.get(invoice_id).await?;
        if !existing.is_pending() {
            return Err(ServiceError::invalid_transition(
                "invoice",
                &existing.status,
                InvoiceStatus::Paid.as_str(),
            ));
        }

        let items = InvoiceItem::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Invoice has no line items".to_string(),
            ));
        }

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let _guards = self.ledger.lock_products(&product_ids).await;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        Self::flip_pending_status(&txn, invoice_id, InvoiceStatus::Paid, true).await?;

        // Pre-check cumulative deductions per product, in line order, so a
        // product listed twice is checked against its combined quantity.
        let mut cumulative: Vec<(Uuid, i32)> = Vec::new();
        for item in &items {
            match cumulative
                .iter_mut()
                .find(|(product_id, _)| *product_id == item.product_id)
            {
                Some((_, quantity)) => *quantity += item.quantity,
                None => cumulative.push((item.product_id, item.quantity)),
            }
        }
        for (product_id, requested) in &cumulative {
            let product = product::Entity::find_by_id(*product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product with ID {} not found", product_id))
                })?;
            if *requested > product.quantity {
                return Err(ServiceError::insufficient_stock(
                    product.sku,
                    *requested,
                    product.quantity,
                ));
            }
        }

        let mut applied: Vec<AppliedMovement> = Vec::with_capacity(items.len());
        for item in &items {
            let movement = StockMovementService::apply_movement(
                &txn,
                &RecordMovement {
                    product_id: item.product_id,
                    movement_type: MovementType::Out,
                    quantity: item.quantity,
                    reference: MovementReference::Sale,
                    reference_id: Some(invoice_id),
                    performed_by: performed_by.to_string(),
                    note: Some(format!("Invoice {}", existing.invoice_number)),
                },
            )
            .await?;
            applied.push(movement);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, lines = applied.len(), "Invoice paid");
        for movement in &applied {
            self.ledger.emit_movement_events(movement).await;
        }
        self.event_sender
            .send_or_log(Event::InvoicePaid(invoice_id))
            .await;

        self.get(invoice_id).await
    }

    /// Cancels a pending invoice. No ledger effect.
    #[instrument(skip(self))]
    pub async fn cancel(&self, invoice_id: Uuid) -> Result<invoice::Model, ServiceError> {
        // Existence check first so unknown ids report 404, not 409
        self.get(invoice_id).await?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        Self::flip_pending_status(&txn, invoice_id, InvoiceStatus::Cancelled, false).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, "Invoice cancelled");
        self.event_sender
            .send_or_log(Event::InvoiceCancelled(invoice_id))
            .await;

        self.get(invoice_id).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, invoice_id: Uuid) -> Result<invoice::Model, ServiceError> {
        Invoice::find_by_id(invoice_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Invoice with ID {} not found", invoice_id))
            })
    }

    /// Fetches an invoice together with its line items.
    #[instrument(skip(self))]
    pub async fn get_with_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<(invoice::Model, Vec<invoice_item::Model>), ServiceError> {
        let header = self.get(invoice_id).await?;
        let items = InvoiceItem::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((header, items))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: InvoiceFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<invoice::Model>, u64), ServiceError> {
        let db = &*self.db;

        let mut find = Invoice::find();
        if let Some(status) = filter.status {
            find = find.filter(invoice::Column::Status.eq(status.as_str()));
        }
        if let Some(customer) = &filter.customer_name {
            let term = customer.trim();
            if !term.is_empty() {
                find = find.filter(invoice::Column::CustomerName.contains(term));
            }
        }

        let paginator = find
            .order_by_desc(invoice::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
