use crate::{
    db::DbPool,
    entities::{
        dashboard_snapshot::{self, Entity as DashboardSnapshot, SNAPSHOT_ROW_ID},
        invoice::{self, Entity as Invoice, InvoiceStatus},
        invoice_item::{self, Entity as InvoiceItem},
        product::{self, Entity as Product},
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItem},
        stock_movement::{self, Entity as StockMovement, MovementType},
        vendor,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Dashboard overview figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverviewStats {
    pub total_products: i64,
    pub active_products: i64,
    pub total_stock: i64,
    pub low_stock_products: i64,
    pub inventory_value: Decimal,
    pub total_sales: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub generated_at: DateTime<Utc>,
    /// True when served from the rebuilt snapshot rather than computed live
    pub cached: bool,
}

/// Stock movement sums over a date window, partitioned by direction
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockReport {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_in: i64,
    pub total_out: i64,
    pub net_change: i64,
    pub entries: u64,
}

/// Revenue, cost and profit over all paid invoices
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfitLoss {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopVendor {
    pub vendor_id: Uuid,
    pub name: String,
    pub purchase_value: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopCustomer {
    pub customer_name: String,
    pub total_spent: Decimal,
    pub invoices: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopInsights {
    pub best_selling_product: Option<TopProduct>,
    pub top_vendor: Option<TopVendor>,
    pub top_customer: Option<TopCustomer>,
}

/// Reporting aggregator: read-only summaries over the registry, the ledger
/// and the order records. The only write is `rebuild`, which refreshes the
/// cached overview snapshot and touches nothing else.
///
/// Snapshot reads are eventually consistent with concurrent ledger writes;
/// the live computation path is authoritative.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    cache_ttl_secs: u64,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, cache_ttl_secs: u64) -> Self {
        Self {
            db,
            event_sender,
            cache_ttl_secs,
        }
    }

    /// Loads all paid invoices with their line items and the product map
    /// needed to cost them.
    async fn load_sales(
        &self,
    ) -> Result<
        (
            Vec<invoice::Model>,
            Vec<invoice_item::Model>,
            HashMap<Uuid, product::Model>,
        ),
        ServiceError,
    > {
        let db = &*self.db;

        let paid_invoices = Invoice::find()
            .filter(invoice::Column::Status.eq(InvoiceStatus::Paid.as_str()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let invoice_ids: Vec<Uuid> = paid_invoices.iter().map(|inv| inv.id).collect();
        let items = if invoice_ids.is_empty() {
            Vec::new()
        } else {
            InvoiceItem::find()
                .filter(invoice_item::Column::InvoiceId.is_in(invoice_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
        };

        let products = Product::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let products_by_id: HashMap<Uuid, product::Model> =
            products.into_iter().map(|p| (p.id, p)).collect();

        Ok((paid_invoices, items, products_by_id))
    }

    async fn compute_overview(&self) -> Result<OverviewStats, ServiceError> {
        let db = &*self.db;

        let products = Product::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let total_products = products.len() as i64;
        let active_products = products.iter().filter(|p| p.is_active()).count() as i64;
        let total_stock: i64 = products.iter().map(|p| p.quantity as i64).sum();
        let low_stock_products = products.iter().filter(|p| p.is_low_stock()).count() as i64;
        let inventory_value: Decimal = products
            .iter()
            .map(|p| p.purchase_price * Decimal::from(p.quantity))
            .sum();

        let (paid_invoices, items, products_by_id) = self.load_sales().await?;

        let total_sales: Decimal = paid_invoices.iter().map(|inv| inv.total_amount).sum();
        let total_cost: Decimal = items
            .iter()
            .filter_map(|item| {
                products_by_id
                    .get(&item.product_id)
                    .map(|p| p.purchase_price * Decimal::from(item.quantity))
            })
            .sum();
        let total_profit = total_sales - total_cost;

        Ok(OverviewStats {
            total_products,
            active_products,
            total_stock,
            low_stock_products,
            inventory_value,
            total_sales,
            total_cost,
            total_profit,
            generated_at: Utc::now(),
            cached: false,
        })
    }

    /// Dashboard overview: served from the snapshot when one is fresh
    /// enough, otherwise computed live.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<OverviewStats, ServiceError> {
        if self.cache_ttl_secs > 0 {
            let snapshot = DashboardSnapshot::find_by_id(SNAPSHOT_ROW_ID)
                .one(&*self.db)
                .await
                .map_err(ServiceError::db_error)?;
            if let Some(snapshot) = snapshot {
                let age = Utc::now() - snapshot.generated_at;
                if age <= Duration::seconds(self.cache_ttl_secs as i64) {
                    return Ok(OverviewStats {
                        total_products: snapshot.total_products,
                        active_products: snapshot.active_products,
                        total_stock: snapshot.total_stock,
                        low_stock_products: snapshot.low_stock_products,
                        inventory_value: snapshot.inventory_value,
                        total_sales: snapshot.total_sales,
                        total_cost: snapshot.total_cost,
                        total_profit: snapshot.total_profit,
                        generated_at: snapshot.generated_at,
                        cached: true,
                    });
                }
            }
        }

        self.compute_overview().await
    }

    /// Recomputes the overview and persists it as the cached snapshot.
    /// Idempotent; reads the ledger and order records, writes only the
    /// snapshot row.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<OverviewStats, ServiceError> {
        let stats = self.compute_overview().await?;

        let existing = DashboardSnapshot::find_by_id(SNAPSHOT_ROW_ID)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let active = dashboard_snapshot::ActiveModel {
            id: Set(SNAPSHOT_ROW_ID),
            total_products: Set(stats.total_products),
            active_products: Set(stats.active_products),
            total_stock: Set(stats.total_stock),
            low_stock_products: Set(stats.low_stock_products),
            inventory_value: Set(stats.inventory_value),
            total_sales: Set(stats.total_sales),
            total_cost: Set(stats.total_cost),
            total_profit: Set(stats.total_profit),
            generated_at: Set(stats.generated_at),
        };

        if existing.is_some() {
            active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        } else {
            active.insert(&*self.db).await.map_err(ServiceError::db_error)?;
        }

        info!("Dashboard snapshot rebuilt");
        self.event_sender.send_or_log(Event::DashboardRebuilt).await;

        Ok(stats)
    }

    /// Sums ledger quantities over a window, partitioned by direction.
    #[instrument(skip(self))]
    pub async fn stock_report(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<StockReport, ServiceError> {
        if end_date < start_date {
            return Err(ServiceError::ValidationError(
                "End date cannot be before start date".to_string(),
            ));
        }

        let movements = StockMovement::find()
            .filter(stock_movement::Column::CreatedAt.gte(start_date))
            .filter(stock_movement::Column::CreatedAt.lte(end_date))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut total_in: i64 = 0;
        let mut total_out: i64 = 0;
        for movement in &movements {
            match movement.movement_type() {
                Some(MovementType::In) => total_in += movement.quantity as i64,
                Some(MovementType::Out) => total_out += movement.quantity as i64,
                None => {}
            }
        }

        Ok(StockReport {
            start_date,
            end_date,
            total_in,
            total_out,
            net_change: total_in - total_out,
            entries: movements.len() as u64,
        })
    }

    /// Revenue, cost and profit over all paid invoices. Cost prices sold
    /// line items at the product's current purchase price.
    #[instrument(skip(self))]
    pub async fn profit_loss(&self) -> Result<ProfitLoss, ServiceError> {
        let (paid_invoices, items, products_by_id) = self.load_sales().await?;

        let revenue: Decimal = paid_invoices.iter().map(|inv| inv.total_amount).sum();
        let cost: Decimal = items
            .iter()
            .filter_map(|item| {
                products_by_id
                    .get(&item.product_id)
                    .map(|p| p.purchase_price * Decimal::from(item.quantity))
            })
            .sum();

        Ok(ProfitLoss {
            revenue,
            cost,
            profit: revenue - cost,
        })
    }

    /// Best-selling product, top vendor and top customer.
    #[instrument(skip(self))]
    pub async fn top_insights(&self) -> Result<TopInsights, ServiceError> {
        let db = &*self.db;

        let (paid_invoices, items, products_by_id) = self.load_sales().await?;

        // Best-selling product by summed quantity across paid invoice lines
        let mut product_sales: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
        for item in &items {
            let entry = product_sales
                .entry(item.product_id)
                .or_insert((0, Decimal::ZERO));
            entry.0 += item.quantity as i64;
            entry.1 += item.selling_price * Decimal::from(item.quantity);
        }
        let best_selling_product = product_sales
            .into_iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0))
            .and_then(|(product_id, (quantity_sold, revenue))| {
                products_by_id.get(&product_id).map(|p| TopProduct {
                    product_id,
                    sku: p.sku.clone(),
                    name: p.name.clone(),
                    quantity_sold,
                    revenue,
                })
            });

        // Top vendor by purchase value across delivered purchase orders
        let delivered_orders = PurchaseOrder::find()
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Delivered.as_str()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let order_ids: Vec<Uuid> = delivered_orders.iter().map(|po| po.id).collect();
        let order_items = if order_ids.is_empty() {
            Vec::new()
        } else {
            PurchaseOrderItem::find()
                .filter(purchase_order_item::Column::PurchaseOrderId.is_in(order_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
        };
        let vendor_by_order: HashMap<Uuid, Uuid> = delivered_orders
            .iter()
            .map(|po| (po.id, po.vendor_id))
            .collect();
        let mut vendor_purchases: HashMap<Uuid, Decimal> = HashMap::new();
        for item in &order_items {
            if let Some(vendor_id) = vendor_by_order.get(&item.purchase_order_id) {
                *vendor_purchases.entry(*vendor_id).or_insert(Decimal::ZERO) += item.line_total();
            }
        }
        let top_vendor = match vendor_purchases
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1))
        {
            Some((vendor_id, purchase_value)) => {
                let vendor = vendor::Entity::find_by_id(vendor_id)
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                vendor.map(|v| TopVendor {
                    vendor_id,
                    name: v.name,
                    purchase_value,
                    orders: delivered_orders
                        .iter()
                        .filter(|po| po.vendor_id == vendor_id)
                        .count() as i64,
                })
            }
            None => None,
        };

        // Top customer by summed totals across paid invoices
        let mut customer_totals: HashMap<String, (Decimal, i64)> = HashMap::new();
        for inv in &paid_invoices {
            let entry = customer_totals
                .entry(inv.customer_name.clone())
                .or_insert((Decimal::ZERO, 0));
            entry.0 += inv.total_amount;
            entry.1 += 1;
        }
        let top_customer = customer_totals
            .into_iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0))
            .map(|(customer_name, (total_spent, invoices))| TopCustomer {
                customer_name,
                total_spent,
                invoices,
            });

        Ok(TopInsights {
            best_selling_product,
            top_vendor,
            top_customer,
        })
    }
}
