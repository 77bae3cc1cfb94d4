use crate::{
    db::DbPool,
    entities::{
        category,
        product::{self, Entity as Product, RECOGNIZED_UNITS},
        EntityStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for registering a product
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub sku: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub low_stock_threshold: i32,
}

/// Patch for updating a product. Quantity is deliberately absent: stock
/// changes only flow through the movement ledger.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub unit: Option<String>,
    pub low_stock_threshold: Option<i32>,
}

/// Filter for listing products
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub status: Option<EntityStatus>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub low_stock_only: bool,
}

/// Canonical SKU form: trimmed and uppercased. Uniqueness is checked on
/// this form, so lookups are case-insensitive.
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Product registry: canonical catalog entries.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    fn validate_common(
        purchase_price: Decimal,
        selling_price: Decimal,
        unit: &str,
        low_stock_threshold: i32,
    ) -> Result<(), ServiceError> {
        if purchase_price < Decimal::ZERO || selling_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Prices cannot be negative".to_string(),
            ));
        }
        if selling_price < purchase_price {
            return Err(ServiceError::ValidationError(format!(
                "Selling price {} cannot be below purchase price {}",
                selling_price, purchase_price
            )));
        }
        if !RECOGNIZED_UNITS.contains(&unit) {
            return Err(ServiceError::ValidationError(format!(
                "Unrecognized unit '{}'; expected one of: {}",
                unit,
                RECOGNIZED_UNITS.join(", ")
            )));
        }
        if low_stock_threshold < 1 {
            return Err(ServiceError::ValidationError(
                "Low stock threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let found = category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        match found {
            Some(cat) if cat.is_active() => Ok(()),
            Some(_) => Err(ServiceError::ValidationError(format!(
                "Category {} is inactive",
                category_id
            ))),
            None => Err(ServiceError::NotFound(format!(
                "Category with ID {} not found",
                category_id
            ))),
        }
    }

    async fn find_by_normalized_sku(
        &self,
        sku: &str,
    ) -> Result<Option<product::Model>, ServiceError> {
        Product::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Registers a new product. The initial quantity becomes the ledger
    /// baseline; no synthetic movement is written for it.
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateProduct) -> Result<product::Model, ServiceError> {
        let sku = normalize_sku(&input.sku);
        if sku.is_empty() {
            return Err(ServiceError::ValidationError(
                "SKU is required".to_string(),
            ));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }
        Self::validate_common(
            input.purchase_price,
            input.selling_price,
            &input.unit,
            input.low_stock_threshold,
        )?;

        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        if self.find_by_normalized_sku(&sku).await?.is_some() {
            return Err(ServiceError::DuplicateSku(sku));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(input.name.trim().to_string()),
            category_id: Set(input.category_id),
            purchase_price: Set(input.purchase_price),
            selling_price: Set(input.selling_price),
            quantity: Set(input.quantity),
            unit: Set(input.unit),
            low_stock_threshold: Set(input.low_stock_threshold),
            status: Set(EntityStatus::Active.as_str().to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        };

        let created = model.insert(&*self.db).await.map_err(ServiceError::db_error)?;

        info!(product_id = %created.id, sku = %created.sku, "Product registered");
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;

        Ok(created)
    }

    /// Applies a patch to a product. Quantity and status never change here.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        product_id: Uuid,
        patch: UpdateProduct,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get(product_id).await?;

        let purchase_price = patch.purchase_price.unwrap_or(existing.purchase_price);
        let selling_price = patch.selling_price.unwrap_or(existing.selling_price);
        let unit = patch.unit.clone().unwrap_or_else(|| existing.unit.clone());
        let low_stock_threshold = patch
            .low_stock_threshold
            .unwrap_or(existing.low_stock_threshold);
        Self::validate_common(purchase_price, selling_price, &unit, low_stock_threshold)?;

        if let Some(category_id) = patch.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let sku = match &patch.sku {
            Some(raw) => {
                let normalized = normalize_sku(raw);
                if normalized.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "SKU is required".to_string(),
                    ));
                }
                if normalized != existing.sku {
                    if self.find_by_normalized_sku(&normalized).await?.is_some() {
                        return Err(ServiceError::DuplicateSku(normalized));
                    }
                }
                normalized
            }
            None => existing.sku.clone(),
        };

        let mut active: product::ActiveModel = existing.into();
        active.sku = Set(sku);
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product name is required".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(category_id) = patch.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.purchase_price = Set(purchase_price);
        active.selling_price = Set(selling_price);
        active.unit = Set(unit);
        active.low_stock_threshold = Set(low_stock_threshold);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Soft-deactivates a product. Idempotent: deactivating an inactive
    /// product is a no-op.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        self.set_status(product_id, EntityStatus::Inactive).await
    }

    /// Reactivates a previously deactivated product.
    #[instrument(skip(self))]
    pub async fn activate(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        self.set_status(product_id, EntityStatus::Active).await
    }

    async fn set_status(
        &self,
        product_id: Uuid,
        status: EntityStatus,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get(product_id).await?;
        if existing.status == status.as_str() {
            return Ok(existing);
        }

        let mut active: product::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        let event = match status {
            EntityStatus::Active => Event::ProductActivated(updated.id),
            EntityStatus::Inactive => Event::ProductDeactivated(updated.id),
        };
        self.event_sender.send_or_log(event).await;

        Ok(updated)
    }

    /// The only write path for `Product.quantity`. Invoked by the movement
    /// ledger inside the same transaction as the movement insert; the
    /// non-negative check here is the registry's own guard, independent of
    /// the ledger's.
    pub(crate) async fn adjust_quantity<C>(
        conn: &C,
        current: product::Model,
        new_quantity: i32,
    ) -> Result<product::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        if new_quantity < 0 {
            return Err(ServiceError::InternalError(format!(
                "Refusing to set negative quantity {} on product {}",
                new_quantity, current.sku
            )));
        }

        let mut active: product::ActiveModel = current.into();
        active.quantity = Set(new_quantity);
        active.updated_at = Set(Some(Utc::now()));
        active.update(conn).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product with ID {} not found", product_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn get_by_sku(&self, sku: &str) -> Result<product::Model, ServiceError> {
        let normalized = normalize_sku(sku);
        self.find_by_normalized_sku(&normalized)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with SKU {} not found", normalized)))
    }

    /// Lists products with optional status/category/search/low-stock filters.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let db = &*self.db;

        let mut find = Product::find();
        if let Some(status) = filter.status {
            find = find.filter(product::Column::Status.eq(status.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            find = find.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = &filter.search {
            let term = search.trim();
            if !term.is_empty() {
                find = find.filter(
                    Condition::any()
                        .add(product::Column::Name.contains(term))
                        .add(product::Column::Sku.contains(&normalize_sku(term))),
                );
            }
        }
        if filter.low_stock_only {
            find = find.filter(
                Expr::col((product::Entity, product::Column::Quantity))
                    .lte(Expr::col((product::Entity, product::Column::LowStockThreshold))),
            );
        }

        let paginator = find
            .order_by_asc(product::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_normalization_uppercases_and_trims() {
        assert_eq!(normalize_sku("  widget-1 "), "WIDGET-1");
        assert_eq!(normalize_sku("abc"), "ABC");
        assert_eq!(normalize_sku(""), "");
    }

    #[test]
    fn pricing_validation_rejects_inverted_margins() {
        use rust_decimal_macros::dec;

        assert!(ProductService::validate_common(dec!(8), dec!(20), "pcs", 5).is_ok());
        assert!(ProductService::validate_common(dec!(20), dec!(8), "pcs", 5).is_err());
        assert!(ProductService::validate_common(dec!(-1), dec!(8), "pcs", 5).is_err());
        assert!(ProductService::validate_common(dec!(8), dec!(20), "furlong", 5).is_err());
        assert!(ProductService::validate_common(dec!(8), dec!(20), "pcs", 0).is_err());
    }
}
