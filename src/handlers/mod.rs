pub mod categories;
pub mod common;
pub mod dashboard;
pub mod invoices;
pub mod products;
pub mod purchase_orders;
pub mod staff;
pub mod stock_movements;
pub mod vendors;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub stock_movements: Arc<crate::services::stock_movements::StockMovementService>,
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub invoices: Arc<crate::services::invoices::InvoiceService>,
    pub dashboard: Arc<crate::services::dashboard::DashboardService>,
    pub vendors: Arc<crate::services::vendors::VendorService>,
    pub categories: Arc<crate::services::categories::CategoryService>,
    pub staff: Arc<crate::services::staff::StaffService>,
}

impl AppServices {
    /// Builds the service container. The movement ledger instance is shared
    /// with the order workflow services so they all serialize on the same
    /// per-product locks.
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, dashboard_cache_ttl_secs: u64) -> Self {
        let stock_movements = crate::services::stock_movements::StockMovementService::new(
            db.clone(),
            event_sender.clone(),
        );

        let products = Arc::new(crate::services::products::ProductService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let purchase_orders = Arc::new(crate::services::purchase_orders::PurchaseOrderService::new(
            db.clone(),
            event_sender.clone(),
            stock_movements.clone(),
        ));
        let invoices = Arc::new(crate::services::invoices::InvoiceService::new(
            db.clone(),
            event_sender.clone(),
            stock_movements.clone(),
        ));
        let dashboard = Arc::new(crate::services::dashboard::DashboardService::new(
            db.clone(),
            event_sender,
            dashboard_cache_ttl_secs,
        ));
        let vendors = Arc::new(crate::services::vendors::VendorService::new(db.clone()));
        let categories = Arc::new(crate::services::categories::CategoryService::new(db.clone()));
        let staff = Arc::new(crate::services::staff::StaffService::new(db));

        Self {
            products,
            stock_movements: Arc::new(stock_movements),
            purchase_orders,
            invoices,
            dashboard,
            vendors,
            categories,
            staff,
        }
    }
}
