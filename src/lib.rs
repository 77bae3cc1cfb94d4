//! StockLedger API Library
//!
//! Core engine for the inventory dashboard backend: product registry,
//! append-only stock movement ledger, purchase order and invoice workflows,
//! and the dashboard reporting aggregator.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Full v1 API router with auth and permission gating.
///
/// Reads are permission-gated; product mutation, snapshot rebuild and the
/// financial reports are admin-only. The `admin` role passes every
/// permission check.
pub fn api_v1_routes() -> Router<AppState> {
    // Products: reads permission-gated, catalog mutation admin-only,
    // manual stock updates gated on the adjust permission
    let products = handlers::products::product_read_routes()
        .with_permission(perm::PRODUCTS_READ)
        .merge(handlers::products::product_admin_routes().with_role("admin"))
        .merge(handlers::products::product_stock_routes().with_permission(perm::STOCK_ADJUST));

    // Movement ledger
    let stock_movements = handlers::stock_movements::stock_movement_read_routes()
        .with_permission(perm::STOCK_READ)
        .merge(
            handlers::stock_movements::stock_movement_adjust_routes()
                .with_permission(perm::STOCK_ADJUST),
        );

    // Order workflows
    let purchase_orders = handlers::purchase_orders::purchase_order_read_routes()
        .with_permission(perm::PURCHASE_ORDERS_READ)
        .merge(
            handlers::purchase_orders::purchase_order_manage_routes()
                .with_permission(perm::PURCHASE_ORDERS_MANAGE),
        );
    let invoices = handlers::invoices::invoice_read_routes()
        .with_permission(perm::INVOICES_READ)
        .merge(handlers::invoices::invoice_manage_routes().with_permission(perm::INVOICES_MANAGE));

    // Reporting
    let dashboard = handlers::dashboard::dashboard_read_routes()
        .with_permission(perm::DASHBOARD_READ)
        .merge(handlers::dashboard::dashboard_admin_routes().with_role("admin"));

    // Reference entities
    let vendors = handlers::vendors::vendor_read_routes()
        .with_permission(perm::PRODUCTS_READ)
        .merge(handlers::vendors::vendor_manage_routes().with_permission(perm::VENDORS_MANAGE));
    let categories = handlers::categories::category_read_routes()
        .with_permission(perm::PRODUCTS_READ)
        .merge(
            handlers::categories::category_manage_routes()
                .with_permission(perm::CATEGORIES_MANAGE),
        );
    let staff = handlers::staff::staff_read_routes()
        .with_permission(perm::STAFF_MANAGE)
        .merge(handlers::staff::staff_manage_routes().with_permission(perm::STAFF_MANAGE));

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Business API (auth + permissions)
        .nest("/products", products)
        .nest("/stock-movements", stock_movements)
        .nest("/purchase-orders", purchase_orders)
        .nest("/invoices", invoices)
        .nest("/dashboard", dashboard)
        .nest("/vendors", vendors)
        .nest("/categories", categories)
        .nest("/staff", staff)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "stockledger-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
