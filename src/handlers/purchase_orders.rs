use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::purchase_order::PurchaseOrderStatus,
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::{
        CreatePurchaseOrder, PurchaseOrderFilter, PurchaseOrderLineInput, UpdatePurchaseOrder,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Unit cost; defaults to the product's purchase price when omitted
    pub purchase_price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    /// Generated when omitted
    pub order_number: Option<String>,
    pub vendor_id: Uuid,
    /// Expected delivery date (YYYY-MM-DD)
    pub expected_delivery_date: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderRequest {
    /// Expected delivery date (YYYY-MM-DD)
    pub expected_delivery_date: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    /// Replaces the full line item set when provided
    pub items: Option<Vec<PurchaseOrderItemRequest>>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderListQuery {
    pub status: Option<PurchaseOrderStatus>,
    pub vendor_id: Option<Uuid>,
}

fn parse_expected_date(value: &Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let naive = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| {
                    ApiError::ValidationError(format!("Invalid expected_delivery_date: {}", e))
                })?
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| {
                    ApiError::ValidationError("Invalid expected_delivery_date".to_string())
                })?;
            Ok(Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)))
        }
    }
}

fn to_line_inputs(items: Vec<PurchaseOrderItemRequest>) -> Vec<PurchaseOrderLineInput> {
    items
        .into_iter()
        .map(|item| PurchaseOrderLineInput {
            product_id: item.product_id,
            quantity: item.quantity,
            purchase_price: item.purchase_price,
        })
        .collect()
}

// Handler functions

/// Create a new purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let expected_delivery_date = parse_expected_date(&payload.expected_delivery_date)?;

    let order = state
        .services
        .purchase_orders
        .create(CreatePurchaseOrder {
            order_number: payload.order_number,
            vendor_id: payload.vendor_id,
            expected_delivery_date,
            notes: payload.notes,
            items: to_line_inputs(payload.items),
        })
        .await
        .map_err(map_service_error)?;

    info!("Purchase order created: {}", order.id);

    Ok(created_response(order))
}

/// Get a purchase order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (order, items) = state
        .services
        .purchase_orders
        .get_with_items(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "order": order,
        "items": items,
    })))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PaginationParams),
    responses((status = 200, description = "Purchase orders listed")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .purchase_orders
        .list(
            PurchaseOrderFilter {
                status: filter.status,
                vendor_id: filter.vendor_id,
            },
            page,
            per_page,
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

/// Update a pending purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}",
    request_body = UpdatePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let expected_delivery_date = parse_expected_date(&payload.expected_delivery_date)?;

    let order = state
        .services
        .purchase_orders
        .update(
            order_id,
            UpdatePurchaseOrder {
                expected_delivery_date,
                notes: payload.notes,
                items: payload.items.map(to_line_inputs),
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Purchase order updated: {}", order.id);

    Ok(success_response(order))
}

/// Mark a purchase order delivered, receiving stock for every line item
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/deliver",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order delivered"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn deliver_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .mark_delivered(order_id, &user.actor_label())
        .await
        .map_err(map_service_error)?;

    info!("Purchase order delivered: {}", order.id);

    Ok(success_response(order))
}

/// Cancel a pending purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order cancelled"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .cancel(order_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order cancelled: {}", order.id);

    Ok(success_response(order))
}

/// Creates the routers for purchase order endpoints
pub fn purchase_order_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
}

pub fn purchase_order_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/:id", put(update_purchase_order))
        .route("/:id/deliver", post(deliver_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
}
