use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::{
        stock_movement::{MovementReference, MovementType},
        EntityStatus,
    },
    errors::ApiError,
    handlers::AppState,
    services::products::{CreateProduct, ProductFilter, UpdateProduct},
    services::stock_movements::RecordMovement,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, patch, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub category_id: Option<Uuid>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 16))]
    pub unit: String,
    #[validate(range(min = 1))]
    pub low_stock_threshold: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    #[validate(length(min = 1, max = 16))]
    pub unit: Option<String>,
    #[validate(range(min = 1))]
    pub low_stock_threshold: Option<i32>,
}

/// Manual stock correction applied directly to one product
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStockRequest {
    /// "in" adds stock, "out" removes it
    #[schema(value_type = String, example = "in")]
    pub movement_type: MovementType,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub status: Option<EntityStatus>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

// Handler functions

/// Register a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product registered"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .create(CreateProduct {
            sku: payload.sku,
            name: payload.name,
            category_id: payload.category_id,
            purchase_price: payload.purchase_price,
            selling_price: payload.selling_price,
            quantity: payload.quantity,
            unit: payload.unit,
            low_stock_threshold: payload.low_stock_threshold,
        })
        .await
        .map_err(map_service_error)?;

    info!("Product created: {} ({})", product.id, product.sku);

    Ok(created_response(product))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// List products with filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses((status = 200, description = "Products listed")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .products
        .list(
            ProductFilter {
                status: filter.status,
                category_id: filter.category_id,
                search: filter.search,
                low_stock_only: filter.low_stock,
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

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .update(
            product_id,
            UpdateProduct {
                sku: payload.sku,
                name: payload.name,
                category_id: payload.category_id,
                purchase_price: payload.purchase_price,
                selling_price: payload.selling_price,
                unit: payload.unit,
                low_stock_threshold: payload.low_stock_threshold,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Product updated: {}", product.id);

    Ok(success_response(product))
}

/// Deactivate a product (soft delete)
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn deactivate_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .deactivate(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product deactivated: {}", product.id);

    Ok(success_response(product))
}

/// Reactivate a product
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/activate",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product reactivated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn activate_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .activate(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product reactivated: {}", product.id);

    Ok(success_response(product))
}

/// Manually adjust a product's stock level. Delegates to the movement
/// ledger; the correction shows up in the audit trail like any other
/// movement.
#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}/stock",
    request_body = UpdateStockRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock adjusted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let entry = state
        .services
        .stock_movements
        .record(RecordMovement {
            product_id,
            movement_type: payload.movement_type,
            quantity: payload.quantity,
            reference: MovementReference::Manual,
            reference_id: None,
            performed_by: user.actor_label(),
            note: payload.note,
        })
        .await
        .map_err(map_service_error)?;

    info!(
        "Manual stock adjustment on {}: {} {}",
        product_id, entry.r#type, entry.quantity
    );

    Ok(success_response(entry))
}

/// Creates the router for product endpoints.
/// Reads are permission-gated; mutations are wired to the admin role in
/// `api_v1_routes`.
pub fn product_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

pub fn product_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(deactivate_product))
        .route("/:id/activate", post(activate_product))
}

pub fn product_stock_routes() -> Router<AppState> {
    Router::new().route("/:id/stock", patch(update_stock))
}
