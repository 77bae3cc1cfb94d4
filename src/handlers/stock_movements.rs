use super::common::{
    map_service_error, success_response, validate_input, PaginatedResponse, PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::stock_movement::{MovementReference, MovementType},
    errors::ApiError,
    handlers::AppState,
    services::stock_movements::{MovementQuery, RecordMovement},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request DTOs

/// Manual ledger adjustment. The same non-negative-stock rule applies as
/// for sales: an "out" adjustment larger than available stock is rejected.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    /// "in" adds stock, "out" removes it
    #[schema(value_type = String, example = "in")]
    pub movement_type: MovementType,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// "manual" or "adjustment"; defaults to "manual"
    #[schema(value_type = Option<String>, example = "manual")]
    pub reference_type: Option<MovementReference>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovementListQuery {
    /// Filter by direction: in | out
    pub r#type: Option<MovementType>,
    /// Filter by business reason: purchase | sale | manual | adjustment | return
    pub reference_type: Option<MovementReference>,
    /// Inclusive start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

fn parse_date(
    value: &Option<String>,
    field: &str,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ApiError::ValidationError(format!("Invalid {}: {}", field, e)))?;
            let naive = if end_of_day {
                date.and_hms_opt(23, 59, 59)
            } else {
                date.and_hms_opt(0, 0, 0)
            }
            .ok_or_else(|| ApiError::ValidationError(format!("Invalid {}", field)))?;
            Ok(Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)))
        }
    }
}

// Handler functions

/// Query the movement ledger
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements",
    params(PaginationParams),
    responses((status = 200, description = "Movements listed")),
    tag = "stock-movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let start_date = parse_date(&filter.start_date, "start_date", false)?;
    let end_date = parse_date(&filter.end_date, "end_date", true)?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(ApiError::ValidationError(
                "end_date cannot be before start_date".to_string(),
            ));
        }
    }

    let (items, total) = state
        .services
        .stock_movements
        .query(
            MovementQuery {
                movement_type: filter.r#type,
                reference_type: filter.reference_type,
                start_date,
                end_date,
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

/// Full movement history for one product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements/product/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Movements listed"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn list_movements_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .stock_movements
        .list_for_product(product_id, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

/// Record a manual stock adjustment
#[utoipa::path(
    post,
    path = "/api/v1/stock-movements/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Adjustment recorded"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let reference = match payload.reference_type {
        Some(MovementReference::Purchase) | Some(MovementReference::Sale) => {
            return Err(ApiError::ValidationError(
                "Manual adjustments must use reference_type manual, adjustment or return"
                    .to_string(),
            ));
        }
        Some(reference) => reference,
        None => MovementReference::Manual,
    };

    let entry = state
        .services
        .stock_movements
        .record(RecordMovement {
            product_id: payload.product_id,
            movement_type: payload.movement_type,
            quantity: payload.quantity,
            reference,
            reference_id: None,
            performed_by: user.actor_label(),
            note: payload.note,
        })
        .await
        .map_err(map_service_error)?;

    info!(
        "Stock adjustment recorded: {} {} on product {}",
        entry.r#type, entry.quantity, entry.product_id
    );

    Ok(success_response(entry))
}

/// Creates the routers for stock movement endpoints
pub fn stock_movement_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movements))
        .route("/product/:id", get(list_movements_for_product))
}

pub fn stock_movement_adjust_routes() -> Router<AppState> {
    Router::new().route("/adjust", post(adjust_stock))
}
