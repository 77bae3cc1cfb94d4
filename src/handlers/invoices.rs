use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::invoice::{InvoiceStatus, PaymentMethod},
    errors::ApiError,
    handlers::AppState,
    services::invoices::{CreateInvoice, InvoiceFilter, InvoiceLineInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct InvoiceItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Unit price; defaults to the product's selling price when omitted
    pub selling_price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    /// Generated when omitted
    pub invoice_number: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[schema(value_type = String, example = "cash")]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<InvoiceStatus>,
    pub customer: Option<String>,
}

// Handler functions

/// Create a new invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let invoice = state
        .services
        .invoices
        .create(CreateInvoice {
            invoice_number: payload.invoice_number,
            customer_name: payload.customer_name,
            payment_method: payload.payment_method,
            notes: payload.notes,
            items: payload
                .items
                .into_iter()
                .map(|item| InvoiceLineInput {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    selling_price: item.selling_price,
                })
                .collect(),
        })
        .await
        .map_err(map_service_error)?;

    info!("Invoice created: {}", invoice.id);

    Ok(created_response(invoice))
}

/// Get an invoice with its line items
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched"),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (invoice, items) = state
        .services
        .invoices
        .get_with_items(invoice_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "invoice": invoice,
        "items": items,
    })))
}

/// List invoices
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(PaginationParams),
    responses((status = 200, description = "Invoices listed")),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(filter): Query<InvoiceListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .invoices
        .list(
            InvoiceFilter {
                status: filter.status,
                customer_name: filter.customer,
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

/// Mark an invoice paid, deducting stock for every line item.
/// Fails atomically with 409 when any line exceeds available stock.
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/pay",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice paid"),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock or invoice no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn pay_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let invoice = state
        .services
        .invoices
        .mark_paid(invoice_id, &user.actor_label())
        .await
        .map_err(map_service_error)?;

    info!("Invoice paid: {}", invoice.id);

    Ok(success_response(invoice))
}

/// Cancel a pending invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/cancel",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice cancelled"),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoice is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let invoice = state
        .services
        .invoices
        .cancel(invoice_id)
        .await
        .map_err(map_service_error)?;

    info!("Invoice cancelled: {}", invoice.id);

    Ok(success_response(invoice))
}

/// Creates the routers for invoice endpoints
pub fn invoice_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/:id", get(get_invoice))
}

pub fn invoice_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invoice))
        .route("/:id/pay", post(pay_invoice))
        .route("/:id/cancel", post(cancel_invoice))
}
