use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::EntityStatus,
    errors::ApiError,
    handlers::AppState,
    services::vendors::{CreateVendor, UpdateVendor},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVendorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 64))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateVendorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 64))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VendorListQuery {
    pub status: Option<EntityStatus>,
}

pub async fn create_vendor(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateVendorRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .create(CreateVendor {
            name: payload.name,
            contact_person: payload.contact_person,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(vendor))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    Path(vendor_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .get(vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    Query(filter): Query<VendorListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .vendors
        .list(filter.status, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

pub async fn update_vendor(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(vendor_id): Path<Uuid>,
    Json(payload): Json<UpdateVendorRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .update(
            vendor_id,
            UpdateVendor {
                name: payload.name,
                contact_person: payload.contact_person,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

pub async fn deactivate_vendor(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .deactivate(vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

pub async fn activate_vendor(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .activate(vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

pub fn vendor_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors))
        .route("/:id", get(get_vendor))
}

pub fn vendor_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vendor))
        .route("/:id", put(update_vendor))
        .route("/:id", delete(deactivate_vendor))
        .route("/:id/activate", post(activate_vendor))
}
