use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::EntityStatus,
    errors::ApiError,
    handlers::AppState,
    services::staff::{CreateStaffMember, UpdateStaffMember},
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
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStaffRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StaffListQuery {
    pub status: Option<EntityStatus>,
}

pub async fn create_staff_member(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let member = state
        .services
        .staff
        .create(CreateStaffMember {
            name: payload.name,
            email: payload.email,
            role: payload.role,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(member))
}

pub async fn get_staff_member(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let member = state
        .services
        .staff
        .get(staff_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(member))
}

pub async fn list_staff_members(
    State(state): State<AppState>,
    Query(filter): Query<StaffListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .staff
        .list(filter.status, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

pub async fn update_staff_member(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(staff_id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let member = state
        .services
        .staff
        .update(
            staff_id,
            UpdateStaffMember {
                name: payload.name,
                role: payload.role,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(member))
}

pub async fn deactivate_staff_member(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(staff_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let member = state
        .services
        .staff
        .deactivate(staff_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(member))
}

pub async fn activate_staff_member(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(staff_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let member = state
        .services
        .staff
        .activate(staff_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(member))
}

pub fn staff_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_staff_members))
        .route("/:id", get(get_staff_member))
}

pub fn staff_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_staff_member))
        .route("/:id", put(update_staff_member))
        .route("/:id", delete(deactivate_staff_member))
        .route("/:id/activate", post(activate_staff_member))
}
