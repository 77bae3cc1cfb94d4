use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::EntityStatus,
    errors::ApiError,
    handlers::AppState,
    services::categories::{CreateCategory, UpdateCategory},
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
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub status: Option<EntityStatus>,
}

pub async fn create_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .categories
        .create(CreateCategory {
            name: payload.name,
            description: payload.description,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(category))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(filter): Query<CategoryListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page();
    let per_page = pagination.per_page(state.config.api_max_page_size);

    let (items, total) = state
        .services
        .categories
        .list(filter.status, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

pub async fn update_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .categories
        .update(
            category_id,
            UpdateCategory {
                name: payload.name,
                description: payload.description,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

pub async fn deactivate_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(category_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .deactivate(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

pub async fn activate_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(category_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .activate(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

pub fn category_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
}

pub fn category_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(deactivate_category))
        .route("/:id/activate", post(activate_category))
}
