use super::common::{map_service_error, success_response, DateRangeParams};
use crate::{auth::AuthUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Router,
};
use tracing::info;

// Handler functions

/// Dashboard overview figures
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/overview",
    responses(
        (status = 200, description = "Overview computed", body = crate::services::dashboard::OverviewStats)
    ),
    tag = "dashboard"
)]
pub async fn get_overview(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .dashboard
        .overview()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// Rebuild the cached dashboard snapshot
#[utoipa::path(
    post,
    path = "/api/v1/dashboard/rebuild",
    responses(
        (status = 200, description = "Snapshot rebuilt", body = crate::services::dashboard::OverviewStats)
    ),
    tag = "dashboard"
)]
pub async fn rebuild_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .dashboard
        .rebuild()
        .await
        .map_err(map_service_error)?;

    info!(actor = %user.actor_label(), "Dashboard snapshot rebuilt");

    Ok(success_response(stats))
}

/// Stock movement sums over a date window
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stock-report",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Stock report computed", body = crate::services::dashboard::StockReport),
        (status = 400, description = "Invalid date range", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn get_stock_report(
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (start_date, end_date) = params.to_datetime_range()?;

    let report = state
        .services
        .dashboard
        .stock_report(start_date, end_date)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

/// Revenue, cost and profit over all paid invoices
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/profit-loss",
    responses(
        (status = 200, description = "Profit/loss computed", body = crate::services::dashboard::ProfitLoss)
    ),
    tag = "dashboard"
)]
pub async fn get_profit_loss(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let report = state
        .services
        .dashboard
        .profit_loss()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

/// Best-selling product, top vendor and top customer
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/top-insights",
    responses(
        (status = 200, description = "Insights computed", body = crate::services::dashboard::TopInsights)
    ),
    tag = "dashboard"
)]
pub async fn get_top_insights(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let insights = state
        .services
        .dashboard
        .top_insights()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(insights))
}

/// Creates the routers for dashboard endpoints
pub fn dashboard_read_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/stock-report", get(get_stock_report))
}

pub fn dashboard_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/rebuild", post(rebuild_dashboard))
        .route("/profit-loss", get(get_profit_loss))
        .route("/top-insights", get(get_top_insights))
}
