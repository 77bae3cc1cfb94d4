use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Page number clamped to at least 1
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Page size clamped into [1, max]
    pub fn per_page(&self, max: u64) -> u64 {
        self.per_page.clamp(1, max)
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(page, per_page, total),
        }
    }
}

/// Inclusive date range query parameters (YYYY-MM-DD)
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct DateRangeParams {
    pub start_date: String,
    pub end_date: String,
}

impl DateRangeParams {
    /// Parses the range into UTC datetimes covering the whole days:
    /// start at 00:00:00, end at 23:59:59.
    pub fn to_datetime_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|e| ApiError::ValidationError(format!("Invalid start_date: {}", e)))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ApiError::ValidationError("Invalid start_date".to_string()))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .map_err(|e| ApiError::ValidationError(format!("Invalid end_date: {}", e)))?
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| ApiError::ValidationError("Invalid end_date".to_string()))?;

        let start = DateTime::<Utc>::from_naive_utc_and_offset(start, Utc);
        let end = DateTime::<Utc>::from_naive_utc_and_offset(end, Utc);

        if end < start {
            return Err(ApiError::ValidationError(
                "end_date cannot be before start_date".to_string(),
            ));
        }

        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_up_total_pages() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn pagination_params_clamp() {
        let params = PaginationParams { page: 0, per_page: 5000 };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(100), 100);
    }

    #[test]
    fn date_range_covers_whole_days() {
        let params = DateRangeParams {
            start_date: "2025-03-01".into(),
            end_date: "2025-03-02".into(),
        };
        let (start, end) = params.to_datetime_range().unwrap();
        assert_eq!(start.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-03-02T23:59:59+00:00");
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let params = DateRangeParams {
            start_date: "2025-03-02".into(),
            end_date: "2025-03-01".into(),
        };
        assert!(params.to_datetime_range().is_err());
    }
}
