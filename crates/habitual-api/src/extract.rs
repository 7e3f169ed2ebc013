use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiError;

/// JSON body whose rejections render as `{ "error": ... }` with status 400.
pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;
pub type ApiQuery<T> = WithRejection<Query<T>, ApiError>;
pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Parse an optional id field. Absent, null and blank all read as `None`.
pub fn optional_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("invalid {field}: {raw}"))),
        None => Ok(None),
    }
}
