//! Error types for the HTTP edge.
//!
//! [`ApiError`] maps the data-layer taxonomy onto status codes. Not-found
//! and conflict stay distinct: 404 means "do not retry", 412 means
//! "refresh and retry".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roster_db::DbError;
use roster_services::ImportError;

use crate::etag::EtagError;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A data-layer failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A bulk import failure.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// A conditional write arrived without `If-Match`.
    #[error("If-Match header is required")]
    PreconditionMissing,

    /// The `If-Match` value is not a version tag.
    #[error(transparent)]
    Etag(#[from] EtagError),

    /// A malformed header or parameter.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Status code for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Db(e) => db_status(e),
            Self::Import(ImportError::InvalidRow { .. })
            | Self::PreconditionMissing
            | Self::Etag(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Import(ImportError::Failed { source, .. }) => db_status(source),
        }
    }
}

const fn db_status(error: &DbError) -> StatusCode {
    match error {
        DbError::NotFound { .. } => StatusCode::NOT_FOUND,
        DbError::Conflict { .. } => StatusCode::PRECONDITION_FAILED,
        DbError::Duplicate { .. } => StatusCode::CONFLICT,
        DbError::Validation(_) => StatusCode::BAD_REQUEST,
        DbError::Resource(_) | DbError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        DbError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        DbError::Store { .. } | DbError::Migration(_) | DbError::Io(_) | DbError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_not_found_map_to_different_statuses() {
        let conflict = ApiError::from(DbError::conflict("player", 5));
        let missing = ApiError::from(DbError::not_found("player", 5));
        assert_eq!(conflict.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn cancellation_and_deadline_are_distinct() {
        assert_eq!(ApiError::from(DbError::Cancelled).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(DbError::DeadlineExceeded).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn failed_import_reports_the_underlying_status() {
        let err = ApiError::from(ImportError::Failed {
            committed: 3,
            source: DbError::Duplicate {
                entity: "client",
                key: "account_no AC1".to_owned(),
            },
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
