use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_sim::LedgerError;
use serde_json::json;
use store::StoreError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The detail is logged when the error is built; clients only see the
    /// generic message.
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => Self::Conflict(format!("{what} already exists")),
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::Ledger(LedgerError::InsufficientFunds { .. }) => {
                Self::BadRequest("Insufficient funds".to_string())
            }
            StoreError::Ledger(ledger) => Self::BadRequest(ledger.to_string()),
            other => {
                error!(error = %other, "database failure");
                Self::Internal("Database error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use core_sim::LedgerError;
    use store::StoreError;

    use super::ApiError;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::Duplicate("ticker"), StatusCode::CONFLICT),
            (StoreError::NotFound("stock"), StatusCode::NOT_FOUND),
            (
                StoreError::Ledger(LedgerError::InsufficientFunds {
                    balance: 1.0,
                    requested: 2.0,
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::Corrupt("bad row".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = ApiError::from(StoreError::Corrupt("secret detail".to_string()));

        assert_eq!(err.to_string(), "Database error");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
