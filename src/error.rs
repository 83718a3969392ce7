//! Error handling for the application

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::dpgf::responses::DpgfErrorResponse;
use crate::dpgf::DpgfError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Dpgf(#[from] DpgfError),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, details) = match &self {
            AppError::Dpgf(DpgfError::NoComputableInput { received }) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(serde_json::json!({ "received": received })),
            ),
            AppError::Dpgf(DpgfError::InvalidDecimal {
                element_id, field, ..
            }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_decimal",
                Some(serde_json::json!({ "elementId": element_id, "field": field })),
            ),
            AppError::Dpgf(DpgfError::InvalidTvaPercentage(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_decimal",
                Some(serde_json::json!({ "field": "tvaPercentage" })),
            ),
            AppError::Dpgf(DpgfError::Overflow { element_id, field }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "decimal_overflow",
                Some(serde_json::json!({ "elementId": element_id, "field": field })),
            ),
            AppError::Dpgf(DpgfError::TotalOverflow { field }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "decimal_overflow",
                Some(serde_json::json!({ "field": field })),
            ),
            AppError::InvalidBody(rejection) => (rejection.status(), "invalid_body", None),
        };

        let message = self.to_string();
        tracing::warn!("DPGF request rejected: {}", message);

        let body = DpgfErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
