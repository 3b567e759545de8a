use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tvstream_core::payload::PayloadError;
use tvstream_db::StoreError;

use crate::state::RequestId;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub request_id: String,
}

#[derive(Debug)]
pub enum AppError {
    Validation { field: String, message: String },
    NotFound(String),
    ReferenceConflict(String),
    Internal,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: String,
}

impl AppError {
    pub fn with_request_id(self, request_id: &str) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.to_string(),
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { field, message } => AppError::Validation { field, message },
            StoreError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            StoreError::ReferenceConflict(message) => AppError::ReferenceConflict(message),
            StoreError::Database(err) => {
                tracing::error!(error = %err, "store failure");
                AppError::Internal
            }
        }
    }
}

/// Attaches the request id to any error convertible into [`AppError`].
pub trait MapApiErr<T> {
    fn map_api_err(self, request_id: &RequestId) -> ApiResult<T>;
}

impl<T, E> MapApiErr<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn map_api_err(self, request_id: &RequestId) -> ApiResult<T> {
        self.map_err(|err| err.into().with_request_id(&request_id.0))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, field) = match self.error {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                Some(field),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            AppError::ReferenceConflict(msg) => {
                (StatusCode::CONFLICT, "reference_conflict", msg, None)
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Unexpected error".to_string(),
                None,
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody {
                    code: code.to_string(),
                    message,
                    field,
                    request_id: self.request_id,
                },
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
