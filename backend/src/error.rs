use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::{error::ValidationError, req::ApiResponse};
use log::{error, warn};
use thiserror::Error;

use crate::assistant::AssistantError;

/// Failure of one request. Rendered as `{ message, success: false, error }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("unknown bin `{0}`")]
    UnknownBin(String),

    #[error("No data found")]
    NoData,

    #[error("database is unavailable")]
    Poisoned,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

impl ApiError {
    fn message(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => "Invalid request",
            ApiError::UnknownBin(_) | ApiError::NoData => "No data found",
            ApiError::Poisoned | ApiError::Storage(_) => "Failed to access bin data",
            ApiError::Assistant(_) => "Error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownBin(_) | ApiError::NoData => StatusCode::NOT_FOUND,
            ApiError::Poisoned | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Assistant(e) => match e {
                AssistantError::EmptyQuestion | AssistantError::Encode(_) => StatusCode::BAD_REQUEST,
                AssistantError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}: {self:#}", self.message());
        } else {
            warn!("{}: {self}", self.message());
        }
        HttpResponse::build(status).json(ApiResponse::<()>::failed(self.message(), self.to_string()))
    }
}
