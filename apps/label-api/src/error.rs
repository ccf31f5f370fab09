//! Error types for the label API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use label_core::LabelError;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("No data found after applying filters")]
    NoData,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND"),
            ApiError::NoData => (StatusCode::BAD_REQUEST, "NO_DATA"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<LabelError> for ApiError {
    fn from(err: LabelError) -> Self {
        match err {
            LabelError::SourceNotFound(name) => ApiError::NotFound(name),
            LabelError::NoData => ApiError::NoData,
            LabelError::SourceLoad(_)
            | LabelError::InvalidFilter(_)
            | LabelError::MissingColumn(_)
            | LabelError::InvalidLayout(_) => ApiError::InvalidRequest(err.to_string()),
            LabelError::Render(_) | LabelError::OutputWrite(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => ApiError::NotFound(name),
            StoreError::InvalidName(_) => ApiError::InvalidRequest(err.to_string()),
            StoreError::Io(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<label_sheet::SheetError> for ApiError {
    fn from(err: label_sheet::SheetError) -> Self {
        LabelError::from(err).into()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {}", err))
    }
}
