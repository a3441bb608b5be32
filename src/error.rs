use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The caller asked for something that is not a table: unknown sheet,
    /// missing source, oversized or non-workbook payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("File processing error: {0}")]
    FileProcessing(String),
    #[error("Export error: {0}")]
    Export(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::SheetNotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Http(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::FileProcessing(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Export(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
