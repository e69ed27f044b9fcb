//! Library error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KitError>;

#[derive(Error, Debug)]
pub enum KitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("timeout while waiting for {0}")]
    WaitTimeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for KitError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            KitError::Config(msg) => (StatusCode::BAD_REQUEST, msg),
            KitError::InvalidUrl(msg) => (StatusCode::BAD_REQUEST, format!("Invalid URL: {}", msg)),
            KitError::HttpClient(msg) => {
                tracing::error!("HTTP client error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "HTTP client error".to_string())
            }
            KitError::WaitTimeout(target) => {
                tracing::error!("Timed out waiting for {}", target);
                (StatusCode::INTERNAL_SERVER_ERROR, "Dependency unavailable".to_string())
            }
            KitError::IoError(err) => {
                tracing::error!("IO error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            KitError::JsonError(err) => {
                tracing::error!("JSON error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            KitError::Other(err) => {
                tracing::error!("Unexpected error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for KitError {
    fn from(err: reqwest::Error) -> Self {
        KitError::HttpClient(err.to_string())
    }
}

impl From<config::ConfigError> for KitError {
    fn from(err: config::ConfigError) -> Self {
        KitError::Config(err.to_string())
    }
}
