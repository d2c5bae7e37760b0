//! Error types for the nutrimatic service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the nutrimatic service
#[derive(Debug, thiserror::Error)]
pub enum NutrimaticError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Usage limit reached: {0}")]
    UsageLimit(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),
}

impl NutrimaticError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NutrimaticError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            NutrimaticError::Auth(_) => StatusCode::UNAUTHORIZED,
            NutrimaticError::UsageLimit(_) => StatusCode::FORBIDDEN,
            NutrimaticError::NotFound(_) => StatusCode::NOT_FOUND,
            NutrimaticError::Validation(_) => StatusCode::BAD_REQUEST,
            NutrimaticError::Conflict(_) => StatusCode::CONFLICT,
            NutrimaticError::Http(_)
            | NutrimaticError::Backend(_)
            | NutrimaticError::Webhook(_) => StatusCode::BAD_GATEWAY,
            NutrimaticError::Io(_) | NutrimaticError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NutrimaticError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self);
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for nutrimatic operations
pub type Result<T> = std::result::Result<T, NutrimaticError>;
