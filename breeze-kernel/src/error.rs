use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the kernel core and its HTTP adapter.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Malformed request body or query parameter.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// A domain log exists but could not be read.
    #[error("Storage read failed: {0}")]
    StorageRead(#[source] std::io::Error),

    /// Appending to a domain log failed. Logged by the ingestion path, never
    /// returned to a client.
    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type KernelResult<T> = Result<T, KernelError>;

impl IntoResponse for KernelError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            KernelError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
