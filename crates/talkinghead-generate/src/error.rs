use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Generation service errors with their HTTP classification
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Fetching the image or audio failed (network error or non-2xx status)
    #[error("Error downloading file: {0}")]
    Download(String),

    /// The coefficient stage found nothing usable in the source image
    #[error("Error extracting coefficients from the image")]
    Extraction,

    /// Requested video does not exist under the result root
    #[error("File not found")]
    NotFound,

    /// A toolkit stage failed after extraction
    #[error("Toolkit stage failed: {0}")]
    Toolkit(String),

    /// Filesystem failure while preparing or publishing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background generation task panicked or was aborted
    #[error("Generation task failed: {0}")]
    Task(String),
}

impl GenerateError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Download(_) | Self::Extraction => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Toolkit(_) | Self::Io(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::Toolkit(_) | Self::Io(_) | Self::Task(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            detail: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}
