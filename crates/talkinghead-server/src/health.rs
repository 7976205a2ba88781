use axum::response::IntoResponse;
use http::StatusCode;

/// Liveness probe, answers as soon as the listener is up
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
