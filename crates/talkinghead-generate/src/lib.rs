//! Talking-head video generation
//!
//! Downloads a face image and a driving audio clip, runs them through the
//! external toolkit stages and publishes the rendered video under the
//! result root.

#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod device;
mod error;
mod fetch;
mod pipeline;
mod publish;
mod server;
mod session;
pub mod toolkit;
mod types;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio_util::io::ReaderStream;
use tracing::Instrument;

pub use device::Device;
pub use error::{GenerateError, Result};
pub use publish::VideoFile;
pub use server::{GenerateServerBuilder, Server};
pub use session::{Session, SessionDirs};
pub use types::{GenerateRequest, GenerateResponse};

use toolkit::Toolkit;

/// Build the generation server from configuration
///
/// # Errors
///
/// Returns an error if the server fails to initialize
pub fn build_server(config: &talkinghead_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = GenerateServerBuilder::new(config)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to initialize generation server: {e}"))?;

    Ok(Arc::new(server))
}

/// Build the generation server around a caller-supplied toolkit
pub fn build_server_with_toolkit(
    config: &talkinghead_config::Config,
    toolkit: Arc<dyn Toolkit>,
) -> anyhow::Result<Arc<Server>> {
    let server = GenerateServerBuilder::new(config)
        .with_toolkit(toolkit)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to initialize generation server: {e}"))?;

    Ok(Arc::new(server))
}

/// Create the endpoint router for generation and video retrieval
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/generate/", post(generate))
        .route("/generate", post(generate))
        .route("/videos/{filename}", get(video))
}

/// Handle generation requests
///
/// The generation runs on its own task, so a client that disconnects or
/// times out does not cancel it; the video is still published.
async fn generate(
    State(server): State<Arc<Server>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    tracing::debug!(image = %request.image_link, audio = %request.audio_link, "generate handler called");

    let task = tokio::spawn(async move { server.generate(&request).await }.in_current_span());

    let response = task
        .await
        .map_err(|e| GenerateError::Task(e.to_string()))??;

    Ok(Json(response))
}

/// Stream a published video
async fn video(State(server): State<Arc<Server>>, Path(filename): Path<String>) -> Result<Response> {
    let VideoFile {
        file,
        len,
        content_type,
    } = server.open_video(&filename).await?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
