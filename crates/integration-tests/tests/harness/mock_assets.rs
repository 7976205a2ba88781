//! Mock asset host serving the image and audio inputs

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use axum::{Router, extract::State, http::StatusCode, routing};
use tokio_util::sync::CancellationToken;

/// Bytes served at `/face.png`
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a face";
/// Bytes served at `/speech.wav`
pub const AUDIO_BYTES: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt not really speech";

/// Mock asset host with one image, one audio clip and a missing path
pub struct MockAssets {
    addr: SocketAddr,
    shutdown: CancellationToken,
    requests: Arc<AtomicU32>,
}

impl MockAssets {
    /// Start the mock host, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        let requests = Arc::new(AtomicU32::new(0));

        let app = Router::new()
            .route("/face.png", routing::get(|State(n): State<Arc<AtomicU32>>| async move {
                n.fetch_add(1, Ordering::Relaxed);
                IMAGE_BYTES
            }))
            .route("/speech.wav", routing::get(|State(n): State<Arc<AtomicU32>>| async move {
                n.fetch_add(1, Ordering::Relaxed);
                AUDIO_BYTES
            }))
            .route("/missing", routing::get(|State(n): State<Arc<AtomicU32>>| async move {
                n.fetch_add(1, Ordering::Relaxed);
                StatusCode::NOT_FOUND
            }))
            .with_state(Arc::clone(&requests));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            requests,
        })
    }

    pub fn image_url(&self) -> String {
        format!("http://{}/face.png", self.addr)
    }

    pub fn audio_url(&self) -> String {
        format!("http://{}/speech.wav", self.addr)
    }

    /// URL that answers 404
    pub fn missing_url(&self) -> String {
        format!("http://{}/missing", self.addr)
    }

    /// Number of requests received
    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Drop for MockAssets {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
