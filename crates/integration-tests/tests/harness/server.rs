//! Test server wrapper that starts the service on a random port

use std::{net::SocketAddr, sync::Arc};

use talkinghead_config::Config;
use talkinghead_generate::toolkit::Toolkit;
use talkinghead_server::Server;
use tokio_util::sync::CancellationToken;

use super::config::PUBLIC_BASE_URL;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration and toolkit
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config, toolkit: Arc<dyn Toolkit>) -> anyhow::Result<Self> {
        let server = Server::with_toolkit(&config, toolkit)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Rewrite a returned `video_url` to point at this server
    pub fn resolve(&self, video_url: &str) -> String {
        let path = video_url
            .strip_prefix(PUBLIC_BASE_URL)
            .unwrap_or_else(|| panic!("{video_url} is not under {PUBLIC_BASE_URL}"));
        self.url(path)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Post a generation request
    pub async fn generate(&self, image_link: &str, audio_link: &str) -> reqwest::Response {
        let body = serde_json::json!({
            "image_link": image_link,
            "audio_link": audio_link,
        });

        self.client
            .post(self.url("/generate/"))
            .json(&body)
            .send()
            .await
            .expect("request reaches server")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
