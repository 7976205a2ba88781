use std::{sync::Arc, time::Instant};

use talkinghead_config::Config;
use talkinghead_telemetry::metrics::GenerationMetrics;

use crate::{
    error::{GenerateError, Result},
    fetch::Fetcher,
    pipeline::Pipeline,
    publish::{Publisher, VideoFile},
    session::SessionDirs,
    toolkit::{ScriptToolkit, Toolkit},
    types::{GenerateRequest, GenerateResponse},
};

/// File names the downloads are stored under inside a session directory
const IMAGE_FILE: &str = "image.png";
const AUDIO_FILE: &str = "audio.wav";

/// Generation service shared by every request
pub struct Server {
    fetcher: Fetcher,
    sessions: SessionDirs,
    pipeline: Pipeline,
    publisher: Publisher,
    metrics: GenerationMetrics,
}

impl Server {
    /// Handle one generation request end to end
    ///
    /// Nothing is cleaned up on failure; the session directory keeps
    /// whatever was written before the error.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let start = Instant::now();
        let result = self.run(request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(GenerateError::Download(_)) => "download_error",
            Err(GenerateError::Extraction) => "extraction_error",
            Err(_) => "internal_error",
        };
        self.metrics.record_generation(start, outcome);

        result
    }

    async fn run(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let session = self.sessions.create().await?;
        tracing::info!(session = %session.id(), "generation started");

        let image = self
            .fetcher
            .download(&request.image_link, &session.dir().join(IMAGE_FILE))
            .await?;
        let audio = self
            .fetcher
            .download(&request.audio_link, &session.dir().join(AUDIO_FILE))
            .await?;

        let rendered = self.pipeline.run(&session, &image, &audio).await?;
        let video_url = self.publisher.publish(&session, &rendered).await?;

        Ok(GenerateResponse { video_url })
    }

    /// Look up a published video by file name
    pub async fn open_video(&self, filename: &str) -> Result<VideoFile> {
        self.publisher.open(filename).await
    }
}

/// Builder for constructing the generation server from configuration
pub struct GenerateServerBuilder<'a> {
    config: &'a Config,
    toolkit: Option<Arc<dyn Toolkit>>,
}

impl<'a> GenerateServerBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config, toolkit: None }
    }

    /// Use `toolkit` instead of the configured script toolkit
    #[must_use]
    pub fn with_toolkit(mut self, toolkit: Arc<dyn Toolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    pub fn build(self) -> anyhow::Result<Server> {
        let storage = &self.config.storage;

        std::fs::create_dir_all(&storage.root).map_err(|e| {
            anyhow::anyhow!("failed to create result root {}: {e}", storage.root.display())
        })?;

        let fetcher = Fetcher::new(storage.download_timeout()?, storage.connect_timeout()?)?;

        let toolkit = self
            .toolkit
            .unwrap_or_else(|| Arc::new(ScriptToolkit::new(&self.config.pipeline.toolkit)));

        tracing::debug!(
            toolkit = toolkit.name(),
            root = %storage.root.display(),
            "generation server initialized"
        );

        Ok(Server {
            fetcher,
            sessions: SessionDirs::new(&storage.root),
            pipeline: Pipeline::new(self.config.pipeline.clone(), toolkit),
            publisher: Publisher::new(&storage.root, self.config.server.public_base_url.clone()),
            metrics: GenerationMetrics::new(),
        })
    }
}
