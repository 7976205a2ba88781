use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use talkinghead_config::PipelineConfig;
use talkinghead_telemetry::metrics::GenerationMetrics;
use tokio::sync::Semaphore;

use crate::{
    device::Device,
    error::{GenerateError, Result},
    session::Session,
    toolkit::{InitPaths, RenderBatchSpec, RenderTarget, StageContext, Toolkit},
};

/// Drives the toolkit stages for one request at a time
///
/// Stage models are never cached here: each request resolves its init
/// paths and every heavyweight stage builds its models from them afresh.
pub struct Pipeline {
    profile: PipelineConfig,
    toolkit: Arc<dyn Toolkit>,
    permits: Option<Semaphore>,
    metrics: GenerationMetrics,
}

impl Pipeline {
    pub fn new(profile: PipelineConfig, toolkit: Arc<dyn Toolkit>) -> Self {
        let permits = profile.max_concurrent_jobs.map(Semaphore::new);

        Self {
            profile,
            toolkit,
            permits,
            metrics: GenerationMetrics::new(),
        }
    }

    /// Run every stage for the downloaded inputs, returning the rendered video
    ///
    /// Only an empty extraction result is checked; every later stage output
    /// is handed on as is.
    #[tracing::instrument(name = "pipeline", skip_all, fields(session = %session.id(), toolkit = self.toolkit.name()))]
    pub async fn run(&self, session: &Session, image: &Path, audio: &Path) -> Result<PathBuf> {
        let _permit = match self.permits {
            Some(ref permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|e| GenerateError::Toolkit(format!("admission closed: {e}")))?,
            ),
            None => None,
        };

        let profile = &self.profile;
        let save_dir = session.dir();
        let toolkit = &self.toolkit;

        let device = Device::select(profile.device);
        tracing::info!(%device, "starting generation");

        let ctx = StageContext {
            paths: InitPaths::resolve(profile),
            device,
        };

        let started = Instant::now();
        let source = toolkit
            .extract(&ctx, image, save_dir, profile.preprocess, true)
            .await?
            .ok_or_else(|| {
                tracing::warn!("no coefficients extracted from source image");
                GenerateError::Extraction
            })?;
        self.metrics.record_stage("extract", started);
        tracing::debug!(coeff_path = %source.coeff_path.display(), "source coefficients extracted");

        let batch = toolkit.audio_batch(&source.coeff_path, audio, device, None, profile.still)?;

        let started = Instant::now();
        let coeff_path = toolkit
            .predict(&ctx, batch, save_dir, profile.pose_style, None)
            .await?;
        self.metrics.record_stage("predict", started);
        tracing::debug!(coeff_path = %coeff_path.display(), "audio coefficients predicted");

        let render_batch = toolkit.render_batch(RenderBatchSpec {
            coeff_path,
            crop_pic_path: source.crop_pic_path.clone(),
            first_coeff_path: source.coeff_path.clone(),
            audio_path: audio.to_path_buf(),
            batch_size: profile.batch_size,
            ref_eyeblink: None,
            ref_pose: None,
            expression_scale: profile.expression_scale,
            still_mode: profile.still,
            preprocess: profile.preprocess,
            size: profile.size,
        })?;

        let target = RenderTarget {
            pic_path: image,
            crop_info: &source.crop_info,
            enhancer: profile.enhancer.as_deref(),
            background_enhancer: profile.background_enhancer.as_deref(),
            preprocess: profile.preprocess,
            img_size: profile.size,
        };

        let started = Instant::now();
        let video = toolkit.render(&ctx, render_batch, save_dir, target).await?;
        self.metrics.record_stage("render", started);
        tracing::debug!(video = %video.display(), "video rendered");

        Ok(video)
    }
}
