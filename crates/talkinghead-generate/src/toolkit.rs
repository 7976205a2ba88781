//! Seam between the orchestrator and the external talking-head toolkit
//!
//! The toolkit owns every model: face cropping and 3DMM coefficient
//! extraction, audio-to-coefficient prediction and face rendering. The
//! orchestrator only threads file paths and opaque batches between stages.

pub(crate) mod script;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use talkinghead_config::{PipelineConfig, PreprocessMode};

use crate::{device::Device, error::Result};

pub use script::ScriptToolkit;

/// Checkpoint and model-config locations the stage models are built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPaths {
    pub checkpoint_dir: PathBuf,
    pub config_dir: PathBuf,
    pub size: u32,
    pub old_version: bool,
    pub preprocess: PreprocessMode,
}

impl InitPaths {
    /// Resolve the init paths for a pipeline profile
    pub fn resolve(profile: &PipelineConfig) -> Self {
        Self {
            checkpoint_dir: profile.checkpoint_dir.clone(),
            config_dir: profile.config_dir.clone(),
            size: profile.size,
            old_version: profile.old_version,
            preprocess: profile.preprocess,
        }
    }
}

/// What every heavyweight stage of one request is given
#[derive(Debug, Clone)]
pub struct StageContext {
    pub paths: InitPaths,
    pub device: Device,
}

/// Output of coefficient extraction for the source image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCoefficients {
    /// 3DMM coefficients of the source face
    pub coeff_path: PathBuf,
    /// Cropped source image the renderer animates
    pub crop_pic_path: PathBuf,
    /// Crop geometry, opaque to the orchestrator
    pub crop_info: serde_json::Value,
}

/// Input batch for audio-to-coefficient prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioBatch {
    pub first_coeff_path: PathBuf,
    pub audio_path: PathBuf,
    pub device: Device,
    pub ref_eyeblink: Option<PathBuf>,
    pub still: bool,
}

/// Everything the render batch is built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderBatchSpec {
    /// Predicted coefficients from the audio stage
    pub coeff_path: PathBuf,
    pub crop_pic_path: PathBuf,
    /// Coefficients of the source image
    pub first_coeff_path: PathBuf,
    pub audio_path: PathBuf,
    pub batch_size: u32,
    pub ref_eyeblink: Option<PathBuf>,
    pub ref_pose: Option<PathBuf>,
    pub expression_scale: f64,
    pub still_mode: bool,
    pub preprocess: PreprocessMode,
    pub size: u32,
}

/// Input batch for the face renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderBatch(pub RenderBatchSpec);

/// Final-stage options that are not part of the render batch
#[derive(Debug, Clone, Serialize)]
pub struct RenderTarget<'a> {
    /// Original, uncropped source image
    pub pic_path: &'a Path,
    pub crop_info: &'a serde_json::Value,
    pub enhancer: Option<&'a str>,
    pub background_enhancer: Option<&'a str>,
    pub preprocess: PreprocessMode,
    pub img_size: u32,
}

/// The external talking-head toolkit
///
/// Heavyweight stages (`extract`, `predict`, `render`) must build their
/// models from `ctx.paths` on every call. No model state is carried between
/// calls or shared between requests.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Crop the image and extract its coefficients
    ///
    /// `Ok(None)` means no usable face was found.
    async fn extract(
        &self,
        ctx: &StageContext,
        image: &Path,
        save_dir: &Path,
        preprocess: PreprocessMode,
        source_image: bool,
    ) -> Result<Option<SourceCoefficients>>;

    /// Build the audio-to-coefficient batch
    fn audio_batch(
        &self,
        first_coeff_path: &Path,
        audio: &Path,
        device: Device,
        ref_eyeblink: Option<&Path>,
        still: bool,
    ) -> Result<AudioBatch> {
        Ok(AudioBatch {
            first_coeff_path: first_coeff_path.to_path_buf(),
            audio_path: audio.to_path_buf(),
            device,
            ref_eyeblink: ref_eyeblink.map(Path::to_path_buf),
            still,
        })
    }

    /// Predict coefficients from audio, returning the coefficient file
    async fn predict(
        &self,
        ctx: &StageContext,
        batch: AudioBatch,
        save_dir: &Path,
        pose_style: u32,
        ref_pose: Option<&Path>,
    ) -> Result<PathBuf>;

    /// Build the face-render batch
    fn render_batch(&self, spec: RenderBatchSpec) -> Result<RenderBatch> {
        Ok(RenderBatch(spec))
    }

    /// Render the video, returning its path
    async fn render(
        &self,
        ctx: &StageContext,
        batch: RenderBatch,
        save_dir: &Path,
        target: RenderTarget<'_>,
    ) -> Result<PathBuf>;

    /// Short name for logs
    fn name(&self) -> &str;
}
