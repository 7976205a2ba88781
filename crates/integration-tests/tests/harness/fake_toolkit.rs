//! In-process toolkit that writes placeholder artifacts

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use talkinghead_config::PreprocessMode;
use talkinghead_generate::{
    GenerateError, Result,
    toolkit::{AudioBatch, RenderBatch, RenderTarget, SourceCoefficients, StageContext, Toolkit},
};

/// Bytes written as the rendered video
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake video";

/// How the fake toolkit behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Every stage succeeds
    Succeed,
    /// Extraction finds no face
    NoFace,
    /// Rendering fails
    RenderFails,
}

pub struct FakeToolkit {
    behavior: Behavior,
    render_delay: Duration,
    extract_calls: AtomicU32,
    predict_calls: AtomicU32,
    render_calls: AtomicU32,
    rendering: AtomicU32,
    max_rendering: AtomicU32,
}

impl FakeToolkit {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            render_delay: Duration::ZERO,
            extract_calls: AtomicU32::new(0),
            predict_calls: AtomicU32::new(0),
            render_calls: AtomicU32::new(0),
            rendering: AtomicU32::new(0),
            max_rendering: AtomicU32::new(0),
        }
    }

    /// Hold every render for `delay`
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn extract_calls(&self) -> u32 {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> u32 {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> u32 {
        self.render_calls.load(Ordering::SeqCst)
    }

    /// Most renders observed running at the same time
    pub fn max_concurrent_renders(&self) -> u32 {
        self.max_rendering.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Toolkit for FakeToolkit {
    async fn extract(
        &self,
        _ctx: &StageContext,
        image: &Path,
        save_dir: &Path,
        _preprocess: PreprocessMode,
        _source_image: bool,
    ) -> Result<Option<SourceCoefficients>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        assert!(image.is_file(), "image was downloaded before extraction");

        if self.behavior == Behavior::NoFace {
            return Ok(None);
        }

        let coeff_path = save_dir.join("first_frame_dir/image.mat");
        tokio::fs::create_dir_all(save_dir.join("first_frame_dir")).await?;
        tokio::fs::write(&coeff_path, b"coeff").await?;

        Ok(Some(SourceCoefficients {
            coeff_path,
            crop_pic_path: save_dir.join("first_frame_dir/image.png"),
            crop_info: serde_json::json!([[256, 256], [0, 0, 256, 256]]),
        }))
    }

    async fn predict(
        &self,
        _ctx: &StageContext,
        batch: AudioBatch,
        save_dir: &Path,
        _pose_style: u32,
        _ref_pose: Option<&Path>,
    ) -> Result<PathBuf> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        assert!(batch.audio_path.is_file(), "audio was downloaded before prediction");

        let path = save_dir.join("image##audio.mat");
        tokio::fs::write(&path, b"predicted").await?;
        Ok(path)
    }

    async fn render(
        &self,
        _ctx: &StageContext,
        _batch: RenderBatch,
        save_dir: &Path,
        _target: RenderTarget<'_>,
    ) -> Result<PathBuf> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.rendering.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_rendering.fetch_max(running, Ordering::SeqCst);

        tokio::time::sleep(self.render_delay).await;
        self.rendering.fetch_sub(1, Ordering::SeqCst);

        if self.behavior == Behavior::RenderFails {
            return Err(GenerateError::Toolkit("renderer ran out of memory".to_owned()));
        }

        let path = save_dir.join("image##audio.mp4");
        tokio::fs::write(&path, VIDEO_BYTES).await?;
        Ok(path)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
