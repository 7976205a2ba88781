use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Generation pipeline profile
///
/// The defaults are the fixed profile the service has always run with:
/// full-frame preprocessing at 256px, still mode, no enhancers, render batch
/// size 2, neutral expression scale and pose style 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the model checkpoints
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Directory holding the toolkit's model config files
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Face render resolution (256 or 512)
    #[serde(default = "default_size")]
    pub size: u32,
    /// Use the legacy checkpoint layout
    #[serde(default)]
    pub old_version: bool,
    #[serde(default)]
    pub preprocess: PreprocessMode,
    /// Keep the head still, only animate the face
    #[serde(default = "default_still")]
    pub still: bool,
    /// Face enhancer name, none by default
    #[serde(default)]
    pub enhancer: Option<String>,
    /// Background enhancer name, none by default
    #[serde(default)]
    pub background_enhancer: Option<String>,
    /// Frames per render batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_expression_scale")]
    pub expression_scale: f64,
    #[serde(default)]
    pub pose_style: u32,
    #[serde(default)]
    pub device: DeviceSelection,
    /// Upper bound on requests inside the stage sequence at once; unbounded when unset
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            config_dir: default_config_dir(),
            size: default_size(),
            old_version: false,
            preprocess: PreprocessMode::default(),
            still: default_still(),
            enhancer: None,
            background_enhancer: None,
            batch_size: default_batch_size(),
            expression_scale: default_expression_scale(),
            pose_style: 0,
            device: DeviceSelection::default(),
            max_concurrent_jobs: None,
            toolkit: ToolkitConfig::default(),
        }
    }
}

/// How the source image is cropped before coefficient extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessMode {
    Crop,
    Extcrop,
    Resize,
    #[default]
    Full,
    Extfull,
}

impl PreprocessMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Extcrop => "extcrop",
            Self::Resize => "resize",
            Self::Full => "full",
            Self::Extfull => "extfull",
        }
    }
}

impl fmt::Display for PreprocessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute device policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSelection {
    /// GPU when one is present, otherwise CPU
    #[default]
    Auto,
    Cuda,
    Cpu,
}

/// How the external toolkit is launched for each heavyweight stage
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Interpreter or executable to run
    #[serde(default = "default_program")]
    pub program: String,
    /// Stage entry script passed as the first argument
    #[serde(default = "default_script")]
    pub script: PathBuf,
    /// Working directory for stage processes; inherits the server's when unset
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: default_script(),
            working_dir: None,
        }
    }
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./checkpoints")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("./src/config")
}

#[allow(clippy::missing_const_for_fn)]
fn default_size() -> u32 {
    256
}

#[allow(clippy::missing_const_for_fn)]
fn default_still() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_batch_size() -> u32 {
    2
}

#[allow(clippy::missing_const_for_fn)]
fn default_expression_scale() -> f64 {
    1.0
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_script() -> PathBuf {
    PathBuf::from("scripts/inference_stage.py")
}
