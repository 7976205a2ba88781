use std::fmt;

use serde::{Deserialize, Serialize};
use talkinghead_config::DeviceSelection;

/// Compute device handed to the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    /// Resolve the configured policy to a concrete device
    pub fn select(policy: DeviceSelection) -> Self {
        match policy {
            DeviceSelection::Cuda => Self::Cuda,
            DeviceSelection::Cpu => Self::Cpu,
            DeviceSelection::Auto => {
                let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
                if gpu_available(visible.as_deref()) {
                    Self::Cuda
                } else {
                    Self::Cpu
                }
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GPU counts as available when the NVIDIA driver tooling is installed and
/// `CUDA_VISIBLE_DEVICES` does not hide every device
fn gpu_available(visible_devices: Option<&str>) -> bool {
    if let Some(visible) = visible_devices.map(str::trim)
        && (visible.is_empty() || visible == "-1")
    {
        return false;
    }

    which::which("nvidia-smi").is_ok()
}
