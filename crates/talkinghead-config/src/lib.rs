#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod telemetry;

use serde::Deserialize;

pub use cors::*;
pub use health::*;
pub use pipeline::*;
pub use server::*;
pub use storage::*;
pub use telemetry::{ExportProtocol, ExporterConfig, TelemetryConfig, TracingConfig};

/// Top-level service configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Where downloads, session directories and published videos live
    #[serde(default)]
    pub storage: StorageConfig,
    /// Generation pipeline profile and toolkit invocation
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
