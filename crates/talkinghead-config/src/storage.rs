use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Local storage for per-request sessions and published videos
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Result root; sessions are created beneath it and videos published into it
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Total time allowed for one image or audio download (e.g. "120s", "2m");
    /// downloads are unbounded when unset
    #[serde(default)]
    pub download_timeout: Option<String>,
    /// Time allowed to establish the connection for a download
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            download_timeout: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl StorageConfig {
    /// Parsed download timeout, `None` when downloads may take as long as they need
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn download_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.download_timeout
            .as_deref()
            .map(|value| parse_duration("storage.download_timeout", value))
            .transpose()
    }

    /// Parsed connect timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn connect_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration("storage.connect_timeout", &self.connect_timeout)
    }
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}

fn default_root() -> PathBuf {
    PathBuf::from("./results")
}

fn default_connect_timeout() -> String {
    "10s".to_string()
}
