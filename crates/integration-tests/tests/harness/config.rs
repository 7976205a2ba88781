//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path};

use talkinghead_config::{Config, DeviceSelection};

/// Public base URL handed out by test servers
pub const PUBLIC_BASE_URL: &str = "http://talkinghead.test";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder writing results under `root`
    pub fn new(root: &Path) -> Self {
        let mut config = Config::default();
        config.server.listen_address = SocketAddr::from(([127, 0, 0, 1], 0));
        config.server.public_base_url = PUBLIC_BASE_URL.parse().expect("valid URL");
        config.storage.root = root.to_path_buf();
        config.storage.download_timeout = Some("5s".to_owned());
        config.pipeline.device = DeviceSelection::Cpu;

        Self { config }
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Cap the number of generations running at once
    pub fn with_max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.config.pipeline.max_concurrent_jobs = Some(jobs);
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
