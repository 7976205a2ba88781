use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Load configuration from `path`, falling back to defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from raw TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server()?;
        self.validate_storage()?;
        self.validate_pipeline()?;
        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        let scheme = self.server.public_base_url.scheme();
        if scheme != "http" && scheme != "https" {
            anyhow::bail!("server.public_base_url must be an http(s) URL, got scheme '{scheme}'");
        }

        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_storage(&self) -> anyhow::Result<()> {
        if self.storage.root.as_os_str().is_empty() {
            anyhow::bail!("storage.root must not be empty");
        }

        self.storage.download_timeout()?;
        self.storage.connect_timeout()?;

        Ok(())
    }

    fn validate_pipeline(&self) -> anyhow::Result<()> {
        let pipeline = &self.pipeline;

        if pipeline.size != 256 && pipeline.size != 512 {
            anyhow::bail!("pipeline.size must be 256 or 512, got {}", pipeline.size);
        }

        if pipeline.batch_size == 0 {
            anyhow::bail!("pipeline.batch_size must be greater than 0");
        }

        if !(pipeline.expression_scale.is_finite() && pipeline.expression_scale > 0.0) {
            anyhow::bail!("pipeline.expression_scale must be a positive number");
        }

        if pipeline.max_concurrent_jobs == Some(0) {
            anyhow::bail!("pipeline.max_concurrent_jobs must be greater than 0 when set");
        }

        if pipeline.toolkit.program.trim().is_empty() {
            anyhow::bail!("pipeline.toolkit.program must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, path::PathBuf, time::Duration};

    use crate::{AnyOrList, Config, DeviceSelection, PreprocessMode};

    #[test]
    fn empty_file_yields_fixed_profile() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.server.listen_address, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(config.server.public_base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.storage.root, PathBuf::from("./results"));
        assert_eq!(config.storage.download_timeout().unwrap(), None);
        assert_eq!(config.storage.connect_timeout().unwrap(), Duration::from_secs(10));

        let pipeline = &config.pipeline;
        assert_eq!(pipeline.checkpoint_dir, PathBuf::from("./checkpoints"));
        assert_eq!(pipeline.config_dir, PathBuf::from("./src/config"));
        assert_eq!(pipeline.size, 256);
        assert!(!pipeline.old_version);
        assert_eq!(pipeline.preprocess, PreprocessMode::Full);
        assert!(pipeline.still);
        assert!(pipeline.enhancer.is_none());
        assert!(pipeline.background_enhancer.is_none());
        assert_eq!(pipeline.batch_size, 2);
        assert!((pipeline.expression_scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(pipeline.pose_style, 0);
        assert_eq!(pipeline.device, DeviceSelection::Auto);
        assert!(pipeline.max_concurrent_jobs.is_none());
        assert_eq!(pipeline.toolkit.program, "python3");
        assert_eq!(pipeline.toolkit.script, PathBuf::from("scripts/inference_stage.py"));
    }

    #[test]
    fn parses_full_document() {
        let raw = r#"
            [server]
            listen_address = "127.0.0.1:9100"
            public_base_url = "https://videos.example.com"

            [server.health]
            path = "/healthz"

            [server.cors]
            origins = ["https://app.example.com"]
            headers = "*"
            max_age = 600

            [storage]
            root = "/var/lib/talkinghead"
            download_timeout = "5m"

            [pipeline]
            preprocess = "crop"
            device = "cpu"
            max_concurrent_jobs = 1

            [pipeline.toolkit]
            program = "/opt/venv/bin/python"
            script = "/opt/toolkit/stage.py"
            working_dir = "/opt/toolkit"
        "#;

        let config = Config::from_toml_str(raw).unwrap();

        assert_eq!(config.server.listen_address, SocketAddr::from(([127, 0, 0, 1], 9100)));
        assert_eq!(config.server.health.path, "/healthz");
        let cors = config.server.cors.unwrap();
        assert_eq!(cors.origins, AnyOrList::List(vec!["https://app.example.com".to_string()]));
        assert_eq!(cors.headers, AnyOrList::Any);
        assert_eq!(cors.max_age_duration(), Some(Duration::from_secs(600)));
        assert_eq!(config.storage.download_timeout().unwrap(), Some(Duration::from_secs(300)));
        assert_eq!(config.pipeline.preprocess, PreprocessMode::Crop);
        assert_eq!(config.pipeline.device, DeviceSelection::Cpu);
        assert_eq!(config.pipeline.max_concurrent_jobs, Some(1));
        assert_eq!(config.pipeline.toolkit.working_dir, Some(PathBuf::from("/opt/toolkit")));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml_str("[pipeline]\nresolution = 256\n").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn rejects_unsupported_size() {
        let err = Config::from_toml_str("[pipeline]\nsize = 300\n").unwrap_err();
        assert!(err.to_string().contains("256 or 512"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = Config::from_toml_str("[pipeline]\nbatch_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn rejects_non_positive_expression_scale() {
        let err = Config::from_toml_str("[pipeline]\nexpression_scale = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("expression_scale"));
    }

    #[test]
    fn rejects_zero_concurrency_limit() {
        let err = Config::from_toml_str("[pipeline]\nmax_concurrent_jobs = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_concurrent_jobs"));
    }

    #[test]
    fn downloads_are_unbounded_unless_configured() {
        let config = Config::from_toml_str("[storage]\nroot = \"/tmp/results\"\n").unwrap();
        assert!(config.storage.download_timeout.is_none());
        assert!(config.storage.download_timeout().unwrap().is_none());

        let config = Config::from_toml_str("[storage]\ndownload_timeout = \"90s\"\n").unwrap();
        assert_eq!(config.storage.download_timeout().unwrap(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Config::from_toml_str("[storage]\ndownload_timeout = \"soon\"\n").unwrap_err();
        assert!(err.to_string().contains("storage.download_timeout"));
    }

    #[test]
    fn rejects_non_http_public_url() {
        let err = Config::from_toml_str("[server]\npublic_base_url = \"ftp://example.com\"\n").unwrap_err();
        assert!(err.to_string().contains("public_base_url"));
    }

    #[test]
    fn env_placeholders_feed_values() {
        temp_env::with_var("TH_TEST_ROOT", Some("/tmp/th-results"), || {
            let config = Config::from_toml_str("[storage]\nroot = \"{{ env.TH_TEST_ROOT }}\"\n").unwrap();
            assert_eq!(config.storage.root, PathBuf::from("/tmp/th-results"));
        });
    }

    #[test]
    fn load_reads_file_and_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talkinghead.toml");

        let fallback = Config::load_or_default(&path).unwrap();
        assert_eq!(fallback.pipeline.size, 256);
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[pipeline]\nsize = 512\n").unwrap();
        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.pipeline.size, 512);
    }
}
