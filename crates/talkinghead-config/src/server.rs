use std::net::SocketAddr;

use serde::Deserialize;
use url::Url;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// Base of the links handed back in `video_url`
    #[serde(default = "default_public_base_url")]
    pub public_base_url: Url,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            public_base_url: default_public_base_url(),
            health: HealthConfig::default(),
            cors: None,
        }
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_public_base_url() -> Url {
    Url::parse("http://localhost:8000").expect("static URL is valid")
}
