mod cors;
mod health;

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use talkinghead_config::Config;
use talkinghead_generate::toolkit::Toolkit;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration, using the configured toolkit
    ///
    /// # Errors
    ///
    /// Returns an error if the generation service fails to initialize
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let generate_state = talkinghead_generate::build_server(config)?;
        Ok(Self::assemble(config, generate_state))
    }

    /// Build the server around a caller-supplied toolkit
    ///
    /// # Errors
    ///
    /// Returns an error if the generation service fails to initialize
    pub fn with_toolkit(config: &Config, toolkit: Arc<dyn Toolkit>) -> anyhow::Result<Self> {
        let generate_state = talkinghead_generate::build_server_with_toolkit(config, toolkit)?;
        Ok(Self::assemble(config, generate_state))
    }

    fn assemble(config: &Config, generate_state: Arc<talkinghead_generate::Server>) -> Self {
        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        app = app.merge(talkinghead_generate::endpoint_router().with_state(generate_state));

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Self {
            router: app,
            listen_address: config.server.listen_address,
        }
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. In-flight
    /// generations are allowed to finish before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
