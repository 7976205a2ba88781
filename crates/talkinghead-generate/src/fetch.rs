use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::{GenerateError, Result};

/// Streams remote inputs to disk
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build a fetcher; a download only gives up after `timeout` when one is set
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(timeout: Option<Duration>, connect_timeout: Duration) -> anyhow::Result<Self> {
        let mut builder = Client::builder().connect_timeout(connect_timeout).tcp_nodelay(true);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build download client: {e}"))?;

        Ok(Self { client })
    }

    /// Download `url` into `dest`, writing the body chunk by chunk
    ///
    /// Network errors and non-2xx statuses become [`GenerateError::Download`].
    /// A partially written file is left in place on failure.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        tracing::debug!(%url, dest = %dest.display(), "downloading input");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| download_failed(url, &e))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_failed(url, &e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;

        tracing::debug!(%url, bytes = written, "download complete");

        Ok(dest.to_path_buf())
    }
}

fn download_failed(url: &str, error: &reqwest::Error) -> GenerateError {
    tracing::warn!(%url, %error, "download failed");
    GenerateError::Download(error.to_string())
}
