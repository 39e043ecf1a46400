use crate::config::StationConfig;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, WxError};
use reqwest::Client;
use std::time::Duration;

/// Downloads the regional radar loop and overwrites the local copy.
pub struct RadarFetcher<S: Storage> {
    storage: S,
    client: Client,
    url: String,
    path: String,
    timeout: Duration,
}

impl<S: Storage> RadarFetcher<S> {
    pub fn new(storage: S, config: &StationConfig) -> Self {
        Self {
            storage,
            client: Client::new(),
            url: config.radar.url.clone(),
            path: config.storage.radar_file.clone(),
            timeout: Duration::from_secs(config.radar.timeout_seconds),
        }
    }

    /// Returns the number of bytes written.
    pub async fn fetch(&self) -> Result<usize> {
        tracing::debug!("Downloading radar image from {}", self.url);
        let response = self.client.get(&self.url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WxError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(WxError::processing("radar image response was empty"));
        }
        self.storage.write_file(&self.path, &bytes).await?;
        tracing::info!("Updated radar image ({} bytes)", bytes.len());
        Ok(bytes.len())
    }
}
