use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::info;

use crate::{error::{PipelineError, Result}, pipeline::ImageFetcher};

/// Plain GET downloads with no timeout of their own.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!("GET {} returned {}", url, status)));
        }
        let data = response.bytes().await?;
        info!("⬇️ Downloaded {} bytes from {}", data.len(), url);
        Ok(data)
    }
}
