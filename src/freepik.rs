use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{config::Config, error::Result, pipeline::BackgroundRemover};

const REMOVE_BACKGROUND_PATH: &str = "/v1/ai/beta/remove-background";

pub struct FreepikClient {
    client: Client,
    config: Arc<Config>,
}

impl FreepikClient {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl BackgroundRemover for FreepikClient {
    async fn remove_background(&self, image_url: &str) -> Result<String> {
        let api_key = self.config.freepik_api_key()?;
        let url = format!("{}{}", self.config.freepik_base, REMOVE_BACKGROUND_PATH);
        info!("✂️ Requesting background removal for {}", image_url);

        let response = self.client
            .post(&url)
            .header("x-freepik-api-key", api_key)
            .form(&[("image_url", image_url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("⚠️ Freepik answered with non-success status {}", status);
        }

        let body = response.text().await?;
        debug!("Freepik response: {}", body);
        Ok(body)
    }
}
