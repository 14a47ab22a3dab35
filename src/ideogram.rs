use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{multipart::Form, Client};
use tracing::{info, warn};

use crate::{config::Config, error::Result, models::GenerationRequest, pipeline::Generator};

const GENERATE_PATH: &str = "/v1/ideogram-v3/generate";
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct IdeogramClient {
    client: Client,
    config: Arc<Config>,
}

impl IdeogramClient {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Multipart fields in the order they are written to the form.
    pub fn form_fields(request: &GenerationRequest) -> Vec<(String, String)> {
        let mut fields = vec![("prompt".to_string(), request.prompt.clone())];

        // Resolution and aspect ratio are mutually exclusive upstream.
        if let Some(resolution) = &request.resolution {
            fields.push(("resolution".into(), resolution.clone()));
        } else if let Some(aspect_ratio) = &request.aspect_ratio {
            fields.push(("aspect_ratio".into(), aspect_ratio.clone()));
        }
        if let Some(num_images) = request.num_images {
            fields.push(("num_images".into(), num_images.to_string()));
        }
        if let Some(style_type) = &request.style_type {
            fields.push(("style_type".into(), style_type.clone()));
        }
        if let Some(palette) = &request.colour_palette {
            for (i, member) in palette.members.iter().enumerate() {
                let prefix = format!("colour_palette[members][{i}]");
                fields.push((format!("{prefix}[color_hex]"), member.color_hex.clone()));
                if let Some(weight) = &member.color_weight {
                    fields.push((format!("{prefix}[color_weight]"), weight.to_string()));
                }
            }
        }
        fields
    }
}

#[async_trait]
impl Generator for IdeogramClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self.config.api_key()?;

        let fields = Self::form_fields(request);
        let form = fields.into_iter().fold(Form::new(), |form, (name, value)| form.text(name, value));

        let url = format!("{}{}", self.config.ideogram_base, GENERATE_PATH);
        info!("🔗 Making request to: {}", url);

        let response = self.client
            .post(&url)
            .header("Api-Key", api_key)
            .multipart(form)
            .timeout(GENERATE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        if !status.is_success() {
            warn!("⚠️ Ideogram answered with non-success status {}", status);
        }

        Ok(response.text().await?)
    }
}
