//! Generation → download → store → background removal → download → store.
//!
//! Every step runs to completion before the next one starts, and the first
//! failure ends the invocation. Objects uploaded before a failure are left
//! in place.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::{PipelineError, Result},
    models::{BackgroundRemovalResult, GeneratedImage, GenerationRequest, GenerationResult, ImageUrls},
};

/// Submits a request to the image-generation endpoint and returns the raw body.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Submits a public image URL for background removal and returns the raw body.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image_url: &str) -> Result<String>;
}

/// Stores PNG bytes under the key derived from `filename` and returns the public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_png(&self, filename: &str, data: Bytes) -> Result<String>;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DecodeBody,
    ParseBody,
    Generate,
    ParseGeneration,
    DownloadGenerated,
    UploadGenerated,
    RemoveBackground,
    ParseRemoval,
    DownloadProcessed,
    UploadProcessed,
    AssembleResponse,
}

impl Stage {
    pub fn status(self) -> StatusCode {
        match self {
            Stage::DecodeBody | Stage::ParseBody => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Stage::DecodeBody => "Bad Request: invalid base64",
            Stage::ParseBody => "Bad Request",
            Stage::Generate | Stage::ParseGeneration | Stage::ParseRemoval => "Internal Server Error",
            Stage::DownloadGenerated | Stage::DownloadProcessed => "Error downloading image",
            Stage::UploadGenerated | Stage::UploadProcessed => "Error uploading image to S3",
            Stage::RemoveBackground => "Error removing image background",
            Stage::AssembleResponse => "Error marshaling response",
        }
    }
}

/// A pipeline error tagged with the step that produced it.
#[derive(Debug, Error)]
#[error("{stage:?} failed: {error}")]
pub struct Failure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl Failure {
    pub fn status(&self) -> StatusCode {
        self.stage.status()
    }

    /// Caller-facing text. Only missing configuration is named; everything
    /// else gets the fixed message of the failing step.
    pub fn public_message(&self) -> String {
        match &self.error {
            PipelineError::Config(name) => format!("Configuration error: {} is not set", name),
            _ => self.stage.message().to_string(),
        }
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, Failure>;
}

impl<T, E: Into<PipelineError>> AtStage<T> for std::result::Result<T, E> {
    fn at(self, stage: Stage) -> std::result::Result<T, Failure> {
        self.map_err(|e| Failure { stage, error: e.into() })
    }
}

#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn Generator>,
    remover: Arc<dyn BackgroundRemover>,
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        remover: Arc<dyn BackgroundRemover>,
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self { generator, remover, store, fetcher }
    }

    /// Runs one invocation from raw body to serialized `{"image_urls": [...]}`.
    pub async fn handle(&self, body: &[u8], is_base64_encoded: bool) -> std::result::Result<String, Failure> {
        let request = GenerationRequest::from_body(body, is_base64_encoded).map_err(|error| {
            let stage = match &error {
                PipelineError::Decode(_) => Stage::DecodeBody,
                _ => Stage::ParseBody,
            };
            Failure { stage, error }
        })?;
        info!("📝 Decoded request for '{}' ({} chars of prompt)", request.filename, request.prompt.len());

        let image_urls = self.run(&request).await?;
        serde_json::to_string(&ImageUrls { image_urls }).at(Stage::AssembleResponse)
    }

    pub async fn run(&self, request: &GenerationRequest) -> std::result::Result<Vec<String>, Failure> {
        let raw = self.generator.generate(request).await.at(Stage::Generate)?;
        let generated: GenerationResult = serde_json::from_str(&raw).at(Stage::ParseGeneration)?;
        info!("🖼️ Ideogram returned {} image(s), created {}", generated.data.len(), generated.created);
        if generated.data.is_empty() {
            warn!("⚠️ Generation response carried no images");
        }

        let mut urls = Vec::with_capacity(generated.data.len());
        for (index, image) in generated.data.iter().enumerate() {
            urls.push(self.process_image(request, index, image).await?);
        }
        Ok(urls)
    }

    async fn process_image(
        &self,
        request: &GenerationRequest,
        index: usize,
        image: &GeneratedImage,
    ) -> std::result::Result<String, Failure> {
        info!("🎯 [{}] Image URL from Ideogram: {}", index, image.url);
        debug!(
            seed = image.seed,
            safe = image.is_image_safe,
            resolution = %image.resolution,
            style = %image.style_type,
            "[{}] prompt echo: {}", index, image.prompt
        );
        let original = self.fetcher.fetch(&image.url).await.at(Stage::DownloadGenerated)?;
        let stored_url = self.store.put_png(&request.filename, original).await.at(Stage::UploadGenerated)?;
        info!("✅ [{}] Generated image stored at {}", index, stored_url);

        let raw = self.remover.remove_background(&stored_url).await.at(Stage::RemoveBackground)?;
        let removal: BackgroundRemovalResult = serde_json::from_str(&raw).at(Stage::ParseRemoval)?;
        let (field, processed_url) = removal.image_url().ok_or_else(|| Failure {
            stage: Stage::ParseRemoval,
            error: PipelineError::Parse("background removal response has no image URL".into()),
        })?;
        info!("✂️ [{}] Background removed, using '{}': {}", index, field, processed_url);

        let processed = self.fetcher.fetch(processed_url).await.at(Stage::DownloadProcessed)?;
        // Same key as the original upload, so this replaces it.
        let final_url = self.store.put_png(&request.filename, processed).await.at(Stage::UploadProcessed)?;
        info!("✅ [{}] Cutout stored at {}", index, final_url);
        Ok(final_url)
    }
}
