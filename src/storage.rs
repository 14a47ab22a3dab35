use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region, RequestChecksumCalculation},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client as S3Client,
};
use bytes::Bytes;
use tracing::info;

use crate::{config::Config, error::{PipelineError, Result}, pipeline::ObjectStore};

pub const PNG_CONTENT_TYPE: &str = "image/png";

pub fn object_key(folder: &str, filename: &str) -> String {
    format!("{folder}/{filename}.png")
}

pub fn public_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

/// S3 target. A client is built for every upload from the configured region.
pub struct S3Store {
    config: Arc<Config>,
}

impl S3Store {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    async fn client(&self, region: &str) -> S3Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let (Some(access_key), Some(secret_key)) = (&self.config.aws_access_key_id, &self.config.aws_secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(access_key, secret_key, None, None, "cutout-gen"));
        }
        if let Some(endpoint) = &self.config.s3_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(self.config.s3_endpoint.is_some())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();
        S3Client::from_conf(s3_config)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_png(&self, filename: &str, data: Bytes) -> Result<String> {
        let bucket = self.config.bucket_name()?;
        let folder = self.config.folder_name()?;
        let region = self.config.bucket_region()?;
        let key = object_key(folder, filename);

        let size = data.len();
        self.client(region)
            .await
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(PNG_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| PipelineError::Storage(format!("failed to upload {}: {}", key, DisplayErrorContext(&e))))?;

        let url = public_url(bucket, &key);
        info!("☁️ Uploaded {} bytes to {}", size, url);
        Ok(url)
    }
}
