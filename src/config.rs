use crate::error::{PipelineError, Result};

const DEFAULT_IDEOGRAM_BASE: &str = "https://api.ideogram.ai";
const DEFAULT_FREEPIK_BASE: &str = "https://api.freepik.com";

/// Process-wide settings, read once at start and shared by reference.
///
/// Required values are kept optional here and checked where they are used,
/// so a missing bucket only fails the invocations that reach an upload.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub freepik_api_key: Option<String>,
    pub bucket_name: Option<String>,
    pub folder_name: Option<String>,
    pub bucket_region: Option<String>,
    /// S3-compatible endpoint override; uploads switch to path-style addressing.
    pub s3_endpoint: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub ideogram_base: String,
    pub freepik_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_blank("API_KEY"),
            freepik_api_key: non_blank("FREEPIK_API_KEY"),
            bucket_name: non_blank("BUCKET_NAME"),
            folder_name: non_blank("FOLDER_NAME"),
            bucket_region: non_blank("BUCKET_REGION"),
            s3_endpoint: non_blank("S3_ENDPOINT"),
            aws_access_key_id: non_blank("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: non_blank("AWS_SECRET_ACCESS_KEY"),
            ideogram_base: non_blank("IDEOGRAM_API_BASE").unwrap_or_else(|| DEFAULT_IDEOGRAM_BASE.to_string()),
            freepik_base: non_blank("FREEPIK_API_BASE").unwrap_or_else(|| DEFAULT_FREEPIK_BASE.to_string()),
        }
    }

    pub fn api_key(&self) -> Result<&str> { required(&self.api_key, "API_KEY") }
    pub fn freepik_api_key(&self) -> Result<&str> { required(&self.freepik_api_key, "FREEPIK_API_KEY") }
    pub fn bucket_name(&self) -> Result<&str> { required(&self.bucket_name, "BUCKET_NAME") }
    pub fn folder_name(&self) -> Result<&str> { required(&self.folder_name, "FOLDER_NAME") }
    pub fn bucket_region(&self) -> Result<&str> { required(&self.bucket_region, "BUCKET_REGION") }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value.as_deref().ok_or(PipelineError::Config(name))
}
