use crate::models::content::ImageDetail;
use config::{Config, ConfigError, Environment};
use lazy_static::lazy_static;
use serde::Deserialize;

pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful AI assistant. Let's think step by step.";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_system_message")]
    pub default_system_message: String,
    #[serde(default = "default_image_detail")]
    pub default_image_detail: ImageDetail,
    /// Mime type used when an image reference is raw base64 data
    #[serde(default = "default_image_mime_type")]
    pub image_mime_type: String,
    #[serde(default = "default_content_preview_len")]
    pub content_preview_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_system_message: default_system_message(),
            default_image_detail: default_image_detail(),
            image_mime_type: default_image_mime_type(),
            content_preview_len: default_content_preview_len(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("default_system_message", default_system_message())?
            .set_default("default_image_detail", default_image_detail().to_string())?
            .set_default("image_mime_type", default_image_mime_type())?
            .set_default("content_preview_len", default_content_preview_len() as i64)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("LION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, ConfigError> = config.try_deserialize();
        if let Err(err) = &result {
            tracing::debug!("Configuration error: {:?}", err);
        }
        result
    }
}

lazy_static! {
    static ref SETTINGS: Settings = Settings::new().unwrap_or_else(|err| {
        tracing::warn!("Falling back to default settings: {}", err);
        Settings::default()
    });
}

/// Process-wide settings, loaded from the environment on first use.
pub fn settings() -> &'static Settings {
    &SETTINGS
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.to_string()
}

fn default_image_detail() -> ImageDetail {
    ImageDetail::Low
}

fn default_image_mime_type() -> String {
    "image/jpeg".to_string()
}

fn default_content_preview_len() -> usize {
    75
}
