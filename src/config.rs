use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::image_processor::ImageFormat;
use crate::messages::Locale;
use crate::security::InputValidator;

pub const DEFAULT_ENDPOINT: &str = "https://oss-cn-hangzhou.aliyuncs.com";
pub const DEFAULT_DEST_PATH: &str = "comfyui/{timestamp}.png";
pub const DEFAULT_QUALITY: u8 = 95;

const CONFIG_DIR_NAME: &str = "oss-image-uploader";

/// Everything one upload call needs, with the node's defaults filled in
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub endpoint: String,
    pub bucket_name: String,
    pub dest_path: String,
    pub image_format: ImageFormat,
    pub jpeg_quality: u8,
    pub output_image: bool,
    pub locale: Locale,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bucket_name: String::new(),
            dest_path: DEFAULT_DEST_PATH.to_string(),
            image_format: ImageFormat::Png,
            jpeg_quality: DEFAULT_QUALITY,
            output_image: true,
            locale: Locale::ZhCn,
        }
    }
}

// Keep the secret out of logs
impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("dest_path", &self.dest_path)
            .field("image_format", &self.image_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("output_image", &self.output_image)
            .field("locale", &self.locale)
            .finish()
    }
}

impl UploadConfig {
    /// Quality forced into the 1-100 range the encoders accept
    pub fn effective_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(CONFIG_DIR_NAME);

    Ok(config_dir.join("config.json"))
}

/// Load the config from `path`, or the default location when `None`.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> AppResult<UploadConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if !config_path.exists() {
        log::debug!(
            "No config file at {}, using defaults",
            config_path.display()
        );
        return Ok(UploadConfig::default());
    }

    let config_str = fs::read_to_string(&config_path)?;
    let config: UploadConfig = serde_json::from_str(&config_str)?;

    validate_config(&config)?;

    log::info!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

pub fn save_config(config: &UploadConfig, path: Option<&Path>) -> AppResult<()> {
    validate_config(config)?;

    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(&config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &UploadConfig) -> AppResult<()> {
    InputValidator::validate_quality(config.jpeg_quality)?;
    InputValidator::validate_endpoint(&config.endpoint)?;
    Ok(())
}
