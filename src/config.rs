use crate::error::AppError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_COMPLETION_GRACE_MS: u64 = 500;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001/api/enhance";
pub const DEFAULT_LOCAL_MAX_OUTPUT_PIXELS: u64 = 8192 * 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Remote,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub max_payload_bytes: u64,
    pub backend_timeout_secs: u64,
    pub completion_grace_ms: u64,
    pub progress_buffer_size: usize,
    pub backend_kind: BackendKind,
    pub backend_url: String,
    pub local_scale: u32,
    pub local_max_output_pixels: u64,
    pub log_level: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            completion_grace_ms: DEFAULT_COMPLETION_GRACE_MS,
            progress_buffer_size: 32,
            backend_kind: BackendKind::Remote,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            local_scale: 4,
            local_max_output_pixels: DEFAULT_LOCAL_MAX_OUTPUT_PIXELS,
            log_level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Layers an optional TOML file and `ENHANCER_*` environment variables
    /// over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let configuration: Configuration = builder
            .add_source(Environment::with_prefix("ENHANCER"))
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_payload_bytes == 0 {
            return Err(AppError::InvalidConfig(
                "Max payload size must be greater than 0".to_string(),
            ));
        }

        if self.backend_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "Backend timeout must be greater than 0".to_string(),
            ));
        }

        if self.progress_buffer_size == 0 {
            return Err(AppError::InvalidConfig(
                "Progress buffer size must be greater than 0".to_string(),
            ));
        }

        if self.backend_kind == BackendKind::Remote && self.backend_url.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "Backend URL is required for the remote backend".to_string(),
            ));
        }

        if self.backend_kind == BackendKind::Local && self.local_scale == 0 {
            return Err(AppError::InvalidConfig(
                "Local upscale factor must be greater than 0".to_string(),
            ));
        }

        if self.backend_kind == BackendKind::Local && self.local_max_output_pixels == 0 {
            return Err(AppError::InvalidConfig(
                "Local output pixel budget must be greater than 0".to_string(),
            ));
        }

        self.level()?;
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    pub fn level(&self) -> Result<Level, AppError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| AppError::InvalidConfig(format!("Unknown log level '{}'", self.log_level)))
    }
}
