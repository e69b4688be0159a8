use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{HttpError, KvKey, ValidatedUrl, MAX_TIMEOUT_MS};
use crate::{
    DEFAULT_CLASSIFY_PATH, DEFAULT_HEALTH_PATH, DEFAULT_STORAGE_KEY, MAX_UPLOAD_BYTES,
    NOTIFICATION_EXIT_MS, NOTIFICATION_VISIBLE_MS, PREVIEW_CHARS,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("path '{path}' for {field} must start with '/'")]
    InvalidPath { field: &'static str, path: String },
    #[error("invalid storage key: {0}")]
    InvalidStorageKey(String),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("request timeout of {ms}ms exceeds the maximum of {max}ms")]
    TimeoutTooLong { ms: u64, max: u64 },
    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Settings the shell hands to the core before startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    pub classify_path: String,
    pub health_path: String,
    pub storage_key: String,
    pub max_upload_bytes: u64,
    pub notification_visible_ms: u64,
    pub notification_exit_ms: u64,
    pub preview_chars: usize,
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            classify_path: DEFAULT_CLASSIFY_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            notification_visible_ms: NOTIFICATION_VISIBLE_MS,
            notification_exit_ms: NOTIFICATION_EXIT_MS,
            preview_chars: PREVIEW_CHARS,
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base_url {
            let url = ValidatedUrl::new(base.as_str())
                .map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?;
            if url.is_origin_relative() {
                return Err(ConfigError::InvalidBaseUrl(format!(
                    "'{base}' is not an absolute http(s) URL"
                )));
            }
        }

        for (field, path) in [
            ("classify_path", &self.classify_path),
            ("health_path", &self.health_path),
        ] {
            if !path.starts_with('/') || path.starts_with("//") {
                return Err(ConfigError::InvalidPath {
                    field,
                    path: path.clone(),
                });
            }
        }

        KvKey::new(self.storage_key.as_str())
            .map_err(|e| ConfigError::InvalidStorageKey(e.to_string()))?;

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Zero {
                field: "max_upload_bytes",
            });
        }
        if self.notification_visible_ms == 0 {
            return Err(ConfigError::Zero {
                field: "notification_visible_ms",
            });
        }
        if self.preview_chars == 0 {
            return Err(ConfigError::Zero {
                field: "preview_chars",
            });
        }
        match self.request_timeout_ms {
            Some(0) => {
                return Err(ConfigError::Zero {
                    field: "request_timeout_ms",
                })
            }
            Some(ms) if ms > MAX_TIMEOUT_MS => {
                return Err(ConfigError::TimeoutTooLong {
                    ms,
                    max: MAX_TIMEOUT_MS,
                })
            }
            _ => {}
        }

        Ok(())
    }

    pub fn classify_url(&self) -> Result<ValidatedUrl, HttpError> {
        ValidatedUrl::join(self.api_base_url.as_deref(), &self.classify_path)
    }

    pub fn health_url(&self) -> Result<ValidatedUrl, HttpError> {
        ValidatedUrl::join(self.api_base_url.as_deref(), &self.health_path)
    }

    pub fn storage_key(&self) -> Result<KvKey, ConfigError> {
        KvKey::new(self.storage_key.as_str())
            .map_err(|e| ConfigError::InvalidStorageKey(e.to_string()))
    }
}
