use std::path::Path;

use reqwest::Url;

use crate::config::schema::{ClientConfig, DEFAULT_APPROVER, DEFAULT_BASE_URL};
use crate::error::ConfigError;

/// Environment variable selecting the job service origin.
pub const ENV_API_BASE: &str = "DOCFLOW_API_BASE";
/// Environment variable overriding the default approver name.
pub const ENV_APPROVER: &str = "DOCFLOW_APPROVER";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_json::from_str(content)?;
    validate_config(config)
}

impl ClientConfig {
    /// Builds the configuration from the process environment.
    ///
    /// Empty values are treated as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = non_empty_var(ENV_API_BASE).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let default_approver =
            non_empty_var(ENV_APPROVER).unwrap_or_else(|| DEFAULT_APPROVER.to_string());

        validate_config(ClientConfig {
            base_url,
            default_approver,
            ..ClientConfig::default()
        })
    }

    /// Validates and normalizes a hand-built configuration.
    pub fn validated(self) -> Result<Self, ConfigError> {
        validate_config(self)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_config(mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    config.base_url = normalize_base_url(&config.base_url)?;

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "connect_timeout_secs must be greater than zero".to_string(),
        });
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "request_timeout_secs must be greater than zero".to_string(),
        });
    }
    if config.upload_timeout_secs == Some(0) {
        return Err(ConfigError::Validation {
            message: "upload_timeout_secs must be greater than zero when set".to_string(),
        });
    }
    if config.default_approver.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "default_approver must not be empty".to_string(),
        });
    }

    Ok(config)
}

/// Parses the base URL and strips trailing slashes so paths can be appended.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: "query strings and fragments are not allowed".to_string(),
        });
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
