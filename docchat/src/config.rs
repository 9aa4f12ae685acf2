//! Client configuration.
//!
//! The configuration names the question-answering service and shapes the
//! HTTP client that talks to it. It is stored as JSON under the user's home
//! directory (`~/.docchat/config.json`); a missing file means defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "DOCCHAT_BASE_URL";

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default document upload route.
pub const DEFAULT_UPLOAD_PATH: &str = "/api/documents/upload";

/// Default question route.
pub const DEFAULT_ASK_PATH: &str = "/api/qa/ask";

/// Configuration for the transport gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the question-answering service.
    pub base_url: String,
    /// Route accepting multipart document uploads.
    pub upload_path: String,
    /// Route accepting JSON questions.
    pub ask_path: String,
    /// Request timeout in seconds, enforced by the HTTP client.
    pub timeout_secs: Option<u64>,
    /// User agent string.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            ask_path: DEFAULT_ASK_PATH.to_string(),
            timeout_secs: Some(120),
            user_agent: Some(concat!("docchat/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl ClientConfig {
    /// Create a default configuration pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout. `None` disables it.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Apply overrides from the environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            debug!(base_url = %base_url, "base url overridden from environment");
            self.base_url = base_url;
        }
        self
    }

    /// Check that the configuration can be used to build requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the base URL does not parse, uses
    /// a scheme other than http(s), or a route does not start with `/`.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid(format!("base_url `{}`: {e}", self.base_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(format!(
                "base_url scheme must be http or https, got `{}`",
                url.scheme()
            )));
        }

        for (name, path) in [("upload_path", &self.upload_path), ("ask_path", &self.ask_path)] {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(format!(
                    "{name} must start with '/', got `{path}`"
                )));
            }
        }

        Ok(())
    }

    /// Full URL of the upload route.
    #[must_use]
    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }

    /// Full URL of the question route.
    #[must_use]
    pub fn ask_url(&self) -> String {
        join_url(&self.base_url, &self.ask_path)
    }

    /// Build a reqwest client with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the client cannot be built.
    pub fn build_client(&self) -> ConfigResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder
            .build()
            .map_err(|e| ConfigError::invalid(format!("http client: {e}")))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

// ============================================================================
// Config file helpers
// ============================================================================

/// Directory holding docchat's configuration.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docchat")
}

/// Default configuration file path.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load the configuration from the default path.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_config() -> ConfigResult<ClientConfig> {
    load_config_from(&config_path()).await
}

/// Load the configuration from `path`, falling back to defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_config_from(path: &Path) -> ConfigResult<ClientConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let config: ClientConfig = serde_json::from_str(&content)?;
            debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(ClientConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_config(config: &ClientConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Write a default configuration to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn init_config(path: &Path) -> ConfigResult<ClientConfig> {
    let config = ClientConfig::default();
    save_config(&config, path).await?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, Some(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_urls_join_without_double_slash() {
        let config = ClientConfig::new("http://qa.internal:9000/");
        assert_eq!(
            config.upload_url(),
            "http://qa.internal:9000/api/documents/upload"
        );
        assert_eq!(config.ask_url(), "http://qa.internal:9000/api/qa/ask");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClientConfig::new("not a url").validate().is_err());
        assert!(ClientConfig::new("ftp://example.com").validate().is_err());

        let config = ClientConfig {
            ask_path: "api/qa/ask".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://docs.example.com"}"#).unwrap();
        assert_eq!(config.base_url, "https://docs.example.com");
        assert_eq!(config.upload_path, DEFAULT_UPLOAD_PATH);
        assert_eq!(config.ask_path, DEFAULT_ASK_PATH);
    }

    #[test]
    fn test_build_client() {
        let config = ClientConfig::default().with_timeout_secs(None);
        assert!(config.build_client().is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let missing = load_config_from(&path).await.unwrap();
        assert_eq!(missing, ClientConfig::default());

        let config = ClientConfig::new("https://qa.example.com").with_timeout_secs(Some(30));
        save_config(&config, &path).await.unwrap();

        let loaded = load_config_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        assert!(matches!(
            load_config_from(&path).await,
            Err(ConfigError::Parse(_))
        ));
    }
}
