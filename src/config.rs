//! Service configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! overrides. The binary applies CLI flags last.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

pub const AUDITOR_ENDPOINT_ENV: &str = "AUDITOR_ENDPOINT";
pub const CLASSIFIER_ENDPOINT_ENV: &str = "CLASSIFIER_ENDPOINT";
pub const REPORTS_DIR_ENV: &str = "CLEANING_REPORTS_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} is not a valid http(s) URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("classify_timeout_secs must be at least 1")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Address the HTTP API binds to
    pub listen: SocketAddr,
    /// Directory holding one `.txt` file per report
    pub reports_dir: PathBuf,
    /// Webhook that receives a copy of every written report
    pub auditor_endpoint: Option<String>,
    /// Image classifier URL; without one every classification fails
    pub classifier_endpoint: Option<String>,
    pub classify_timeout_secs: u64,
    /// Replacement for the built-in task catalog
    pub catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            reports_dir: default_reports_dir(),
            auditor_endpoint: None,
            classifier_endpoint: None,
            classify_timeout_secs: 4,
            catalog_path: None,
        }
    }
}

/// `<data dir>/cleaning-audit/reports`, or `./reports` without a data dir.
pub fn default_reports_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("cleaning-audit").join("reports"))
        .unwrap_or_else(|| PathBuf::from("reports"))
}

impl AppConfig {
    /// Defaults, or the given file laid over them.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Environment overrides with the lookup injected. A set but blank
    /// endpoint variable disables that endpoint.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(AUDITOR_ENDPOINT_ENV) {
            self.auditor_endpoint = non_blank(value);
        }
        if let Some(value) = lookup(CLASSIFIER_ENDPOINT_ENV) {
            self.classifier_endpoint = non_blank(value);
        }
        if let Some(value) = lookup(REPORTS_DIR_ENV).and_then(non_blank) {
            self.reports_dir = PathBuf::from(value);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classify_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.auditor_url()?;
        self.classifier_url()?;
        Ok(())
    }

    pub fn auditor_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_endpoint("auditor_endpoint", self.auditor_endpoint.as_deref())
    }

    pub fn classifier_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_endpoint("classifier_endpoint", self.classifier_endpoint.as_deref())
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_endpoint(name: &'static str, value: Option<&str>) -> Result<Option<Url>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let invalid = || ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid());
    }
    Ok(Some(url))
}
