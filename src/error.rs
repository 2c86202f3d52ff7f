use thiserror::Error;

use crate::config::ConfigError;

/// Startup and wiring failures.
#[derive(Debug, Error)]
pub enum CleaningAuditError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Keychain error: {0}")]
    Keychain(String),
}
