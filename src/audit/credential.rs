use std::fmt;

use keyring::Entry;
use serde::Serialize;
use tracing::{info, warn};

/// Environment variable checked first for the auditor password.
pub const PASSWORD_ENV: &str = "AUDITOR_PASSWORD";
pub const KEYRING_SERVICE: &str = "cleaning-audit";
pub const KEYRING_USER: &str = "auditor";
/// Used only when nothing else is configured.
pub const FALLBACK_PASSWORD: &str = "1111";

const FALLBACK_WARNING: &str =
    "auditor password is the built-in default; set AUDITOR_PASSWORD or store one in the keychain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Environment,
    Keychain,
    Fallback,
}

/// The configured auditor secret and where it came from.
#[derive(Clone)]
pub struct AuditorCredential {
    secret: String,
    source: CredentialSource,
}

impl fmt::Debug for AuditorCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditorCredential")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl AuditorCredential {
    pub fn new(secret: &str, source: CredentialSource) -> Self {
        Self {
            secret: secret.trim().to_string(),
            source,
        }
    }

    /// Environment, then keychain, then the insecure fallback.
    pub fn resolve() -> Self {
        Self::resolve_with(std::env::var(PASSWORD_ENV).ok(), keychain_password)
    }

    /// Resolution with the lookups injected.
    pub fn resolve_with<F>(env_value: Option<String>, keychain: F) -> Self
    where
        F: FnOnce() -> Result<Option<String>, String>,
    {
        if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
            info!("Auditor password taken from {}", PASSWORD_ENV);
            return Self::new(&value, CredentialSource::Environment);
        }

        match keychain() {
            Ok(Some(value)) if !value.trim().is_empty() => {
                info!("Auditor password taken from the keychain");
                return Self::new(&value, CredentialSource::Keychain);
            }
            Ok(_) => {}
            Err(e) => warn!("Keychain lookup failed: {}", e),
        }

        warn!("{}", FALLBACK_WARNING);
        Self::new(FALLBACK_PASSWORD, CredentialSource::Fallback)
    }

    /// Compare a login attempt (trimmed) against the secret.
    pub fn matches(&self, candidate: &str) -> bool {
        candidate.trim() == self.secret
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Message for operators when the fallback is in use.
    pub fn operator_warning(&self) -> Option<&'static str> {
        match self.source {
            CredentialSource::Fallback => Some(FALLBACK_WARNING),
            _ => None,
        }
    }
}

/// Read the stored auditor password from the OS keychain.
pub fn keychain_password() -> Result<Option<String>, String> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", KEYRING_SERVICE, e);
        e.to_string()
    })?;
    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            info!("No auditor password in the keychain");
            Ok(None)
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Save the auditor password to the OS keychain.
pub fn store_keychain_password(password: &str) -> Result<(), String> {
    let password = password.trim();
    if password.is_empty() {
        return Err("password must not be empty".to_string());
    }
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| e.to_string())?;
    entry.set_password(password).map_err(|e| {
        warn!("Failed to store auditor password: {}", e);
        e.to_string()
    })?;
    info!("Stored auditor password in the keychain");
    Ok(())
}
