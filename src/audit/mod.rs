//! Auditor access: the configured credential and the per-browser gate.

mod credential;
mod gate;

pub use credential::{
    keychain_password, store_keychain_password, AuditorCredential, CredentialSource,
    FALLBACK_PASSWORD, KEYRING_SERVICE, KEYRING_USER, PASSWORD_ENV,
};
pub use gate::AuditGate;
