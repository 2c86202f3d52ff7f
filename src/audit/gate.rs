use tracing::{info, warn};

use super::credential::AuditorCredential;

/// Per-browser auditor login flag.
#[derive(Debug, Default, Clone)]
pub struct AuditGate {
    authenticated: bool,
}

impl AuditGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wrong password leaves an existing login in place.
    pub fn login(&mut self, credential: &AuditorCredential, password: &str) -> bool {
        if credential.matches(password) {
            self.authenticated = true;
            info!("Auditor logged in");
            true
        } else {
            warn!("Rejected auditor login attempt");
            false
        }
    }

    pub fn logout(&mut self) {
        if self.authenticated {
            info!("Auditor logged out");
        }
        self.authenticated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
