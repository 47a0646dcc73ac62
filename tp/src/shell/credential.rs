//! Credential store for privilege escalation

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tools::ToolError;

/// Reads the privilege-escalation secret from a plain-text file
///
/// The file is read on every call and never cached. A missing, unreadable or
/// empty file is reported as `CredentialUnavailable`, never a panic.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "CredentialStore::new: called");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the secret (file content with surrounding whitespace trimmed)
    pub fn load(&self) -> Result<SecretString, ToolError> {
        debug!(path = ?self.path, "CredentialStore::load: called");
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            warn!(path = ?self.path, %e, "Credential file unavailable");
            ToolError::CredentialUnavailable {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        let secret = content.trim();
        if secret.is_empty() {
            warn!(path = ?self.path, "Credential file is empty");
            return Err(ToolError::CredentialUnavailable {
                path: self.path.clone(),
                reason: "file is empty".to_string(),
            });
        }

        debug!("CredentialStore::load: credential loaded");
        Ok(SecretString::from(secret.to_string()))
    }
}
