//! Credential setup workflow
//!
//! Saving always happens before verification. A rejected verification is
//! reported but leaves the new credentials in place, so a user with a flaky
//! connection does not have to enter them again.

use std::path::Path;

use tracing::{info, warn};

use crate::credentials::{CredentialManager, CredentialSet};
use crate::error::Result;
use crate::import;
use crate::platforms::Platform;
use crate::state::{StateStore, CACHED_USERNAME_KEY};

/// How the user wants to provide credentials
///
/// Chosen by position in the prompt, never by matching display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportChoice {
    UseImport,
    UseManual,
    Cancel,
}

impl ImportChoice {
    /// Map a 1-based menu position; anything unknown cancels
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => ImportChoice::UseImport,
            2 => ImportChoice::UseManual,
            _ => ImportChoice::Cancel,
        }
    }

    /// Parse a typed menu answer such as `"1"` or `" 2 \n"`
    pub fn from_answer(answer: &str) -> Self {
        answer
            .trim()
            .parse::<usize>()
            .map(Self::from_index)
            .unwrap_or(ImportChoice::Cancel)
    }
}

/// Outcome of the post-save credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Confirmed { username: String },
    Failed { reason: String },
    /// No platform was available to check against
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    /// Backend the credentials were written to
    pub backend: String,
    pub verification: Verification,
}

pub struct SetupService<'a> {
    credentials: &'a CredentialManager,
    state: &'a dyn StateStore,
    platform: Option<&'a dyn Platform>,
}

impl<'a> SetupService<'a> {
    pub fn new(credentials: &'a CredentialManager, state: &'a dyn StateStore) -> Self {
        Self {
            credentials,
            state,
            platform: None,
        }
    }

    /// Verify saved credentials against `platform`
    pub fn with_platform(mut self, platform: &'a dyn Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Store `set`, then check it upstream
    ///
    /// # Errors
    ///
    /// Only storage failures are errors. A failed verification is reported in
    /// the returned [`SetupReport`].
    pub async fn save_and_verify(&self, set: &CredentialSet) -> Result<SetupReport> {
        self.credentials.save(set)?;
        let backend = self
            .credentials
            .primary_backend()
            .unwrap_or("unknown")
            .to_string();
        info!("Credentials stored in {}", backend);

        let verification = match self.platform {
            None => Verification::Skipped,
            Some(platform) => match platform.verify_credentials(set).await {
                Ok(username) => {
                    self.state.set_text(CACHED_USERNAME_KEY, &username)?;
                    info!("Verified credentials for @{}", username);
                    Verification::Confirmed { username }
                }
                Err(e) => {
                    warn!("Credential verification failed: {}", e);
                    Verification::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        };

        Ok(SetupReport {
            backend,
            verification,
        })
    }

    /// Parse credential text and save it
    ///
    /// An incomplete import stores nothing.
    pub async fn import(&self, text: &str) -> Result<SetupReport> {
        let set = import::parse(text)?;
        self.save_and_verify(&set).await
    }

    pub async fn import_file(&self, path: &Path) -> Result<SetupReport> {
        let set = import::import_file(path)?;
        self.save_and_verify(&set).await
    }

    /// Delete stored credentials and forget the cached username
    pub fn reset(&self) -> Result<()> {
        self.credentials.reset()?;
        self.state.remove(CACHED_USERNAME_KEY)?;
        info!("Credentials reset");
        Ok(())
    }

    pub fn cached_username(&self) -> Result<Option<String>> {
        self.state.get_text(CACHED_USERNAME_KEY)
    }
}
