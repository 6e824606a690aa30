//! Platform abstraction
//!
//! The HTTP client that actually talks to X sits behind [`Platform`] so the
//! posting and setup workflows can be driven by a mock in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libxwrite::platforms::{post_url, Platform};
//! use libxwrite::CredentialSet;
//!
//! # async fn example(platform: &dyn Platform, credentials: &CredentialSet) -> libxwrite::Result<()> {
//! let username = platform.verify_credentials(credentials).await?;
//! println!("Authenticated as @{}", username);
//!
//! let id = platform.post(credentials, "Hello from the terminal").await?;
//! println!("Posted: {}", post_url(&id));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::credentials::CredentialSet;
use crate::error::Result;

pub mod mock;

/// Maximum characters in a single post
pub const CHARACTER_LIMIT: usize = 280;

/// Unified interface to the posting backend
///
/// Credentials are passed on every call; implementations hold no secrets of
/// their own.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Check the credentials against the account endpoint
    ///
    /// Returns the account's username.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the credentials are
    /// rejected, or another `PlatformError` for upstream failures.
    async fn verify_credentials(&self, credentials: &CredentialSet) -> Result<String>;

    /// Publish `text` and return the new post's ID
    ///
    /// # Errors
    ///
    /// Upstream failures are classified with
    /// [`PlatformError::from_status`](crate::error::PlatformError::from_status)
    /// so the HTTP status survives.
    async fn post(&self, credentials: &CredentialSet, text: &str) -> Result<String>;

    /// Lowercase platform identifier
    fn name(&self) -> &str;

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }
}

/// Public URL for a post ID
pub fn post_url(id: &str) -> String {
    format!("https://twitter.com/user/status/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_url() {
        assert_eq!(
            post_url("1234567890"),
            "https://twitter.com/user/status/1234567890"
        );
    }
}
