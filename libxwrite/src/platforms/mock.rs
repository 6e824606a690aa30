//! Mock platform implementation for testing
//!
//! A configurable stand-in for the X client. It can succeed, fail with a
//! given HTTP status, or fail at the network level, and it records every call
//! so tests can assert on what was (or was not) posted.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::credentials::CredentialSet;
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

/// How a mocked call should end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Upstream answered with this status and message
    Status(u16, String),
    /// Request never got an answer
    Network(String),
}

impl MockFailure {
    fn to_error(&self) -> PlatformError {
        match self {
            MockFailure::Status(status, message) => PlatformError::from_status(*status, message),
            MockFailure::Network(message) => PlatformError::Network(message.clone()),
        }
    }
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Username returned by a successful verification
    pub username: String,

    /// Failure for `verify_credentials`; `None` succeeds
    pub verify_failure: Option<MockFailure>,

    /// Failure for `post`; `None` succeeds
    pub post_failure: Option<MockFailure>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    pub verify_call_count: Arc<Mutex<usize>>,

    pub post_call_count: Arc<Mutex<usize>>,

    /// Posts that have been made (for verification)
    pub posted_content: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            username: "mock_user".to_string(),
            verify_failure: None,
            post_failure: None,
            delay: Duration::from_millis(0),
            verify_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock platform that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock whose verification reports `username`
    pub fn with_username(username: &str) -> Self {
        Self::new(MockConfig {
            username: username.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock that rejects credentials with `status`
    pub fn verify_failure(status: u16, message: &str) -> Self {
        Self::new(MockConfig {
            verify_failure: Some(MockFailure::Status(status, message.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock whose posts fail with `status`
    pub fn post_failure(status: u16, message: &str) -> Self {
        Self::new(MockConfig {
            post_failure: Some(MockFailure::Status(status, message.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock whose posts never reach the server
    pub fn network_failure(message: &str) -> Self {
        Self::new(MockConfig {
            post_failure: Some(MockFailure::Network(message.to_string())),
            ..Default::default()
        })
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..Default::default()
        })
    }

    pub fn verify_call_count(&self) -> usize {
        *self.config.verify_call_count.lock().unwrap()
    }

    pub fn post_call_count(&self) -> usize {
        *self.config.post_call_count.lock().unwrap()
    }

    /// Get all content that was posted
    pub fn posted_content(&self) -> Vec<String> {
        self.config.posted_content.lock().unwrap().clone()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn verify_credentials(&self, _credentials: &CredentialSet) -> Result<String> {
        *self.config.verify_call_count.lock().unwrap() += 1;
        self.simulate_latency().await;

        match &self.config.verify_failure {
            Some(failure) => Err(failure.to_error().into()),
            None => Ok(self.config.username.clone()),
        }
    }

    async fn post(&self, _credentials: &CredentialSet, text: &str) -> Result<String> {
        let call = {
            let mut count = self.config.post_call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.simulate_latency().await;

        if let Some(failure) = &self.config.post_failure {
            return Err(failure.to_error().into());
        }

        self.config
            .posted_content
            .lock()
            .unwrap()
            .push(text.to_string());

        // Snowflake-ish numeric ID, unique per mock instance
        Ok((1_800_000_000_000_000_000u64 + call as u64).to_string())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XWriteError;

    fn credentials() -> CredentialSet {
        CredentialSet::new("k", "s", "t", "a")
    }

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::with_username("jack");

        assert_eq!(platform.verify_credentials(&credentials()).await.unwrap(), "jack");
        let first = platform.post(&credentials(), "one").await.unwrap();
        let second = platform.post(&credentials(), "two").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(platform.verify_call_count(), 1);
        assert_eq!(platform.post_call_count(), 2);
        assert_eq!(platform.posted_content(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_mock_post_failure_keeps_status() {
        let platform = MockPlatform::post_failure(403, "duplicate content");

        let err = platform.post(&credentials(), "text").await.unwrap_err();
        match err {
            XWriteError::Platform(e) => assert_eq!(e.status(), Some(403)),
            other => panic!("Expected platform error, got {:?}", other),
        }
        assert!(platform.posted_content().is_empty());
    }

    #[tokio::test]
    async fn test_mock_verify_failure() {
        let platform = MockPlatform::verify_failure(401, "Unauthorized");
        let err = platform
            .verify_credentials(&credentials())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            XWriteError::Platform(PlatformError::Authentication { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_network_failure() {
        let platform = MockPlatform::network_failure("connection refused");
        let err = platform.post(&credentials(), "text").await.unwrap_err();
        assert!(matches!(
            err,
            XWriteError::Platform(PlatformError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let platform = MockPlatform::with_delay(Duration::from_millis(10));
        let start = std::time::Instant::now();
        platform.post(&credentials(), "slow").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(platform.name(), "mock");
        assert_eq!(platform.character_limit(), Some(280));
    }
}
