//! xwrite - post short updates to X from the terminal
//!
//! This library provides the daily posting quota, credential import parsing,
//! secure credential storage and the posting workflow shared by the xwrite
//! command-line tools.

pub mod config;
pub mod credentials;
pub mod error;
pub mod import;
pub mod logging;
pub mod platforms;
pub mod rate_limiter;
pub mod service;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialConfig, CredentialManager, CredentialSet, Slot, StorageBackend};
pub use error::{Result, XWriteError};
pub use rate_limiter::{QuotaStatus, RateLimiter};
pub use state::{FileStateStore, MemoryStateStore, StateStore};
