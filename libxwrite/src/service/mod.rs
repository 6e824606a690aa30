//! Service layer for xwrite
//!
//! Workflows shared by the command-line tools. Each service borrows the stores
//! and platform it works with, so tests can hand in in-memory versions.
//!
//! - `posting`: quota-checked posting
//! - `setup`: save, verify, import and reset credentials
//! - `validation`: post text checks
//!
//! # Example
//!
//! ```no_run
//! use libxwrite::platforms::mock::MockPlatform;
//! use libxwrite::service::posting::{PostOutcome, PostingService};
//! use libxwrite::{CredentialManager, Config, FileStateStore, RateLimiter};
//!
//! # async fn example() -> libxwrite::Result<()> {
//! let config = Config::load()?;
//! let credentials = CredentialManager::new(config.credential_config())?;
//! let state = FileStateStore::open(config.state_path())?;
//! let platform = MockPlatform::success();
//!
//! let service = PostingService::new(
//!     &platform,
//!     &credentials,
//!     &state,
//!     RateLimiter::new(config.quota.daily_limit),
//! );
//!
//! if let PostOutcome::Posted { url, remaining, .. } = service.post("Hello!").await? {
//!     println!("{} ({} left today)", url, remaining);
//! }
//! # Ok(())
//! # }
//! ```

pub mod posting;
pub mod setup;
pub mod validation;

pub use posting::{PostOutcome, PostingService};
pub use setup::{ImportChoice, SetupReport, SetupService, Verification};
pub use validation::ValidationIssue;
