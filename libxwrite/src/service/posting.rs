//! Posting workflow
//!
//! One call to [`PostingService::post`] is one user action: credentials are
//! loaded, the daily quota checked, the text validated, the post sent, and
//! only then is the quota charged.

use tracing::{info, warn};

use super::validation::{validate_post_text, ValidationIssue};
use crate::credentials::CredentialManager;
use crate::error::Result;
use crate::platforms::{post_url, Platform};
use crate::rate_limiter::{format_remaining, now_millis, RateLimiter};
use crate::state::{StateStore, LIFETIME_COUNT_KEY};

/// Every this-many lifetime posts the caller may show a support prompt
pub const SUPPORT_PROMPT_INTERVAL: i64 = 7;

/// How a posting attempt ended, short of an upstream error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted {
        id: String,
        url: String,
        /// Posts left in the current epoch after this one
        remaining: u32,
        support_prompt_due: bool,
    },
    /// No complete credential set is stored
    MissingCredentials,
    /// Daily cap reached; `reset_in` is human-readable, e.g. `"3h 12m"`
    QuotaExhausted { reset_in: String },
    Rejected(ValidationIssue),
}

/// Posting service
///
/// Borrows its collaborators; nothing here is global.
pub struct PostingService<'a, P: Platform> {
    platform: &'a P,
    credentials: &'a CredentialManager,
    state: &'a dyn StateStore,
    limiter: RateLimiter,
}

impl<'a, P: Platform> PostingService<'a, P> {
    pub fn new(
        platform: &'a P,
        credentials: &'a CredentialManager,
        state: &'a dyn StateStore,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            platform,
            credentials,
            state,
            limiter,
        }
    }

    /// Post `text` against the wall clock
    pub async fn post(&self, text: &str) -> Result<PostOutcome> {
        self.post_at(text, now_millis()).await
    }

    /// Post `text` as if the current time were `now` (epoch milliseconds)
    ///
    /// # Errors
    ///
    /// Upstream failures come back as `XWriteError::Platform` with the HTTP
    /// status preserved. Nothing is charged against the quota in that case.
    pub async fn post_at(&self, text: &str, now: i64) -> Result<PostOutcome> {
        let Some(credentials) = self.credentials.load()? else {
            info!("No stored credentials, prompting setup");
            return Ok(PostOutcome::MissingCredentials);
        };

        let quota = self.limiter.check_quota(self.state, now)?;
        if !quota.can_post {
            let reset_in = format_remaining(quota.reset_at, now);
            info!(limit = quota.limit, "Daily quota exhausted, resets in {}", reset_in);
            return Ok(PostOutcome::QuotaExhausted { reset_in });
        }

        if let Err(issue) = validate_post_text(text) {
            return Ok(PostOutcome::Rejected(issue));
        }

        let id = match self.platform.post(&credentials, text).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Posting to {} failed: {}", self.platform.name(), e);
                return Err(e);
            }
        };

        self.limiter.record_post(self.state)?;
        let lifetime = self.state.get_int_or(LIFETIME_COUNT_KEY, 0)? + 1;
        self.state.set_int(LIFETIME_COUNT_KEY, lifetime)?;

        let remaining = quota.remaining.saturating_sub(1);
        info!(remaining, "Posted {} to {}", id, self.platform.name());

        Ok(PostOutcome::Posted {
            url: post_url(&id),
            id,
            remaining,
            support_prompt_due: lifetime > 0 && lifetime % SUPPORT_PROMPT_INTERVAL == 0,
        })
    }
}
