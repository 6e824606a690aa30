//! Daily posting quota
//!
//! Counts posts in a 24 hour epoch that starts at the last rollover rather
//! than at midnight. The counter and the epoch start live in a [`StateStore`]
//! so the quota survives restarts.
//!
//! Checking and recording are separate steps: callers check first, perform
//! the post, and record only once the post succeeded. The pair is not atomic;
//! two concurrent posters could each pass the check and overshoot the cap by
//! one.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::state::{StateStore, LAST_RESET_KEY, TWEET_COUNT_KEY};

/// Posts allowed per epoch unless configured otherwise
pub const DEFAULT_DAILY_LIMIT: u32 = 17;

/// Length of a quota epoch in milliseconds
pub const EPOCH_LENGTH_MS: i64 = 24 * 60 * 60 * 1000;

const HOUR_MS: i64 = 60 * 60 * 1000;
const MINUTE_MS: i64 = 60 * 1000;

/// Counter and epoch start as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub count: u32,
    /// Epoch milliseconds
    pub epoch_start: i64,
}

/// Result of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub can_post: bool,
    pub remaining: u32,
    pub limit: u32,
    /// When the current epoch ends, epoch milliseconds
    pub reset_at: i64,
}

impl QuotaStatus {
    pub fn reset_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.reset_at)
    }
}

/// Rate limiter for the daily posting cap
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: u32,
    epoch_ms: i64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}

impl RateLimiter {
    /// Create a limiter allowing `limit` posts per 24 hours
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            epoch_ms: EPOCH_LENGTH_MS,
        }
    }

    /// Create a limiter with a custom epoch length
    pub fn with_epoch(limit: u32, epoch: chrono::Duration) -> Self {
        Self {
            limit,
            epoch_ms: epoch.num_milliseconds(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Read the quota state, initializing or rolling it over as needed
    ///
    /// A store with no epoch start gets one at `now` with the counter left
    /// as is; that first read is not a rollover. Once `epoch_ms` has elapsed
    /// since the epoch start, both the counter and the start are reset and
    /// persisted before returning.
    pub fn load_state(&self, store: &dyn StateStore, now: i64) -> Result<QuotaState> {
        let count = stored_count(store)?;

        let epoch_start = match store.get_int(LAST_RESET_KEY)? {
            Some(start) => start,
            None => {
                store.set_int(LAST_RESET_KEY, now)?;
                tracing::debug!("Initialized quota epoch at {}", now);
                return Ok(QuotaState {
                    count,
                    epoch_start: now,
                });
            }
        };

        // Stored epoch start may be any i64
        if now.saturating_sub(epoch_start) >= self.epoch_ms {
            store.set_int(TWEET_COUNT_KEY, 0)?;
            store.set_int(LAST_RESET_KEY, now)?;
            tracing::info!(
                previous_count = count,
                "Quota epoch rolled over, counter reset"
            );
            return Ok(QuotaState {
                count: 0,
                epoch_start: now,
            });
        }

        Ok(QuotaState { count, epoch_start })
    }

    /// Check whether another post fits in the current epoch
    pub fn check_quota(&self, store: &dyn StateStore, now: i64) -> Result<QuotaStatus> {
        let state = self.load_state(store, now)?;

        Ok(QuotaStatus {
            can_post: state.count < self.limit,
            remaining: self.limit.saturating_sub(state.count),
            limit: self.limit,
            reset_at: state.epoch_start.saturating_add(self.epoch_ms),
        })
    }

    /// [`check_quota`](Self::check_quota) against the wall clock
    pub fn check_quota_now(&self, store: &dyn StateStore) -> Result<QuotaStatus> {
        self.check_quota(store, now_millis())
    }

    /// Count one successful post
    ///
    /// Does not check the cap.
    pub fn record_post(&self, store: &dyn StateStore) -> Result<()> {
        let count = stored_count(store)?.saturating_add(1);
        store.set_int(TWEET_COUNT_KEY, i64::from(count))?;
        tracing::debug!("Recorded post {} of {} for this epoch", count, self.limit);
        Ok(())
    }
}

fn stored_count(store: &dyn StateStore) -> Result<u32> {
    let raw = store.get_int_or(TWEET_COUNT_KEY, 0)?;
    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

/// Current wall clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render the time left until `reset_at` as `"{h}h {m}m"` or `"{m}m"`
///
/// Zero or negative durations render as `"0m"`.
pub fn format_remaining(reset_at: i64, now: i64) -> String {
    let diff = reset_at.saturating_sub(now);
    if diff <= 0 {
        return "0m".to_string();
    }

    let hours = diff / HOUR_MS;
    let minutes = (diff % HOUR_MS) / MINUTE_MS;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn format_remaining_now(reset_at: i64) -> String {
    format_remaining(reset_at, now_millis())
}
