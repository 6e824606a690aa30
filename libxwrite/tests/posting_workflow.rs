//! Posting workflow tests
//!
//! Drive `PostingService` end to end against the mock platform with in-memory
//! credential and state stores.

use anyhow::Result;
use libxwrite::credentials::MemoryStore;
use libxwrite::error::PlatformError;
use libxwrite::platforms::mock::MockPlatform;
use libxwrite::rate_limiter::EPOCH_LENGTH_MS;
use libxwrite::service::posting::{PostOutcome, PostingService};
use libxwrite::service::validation::ValidationIssue;
use libxwrite::state::{LAST_RESET_KEY, LIFETIME_COUNT_KEY, TWEET_COUNT_KEY};
use libxwrite::{
    CredentialManager, CredentialSet, MemoryStateStore, RateLimiter, StateStore, XWriteError,
};

const NOW: i64 = 1_700_000_000_000;

fn stored_credentials() -> CredentialManager {
    let manager = CredentialManager::with_store(Box::new(MemoryStore::new()));
    manager
        .save(&CredentialSet::new("key", "secret", "token", "token-secret"))
        .unwrap();
    manager
}

fn service<'a>(
    platform: &'a MockPlatform,
    credentials: &'a CredentialManager,
    state: &'a MemoryStateStore,
) -> PostingService<'a, MockPlatform> {
    PostingService::new(platform, credentials, state, RateLimiter::default())
}

#[tokio::test]
async fn test_successful_post_charges_quota() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();

    let outcome = service(&platform, &credentials, &state)
        .post_at("Hello from the terminal", NOW)
        .await?;

    match outcome {
        PostOutcome::Posted {
            id,
            url,
            remaining,
            support_prompt_due,
        } => {
            assert_eq!(url, format!("https://twitter.com/user/status/{}", id));
            assert_eq!(remaining, 16);
            assert!(!support_prompt_due);
        }
        other => panic!("Expected Posted, got {:?}", other),
    }

    assert_eq!(platform.posted_content(), vec!["Hello from the terminal"]);
    assert_eq!(state.get_int(TWEET_COUNT_KEY)?, Some(1));
    assert_eq!(state.get_int(LIFETIME_COUNT_KEY)?, Some(1));
    assert_eq!(state.get_int(LAST_RESET_KEY)?, Some(NOW));
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_short_circuits() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = CredentialManager::with_store(Box::new(MemoryStore::new()));
    let state = MemoryStateStore::new();

    let outcome = service(&platform, &credentials, &state)
        .post_at("Hello", NOW)
        .await?;

    assert_eq!(outcome, PostOutcome::MissingCredentials);
    assert_eq!(platform.post_call_count(), 0);
    assert_eq!(state.get_int(TWEET_COUNT_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_quota_blocks_post() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    state.set_int(TWEET_COUNT_KEY, 17)?;
    state.set_int(LAST_RESET_KEY, NOW)?;

    let two_hours_later = NOW + 2 * 60 * 60 * 1000;
    let outcome = service(&platform, &credentials, &state)
        .post_at("One too many", two_hours_later)
        .await?;

    assert_eq!(
        outcome,
        PostOutcome::QuotaExhausted {
            reset_in: "22h 0m".to_string()
        }
    );
    assert_eq!(platform.post_call_count(), 0);
    assert_eq!(state.get_int(TWEET_COUNT_KEY)?, Some(17));
    Ok(())
}

#[tokio::test]
async fn test_quota_frees_up_after_epoch() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    state.set_int(TWEET_COUNT_KEY, 17)?;
    state.set_int(LAST_RESET_KEY, NOW)?;

    let outcome = service(&platform, &credentials, &state)
        .post_at("Fresh day", NOW + EPOCH_LENGTH_MS)
        .await?;

    assert!(matches!(outcome, PostOutcome::Posted { remaining: 16, .. }));
    assert_eq!(state.get_int(TWEET_COUNT_KEY)?, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_invalid_text_is_rejected_without_posting() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    let service = service(&platform, &credentials, &state);

    assert_eq!(
        service.post_at("   ", NOW).await?,
        PostOutcome::Rejected(ValidationIssue::Empty)
    );
    assert_eq!(
        service.post_at(&"x".repeat(281), NOW).await?,
        PostOutcome::Rejected(ValidationIssue::TooLong { length: 281 })
    );

    assert_eq!(platform.post_call_count(), 0);
    assert_eq!(state.get_int_or(TWEET_COUNT_KEY, 0)?, 0);
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_keeps_status_and_quota() -> Result<()> {
    let credentials = stored_credentials();

    for (status, expect_auth) in [(401u16, true), (403, true), (429, false), (500, false)] {
        let platform = MockPlatform::post_failure(status, "upstream said no");
        let state = MemoryStateStore::new();

        let err = service(&platform, &credentials, &state)
            .post_at("Hello", NOW)
            .await
            .unwrap_err();

        match &err {
            XWriteError::Platform(e) => {
                assert_eq!(e.status(), Some(status));
                assert_eq!(
                    matches!(e, PlatformError::Authentication { .. }),
                    expect_auth
                );
            }
            other => panic!("Expected platform error, got {:?}", other),
        }

        assert_eq!(state.get_int_or(TWEET_COUNT_KEY, 0)?, 0);
        assert_eq!(state.get_int_or(LIFETIME_COUNT_KEY, 0)?, 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_status_maps_to_rate_limit_error() -> Result<()> {
    let platform = MockPlatform::post_failure(429, "Too Many Requests");
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();

    let err = service(&platform, &credentials, &state)
        .post_at("Hello", NOW)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        XWriteError::Platform(PlatformError::RateLimit { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_support_prompt_every_seventh_post() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    let service = service(&platform, &credentials, &state);

    let mut due_at = Vec::new();
    for n in 1..=15 {
        if let PostOutcome::Posted {
            support_prompt_due, ..
        } = service.post_at(&format!("post {}", n), NOW + n).await?
        {
            if support_prompt_due {
                due_at.push(n);
            }
        }
    }

    assert_eq!(due_at, vec![7, 14]);
    assert_eq!(state.get_int(LIFETIME_COUNT_KEY)?, Some(15));
    Ok(())
}

#[tokio::test]
async fn test_lifetime_count_survives_rollover() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    state.set_int(LIFETIME_COUNT_KEY, 6)?;
    state.set_int(TWEET_COUNT_KEY, 3)?;
    state.set_int(LAST_RESET_KEY, NOW)?;

    let outcome = service(&platform, &credentials, &state)
        .post_at("Next day", NOW + EPOCH_LENGTH_MS + 1)
        .await?;

    assert!(matches!(
        outcome,
        PostOutcome::Posted {
            support_prompt_due: true,
            remaining: 16,
            ..
        }
    ));
    assert_eq!(state.get_int(LIFETIME_COUNT_KEY)?, Some(7));
    Ok(())
}

#[tokio::test]
async fn test_custom_daily_limit() -> Result<()> {
    let platform = MockPlatform::success();
    let credentials = stored_credentials();
    let state = MemoryStateStore::new();
    let service = PostingService::new(&platform, &credentials, &state, RateLimiter::new(2));

    service.post_at("one", NOW).await?;
    service.post_at("two", NOW + 1).await?;
    let third = service.post_at("three", NOW + 2).await?;

    assert!(matches!(third, PostOutcome::QuotaExhausted { .. }));
    assert_eq!(platform.posted_content(), vec!["one", "two"]);
    Ok(())
}
