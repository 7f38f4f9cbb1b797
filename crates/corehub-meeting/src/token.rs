//! Access-token cache with an explicit TTL and an injected clock.

use crate::clock::Clock;
use crate::MeetingResult;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are refreshed this long before they actually expire.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 300;

/// A cached bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Usable at `now` if it stays valid for at least `buffer` more.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer < self.expires_at
    }
}

/// Holds at most one access token and refreshes it on demand.
///
/// The lock is held across a refresh so concurrent callers wait for the
/// in-flight refresh instead of starting their own.
pub struct TokenCache {
    clock: Arc<dyn Clock>,
    buffer: Duration,
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_buffer(clock, Duration::seconds(DEFAULT_EXPIRY_BUFFER_SECS))
    }

    pub fn with_buffer(clock: Arc<dyn Clock>, buffer: Duration) -> Self {
        Self { clock, buffer, slot: Mutex::new(None) }
    }

    /// Return the cached token, or call `refresh` for a new `(token, expires_in_secs)`.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> MeetingResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MeetingResult<(String, i64)>>,
    {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(token) = slot.as_ref() {
            if token.is_fresh(now, self.buffer) {
                return Ok(token.value.clone());
            }
            debug!(expires_at = %token.expires_at, "Access token stale, refreshing");
        }

        let (value, expires_in) = refresh().await?;
        let token = AccessToken {
            value: value.clone(),
            expires_at: now + Duration::seconds(expires_in),
        };
        debug!(expires_at = %token.expires_at, "Access token refreshed");
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// The currently cached token, if any.
    pub async fn current(&self) -> Option<AccessToken> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::MeetingError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    async fn fetch(cache: &TokenCache, calls: &AtomicUsize) -> MeetingResult<String> {
        cache
            .get_or_refresh(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((format!("token-{}", n), 3600))
            })
            .await
    }

    #[tokio::test]
    async fn test_reuses_token_within_ttl() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TokenCache::new(clock.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(fetch(&cache, &calls).await.unwrap(), "token-1");
        clock.advance(Duration::minutes(30));
        assert_eq!(fetch(&cache, &calls).await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshes_inside_expiry_buffer() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TokenCache::new(clock.clone());
        let calls = AtomicUsize::new(0);

        fetch(&cache, &calls).await.unwrap();
        // 56 minutes in: 4 minutes left, below the 5 minute buffer.
        clock.advance(Duration::minutes(56));
        assert_eq!(fetch(&cache, &calls).await.unwrap(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_empty() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TokenCache::new(clock);

        let result = cache
            .get_or_refresh(|| async { Err(MeetingError::Auth("invalid_client".into())) })
            .await;
        assert!(result.is_err());
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TokenCache::new(clock);
        let calls = AtomicUsize::new(0);

        fetch(&cache, &calls).await.unwrap();
        cache.invalidate().await;
        assert_eq!(fetch(&cache, &calls).await.unwrap(), "token-2");
    }

    #[test]
    fn test_freshness_boundary() {
        let token = AccessToken { value: "t".into(), expires_at: start() + Duration::minutes(10) };
        assert!(token.is_fresh(start(), Duration::minutes(5)));
        assert!(!token.is_fresh(start() + Duration::minutes(5), Duration::minutes(5)));
    }
}
