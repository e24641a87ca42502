//! Caller-side retry around cache resolution
//!
//! The cache and network layers never retry. A failed resolution is retried
//! here only when the error says retrying may help.

use curie_errors::{Error, UserFacingError};
use curie_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use curie_store::AssetCache;
use curie_types::{Product, ProductKey};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl RetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Calculate exponential backoff delay with jitter
///
/// `attempt` is 1 for the first retry.
pub fn calculate_backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    // Precision loss acceptable for backoff calculations
    #[allow(clippy::cast_precision_loss)]
    let base_delay = policy.initial_delay.as_millis().min(u128::from(u64::MAX)) as f64;
    #[allow(clippy::cast_precision_loss)]
    let max_delay = policy.max_delay.as_millis().min(u128::from(u64::MAX)) as f64;

    // Retry counts are small, the cast cannot wrap in practice
    #[allow(clippy::cast_possible_wrap)]
    let exponent = attempt.saturating_sub(1) as i32;
    let delay = (base_delay * policy.backoff_multiplier.powi(exponent)).min(max_delay);

    let jitter = delay * policy.jitter_factor * (rand::random::<f64>() - 0.5);
    // max(0.0) keeps it non-negative; round() handles the fraction
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let final_delay = (delay + jitter).max(0.0).round() as u64;

    Duration::from_millis(final_delay)
}

/// Resolve `key`, retrying retryable failures according to `policy`
pub async fn resolve_with_retry(
    cache: &AssetCache,
    key: &ProductKey,
    policy: &RetryPolicy,
    events: &EventSender,
) -> Result<Product, Error> {
    let mut attempt = 0;
    loop {
        match cache.resolve(key).await {
            Ok(product) => return Ok(product),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = calculate_backoff_delay(policy, attempt);
                events.emit(AppEvent::Download(DownloadEvent::Retrying {
                    key: key.to_string(),
                    attempt: attempt as usize,
                    max_attempts: policy.max_retries as usize,
                    backoff,
                    reason: err.user_message().into_owned(),
                }));
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curie_errors::NetworkError;
    use curie_net::AssetSource;
    use curie_store::CacheLayout;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncWrite, AsyncWriteExt};
    use url::Url;

    /// Times out on the first `failures` exchanges, then serves a fixed body
    struct Flaky {
        failures: u32,
        fatal: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl AssetSource for Flaky {
        async fn signed_url(&self, _key: &ProductKey) -> Result<Url, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fatal {
                return Err(NetworkError::HttpError {
                    status: 404,
                    message: "Not Found".to_string(),
                }
                .into());
            }
            if call < self.failures {
                return Err(NetworkError::Timeout {
                    url: "https://api.test/signurl".to_string(),
                }
                .into());
            }
            Ok(Url::parse("https://cdn.test/a.usdz").unwrap())
        }

        async fn download(
            &self,
            _url: &Url,
            sink: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64, Error> {
            sink.write_all(b"ok").await?;
            Ok(2)
        }
    }

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::with_retries(retries)
        }
    }

    async fn run(source: Flaky, policy: &RetryPolicy) -> (Result<Product, Error>, u32) {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(source);
        let dyn_source: Arc<dyn AssetSource> = source.clone();
        let cache = AssetCache::new(CacheLayout::new(dir.path(), "usdz"), dyn_source);
        let (tx, _rx) = curie_events::channel();
        let key = ProductKey::new("abc").unwrap();
        let result = resolve_with_retry(&cache, &key, policy, &tx).await;
        (result, source.calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let flaky = Flaky {
            failures: 2,
            fatal: false,
            calls: AtomicU32::new(0),
        };
        let (result, calls) = run(flaky, &fast(3)).await;
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let flaky = Flaky {
            failures: 10,
            fatal: false,
            calls: AtomicU32::new(0),
        };
        let (result, calls) = run(flaky, &fast(2)).await;
        assert!(matches!(result, Err(Error::ExchangeFailed { .. })));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_failures() {
        let flaky = Flaky {
            failures: 0,
            fatal: true,
            calls: AtomicU32::new(0),
        };
        let (result, calls) = run(flaky, &fast(5)).await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::with_retries(10)
        };
        assert_eq!(calculate_backoff_delay(&policy, 1), Duration::from_millis(500));
        assert_eq!(calculate_backoff_delay(&policy, 2), Duration::from_millis(1000));
        assert_eq!(calculate_backoff_delay(&policy, 3), Duration::from_millis(2000));
        assert_eq!(calculate_backoff_delay(&policy, 10), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy::with_retries(3);
        for _ in 0..100 {
            let delay = calculate_backoff_delay(&policy, 1);
            assert!(delay >= Duration::from_millis(475));
            assert!(delay <= Duration::from_millis(525));
        }
    }
}
