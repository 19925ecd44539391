/// Movie metadata provider abstraction
///
/// A provider resolves poster references (by TMDB id or by title search) and
/// downloads the referenced image. The poster fetcher layers the fallback
/// policy on top; providers only report what happened.
use reqwest::StatusCode;
use std::time::Duration;

use crate::{error::AppResult, models::PosterImage};

pub mod tmdb;

pub use tmdb::{TmdbProvider, TmdbSettings};

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Poster reference for a movie looked up by id
    ///
    /// `Ok(None)` means the movie exists but has no poster.
    async fn poster_path_by_id(&self, movie_id: u64) -> AppResult<Option<String>>;

    /// Poster reference of the first title-search hit
    async fn poster_path_by_title(&self, title: &str) -> AppResult<Option<String>>;

    /// Downloads a poster, failing unless the response is an image
    async fn fetch_image(&self, poster_path: &str) -> AppResult<PosterImage>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Bounded retry with exponential backoff for transient HTTP failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry
    pub base_delay: Duration,
}

/// Upper bound for any single backoff, including server-provided Retry-After
const MAX_BACKOFF: Duration = Duration::from_secs(8);

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    /// Statuses worth retrying: rate limiting and server-side failures
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }

    /// Transport errors worth retrying
    pub fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 1u32 << attempt.min(6);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Backoff honouring a numeric `Retry-After` header when the server sent one
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        retry_after
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
            .unwrap_or_else(|| self.delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for code in [429u16, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(RetryPolicy::is_retryable_status(status), "{}", code);
        }
        for code in [200u16, 301, 400, 401, 404, 501] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(!RetryPolicy::is_retryable_status(status), "{}", code);
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(600));
        assert_eq!(policy.delay(1), Duration::from_millis(1200));
        assert_eq!(policy.delay(2), Duration::from_millis(2400));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(5), MAX_BACKOFF);
        assert_eq!(policy.delay(40), MAX_BACKOFF);
    }

    #[test]
    fn test_delay_with_retry_after_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_with_hint(0, Some("2")), Duration::from_secs(2));
        assert_eq!(policy.delay_with_hint(0, Some("120")), MAX_BACKOFF);
        // HTTP-date hints are not parsed and fall back to the computed delay
        assert_eq!(
            policy.delay_with_hint(1, Some("Wed, 21 Oct 2015 07:28:00 GMT")),
            Duration::from_millis(1200)
        );
        assert_eq!(policy.delay_with_hint(0, None), Duration::from_millis(600));
    }
}
