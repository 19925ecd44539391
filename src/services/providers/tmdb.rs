/// TMDB (The Movie Database) provider
///
/// API Flow:
/// 1. Details: /movie/{id} → `poster_path`
/// 2. Search: /search/movie?query=... → first result's `poster_path`
/// 3. Image: {image_base_url}{poster_path} → image bytes
///
/// Poster references are cached; image bytes are not.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{PosterImage, TmdbMovieDetails, TmdbSearchResponse},
    services::providers::{MetadataProvider, RetryPolicy},
};
use reqwest::{header, Client as HttpClient, Response, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = "movie-recommender/1.0";

/// Connection settings for the TMDB API
#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub api_key: String,
    /// API root without trailing slash, e.g. `https://api.themoviedb.org/3`
    pub api_url: String,
    /// Image root without trailing slash, e.g. `https://image.tmdb.org/t/p/w500`
    pub image_base_url: String,
    pub language: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    settings: TmdbSettings,
    cache: Cache,
    cache_ttl: u64,
}

impl TmdbProvider {
    pub fn new(settings: TmdbSettings, cache: Cache, cache_ttl: u64) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http_client,
            settings,
            cache,
            cache_ttl,
        })
    }

    /// Absolute URL for a poster reference
    fn image_url(&self, poster_path: &str) -> String {
        if poster_path.starts_with('/') {
            format!("{}{}", self.settings.image_base_url, poster_path)
        } else {
            format!("{}/{}", self.settings.image_base_url, poster_path)
        }
    }

    /// Sends a GET, retrying rate-limited and server-error responses as well
    /// as connect/timeout failures, up to the configured number of retries.
    async fn get_with_retry(&self, url: &str, query: &[(&str, &str)]) -> AppResult<Response> {
        let retry = self.settings.retry;
        let mut attempt = 0u32;

        loop {
            let result = self.http_client.get(url).query(query).send().await;

            let delay = match result {
                Ok(response)
                    if RetryPolicy::is_retryable_status(response.status())
                        && attempt < retry.max_retries =>
                {
                    let hint = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|value| value.to_str().ok());
                    let delay = retry.delay_with_hint(attempt, hint);

                    tracing::warn!(
                        url = %url,
                        status = %response.status(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying TMDB request"
                    );
                    delay
                }
                Ok(response) => return Ok(response),
                Err(e) if RetryPolicy::is_retryable_error(&e) && attempt < retry.max_retries => {
                    let delay = retry.delay(attempt);

                    tracing::warn!(
                        url = %url,
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying TMDB request after transport error"
                    );
                    delay
                }
                Err(e) => return Err(e.into()),
            };

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn ensure_success(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::ExternalApi(format!(
            "TMDB API returned status {}: {}",
            status, body
        )))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn poster_path_by_id(&self, movie_id: u64) -> AppResult<Option<String>> {
        cached!(
            self.cache,
            CacheKey::PosterById(movie_id),
            self.cache_ttl,
            async move {
                let url = format!("{}/movie/{}", self.settings.api_url, movie_id);
                let response = self
                    .get_with_retry(
                        &url,
                        &[
                            ("api_key", self.settings.api_key.as_str()),
                            ("language", self.settings.language.as_str()),
                        ],
                    )
                    .await?;
                let response = Self::ensure_success(response).await?;

                let details: TmdbMovieDetails = response.json().await?;
                let poster_path = details.poster_path.filter(|path| !path.is_empty());

                tracing::debug!(
                    movie_id,
                    has_poster = poster_path.is_some(),
                    provider = "tmdb",
                    "Movie details fetched"
                );

                Ok::<_, AppError>(poster_path)
            }
        )
    }

    async fn poster_path_by_title(&self, title: &str) -> AppResult<Option<String>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search title cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::PosterByTitle(title.to_string()),
            self.cache_ttl,
            async move {
                let url = format!("{}/search/movie", self.settings.api_url);
                let response = self
                    .get_with_retry(
                        &url,
                        &[
                            ("api_key", self.settings.api_key.as_str()),
                            ("query", title),
                            ("language", self.settings.language.as_str()),
                            ("page", "1"),
                            ("include_adult", "false"),
                        ],
                    )
                    .await?;
                let response = Self::ensure_success(response).await?;

                let search: TmdbSearchResponse = response.json().await?;

                tracing::debug!(
                    title = %title,
                    results = search.results.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(search.first_poster_path())
            }
        )
    }

    async fn fetch_image(&self, poster_path: &str) -> AppResult<PosterImage> {
        let url = self.image_url(poster_path);
        let response = self.get_with_retry(&url, &[]).await?;

        if response.status() != StatusCode::OK {
            return Err(AppError::ExternalApi(format!(
                "Image host returned status {} for {}",
                response.status(),
                url
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with("image") {
            return Err(AppError::ExternalApi(format!(
                "Expected an image from {}, got content type '{}'",
                url, content_type
            )));
        }

        let bytes = response.bytes().await?.to_vec();

        Ok(PosterImage {
            content_type,
            bytes,
            source_url: url,
        })
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> TmdbProvider {
        TmdbProvider::new(
            TmdbSettings {
                api_key: "test_key".to_string(),
                api_url: "http://test.local/3".to_string(),
                image_base_url: "http://images.test.local/t/p/w500".to_string(),
                language: "en-US".to_string(),
                timeout: Duration::from_secs(1),
                retry: RetryPolicy::default(),
            },
            Cache::disabled(),
            60,
        )
        .unwrap()
    }

    #[test]
    fn test_image_url_with_leading_slash() {
        let provider = create_test_provider();
        assert_eq!(
            provider.image_url("/kyeqWdyUXW608qlYkRqosgbbJyK.jpg"),
            "http://images.test.local/t/p/w500/kyeqWdyUXW608qlYkRqosgbbJyK.jpg"
        );
    }

    #[test]
    fn test_image_url_without_leading_slash() {
        let provider = create_test_provider();
        assert_eq!(
            provider.image_url("poster.jpg"),
            "http://images.test.local/t/p/w500/poster.jpg"
        );
    }

    #[tokio::test]
    async fn test_empty_search_title_is_invalid() {
        let provider = create_test_provider();
        let result = provider.poster_path_by_title("   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(create_test_provider().name(), "tmdb");
    }
}
