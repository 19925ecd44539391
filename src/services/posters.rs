use moka::future::Cache as MemoryCache;
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use crate::{models::PosterImage, services::providers::MetadataProvider};

/// Memo key: movie id plus the fallback title the lookup was made with
type PosterKey = (u64, Option<String>);

/// Limits for the poster fetcher
#[derive(Debug, Clone)]
pub struct PosterFetcherSettings {
    /// Provider lookups in flight at once, across all requests
    pub max_concurrency: usize,
    /// Memory budget for memoised posters, weighed by image size
    pub memory_capacity_bytes: u64,
    /// How long a memoised result, including "no poster", is kept
    pub memory_ttl: Duration,
}

impl Default for PosterFetcherSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            memory_capacity_bytes: 64 * 1024 * 1024,
            memory_ttl: Duration::from_secs(3600),
        }
    }
}

/// Resolves poster images, falling back from id lookup to title search
///
/// Every failure is absorbed: callers get either an image or `None` and show a
/// placeholder for the latter. Results are memoised in process, so a repeated
/// lookup does not reach the provider until the entry expires.
#[derive(Clone)]
pub struct PosterFetcher {
    provider: Arc<dyn MetadataProvider>,
    permits: Arc<Semaphore>,
    memo: MemoryCache<PosterKey, Option<PosterImage>>,
}

impl PosterFetcher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self::with_settings(provider, PosterFetcherSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn MetadataProvider>, settings: PosterFetcherSettings) -> Self {
        let memo = MemoryCache::builder()
            .max_capacity(settings.memory_capacity_bytes)
            .time_to_live(settings.memory_ttl)
            .weigher(|_key: &PosterKey, poster: &Option<PosterImage>| -> u32 {
                poster
                    .as_ref()
                    .map(|image| u32::try_from(image.bytes.len()).unwrap_or(u32::MAX))
                    .unwrap_or(0)
                    .max(1)
            })
            .build();

        Self {
            provider,
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            memo,
        }
    }

    /// Fetches the poster for a movie
    ///
    /// Tries the id lookup first. If that yields no image for any reason and a
    /// fallback title is given, the first title-search hit is tried instead.
    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn fetch_poster(
        &self,
        movie_id: u64,
        fallback_title: Option<&str>,
    ) -> Option<PosterImage> {
        let fallback_title = fallback_title.map(str::trim).filter(|t| !t.is_empty());
        let key = (movie_id, fallback_title.map(str::to_string));

        self.memo
            .get_with(key, self.resolve(movie_id, fallback_title))
            .await
    }

    async fn resolve(&self, movie_id: u64, fallback_title: Option<&str>) -> Option<PosterImage> {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, "Poster fetch limiter closed");
                return None;
            }
        };

        match self.provider.poster_path_by_id(movie_id).await {
            Ok(Some(poster_path)) => match self.provider.fetch_image(&poster_path).await {
                Ok(image) => return Some(image),
                Err(e) => {
                    tracing::warn!(error = %e, poster_path = %poster_path, "Poster image fetch failed")
                }
            },
            Ok(None) => tracing::debug!("Movie has no poster reference"),
            Err(e) => tracing::warn!(error = %e, "Poster lookup by id failed"),
        }

        let title = fallback_title?;

        match self.provider.poster_path_by_title(title).await {
            Ok(Some(poster_path)) => match self.provider.fetch_image(&poster_path).await {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(error = %e, poster_path = %poster_path, "Fallback poster image fetch failed");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Title search found no poster");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Poster lookup by title failed");
                None
            }
        }
    }

    /// Fetches several posters concurrently
    ///
    /// Results come back in the order of `items`, regardless of which fetch
    /// finishes first. At most `max_concurrency` provider lookups run at once.
    pub async fn fetch_posters(&self, items: Vec<(u64, Option<String>)>) -> Vec<Option<PosterImage>> {
        let mut tasks = Vec::with_capacity(items.len());

        for (movie_id, title) in items {
            let fetcher = self.clone();
            let task = tokio::spawn(async move {
                fetcher.fetch_poster(movie_id, title.as_deref()).await
            });
            tasks.push(task);
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut missing = 0usize;

        for task in tasks {
            let poster = match task.await {
                Ok(poster) => poster,
                Err(e) => {
                    tracing::error!(error = %e, "Poster fetch task failed");
                    None
                }
            };
            if poster.is_none() {
                missing += 1;
            }
            results.push(poster);
        }

        if missing > 0 {
            tracing::info!(
                fetched = results.len() - missing,
                missing,
                "Some posters unavailable, using placeholder"
            );
        }

        results
    }
}
