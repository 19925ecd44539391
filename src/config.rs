use std::time::Duration;

use serde::Deserialize;

use crate::services::{
    posters::PosterFetcherSettings,
    providers::{RetryPolicy, TmdbSettings},
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Base URL poster paths are resolved against
    #[serde(default = "default_tmdb_image_base_url")]
    pub tmdb_image_base_url: String,

    /// Language passed to metadata lookups
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Path to the movie table snapshot
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Path to the similarity matrix snapshot
    #[serde(default = "default_similarity_path")]
    pub similarity_path: String,

    /// Image shown when no poster could be fetched
    #[serde(default = "default_placeholder_poster_url")]
    pub placeholder_poster_url: String,

    /// Number of recommendations returned when the request does not say
    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,

    /// Largest `n` a recommendation request may ask for
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    /// Poster lookups allowed in flight at once
    #[serde(default = "default_poster_concurrency")]
    pub poster_concurrency: usize,

    /// Memory budget for memoised poster images, in megabytes
    #[serde(default = "default_poster_memory_cache_mb")]
    pub poster_memory_cache_mb: u64,

    /// How long a memoised poster is kept in memory, in seconds
    #[serde(default = "default_poster_memory_ttl_secs")]
    pub poster_memory_ttl_secs: u64,

    /// Per-request timeout for metadata and image calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Retries for rate-limited or failing metadata calls
    #[serde(default = "default_http_max_retries")]
    pub http_max_retries: u32,

    /// Base backoff between retries, doubled on every attempt
    #[serde(default = "default_http_backoff_ms")]
    pub http_backoff_ms: u64,

    /// Redis connection URL; poster caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL for cached poster references, in seconds
    #[serde(default = "default_poster_cache_ttl")]
    pub poster_cache_ttl: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_movies_path() -> String {
    "data/movies.json".to_string()
}

fn default_similarity_path() -> String {
    "data/similarity.json".to_string()
}

fn default_placeholder_poster_url() -> String {
    "https://via.placeholder.com/500x750?text=No+Image".to_string()
}

fn default_recommendations() -> usize {
    10
}

fn default_max_recommendations() -> usize {
    50
}

fn default_poster_concurrency() -> usize {
    8
}

fn default_poster_memory_cache_mb() -> u64 {
    64
}

fn default_poster_memory_ttl_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_http_max_retries() -> u32 {
    3
}

fn default_http_backoff_ms() -> u64 {
    600
}

fn default_poster_cache_ttl() -> u64 {
    604800 // 1 week
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.default_recommendations == 0 {
            anyhow::bail!("DEFAULT_RECOMMENDATIONS must be at least 1");
        }
        if config.max_recommendations < config.default_recommendations {
            anyhow::bail!("MAX_RECOMMENDATIONS must not be below DEFAULT_RECOMMENDATIONS");
        }
        if config.poster_concurrency == 0 {
            anyhow::bail!("POSTER_CONCURRENCY must be at least 1");
        }

        Ok(config)
    }

    /// Settings for the TMDB metadata provider
    pub fn tmdb_settings(&self) -> TmdbSettings {
        TmdbSettings {
            api_key: self.tmdb_api_key.clone(),
            api_url: self.tmdb_api_url.trim_end_matches('/').to_string(),
            image_base_url: self.tmdb_image_base_url.trim_end_matches('/').to_string(),
            language: self.tmdb_language.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            retry: RetryPolicy {
                max_retries: self.http_max_retries,
                base_delay: Duration::from_millis(self.http_backoff_ms),
            },
        }
    }

    /// Limits for the in-process poster fetcher
    pub fn poster_fetcher_settings(&self) -> PosterFetcherSettings {
        PosterFetcherSettings {
            max_concurrency: self.poster_concurrency,
            memory_capacity_bytes: self.poster_memory_cache_mb * 1024 * 1024,
            memory_ttl: Duration::from_secs(self.poster_memory_ttl_secs),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
