use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use marquee_api::{
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle, MovieStore},
    routes::{create_router, ApiSettings, AppState},
    services::{providers::TmdbProvider, PosterFetcher},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marquee_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Missing or malformed snapshots are fatal: nothing can be served without them
    let store = MovieStore::load(&config.movies_path, &config.similarity_path)
        .context("Failed to load movie snapshot")?;

    let (cache, cache_handle) = create_cache(&config)?;

    let provider = TmdbProvider::new(config.tmdb_settings(), cache, config.poster_cache_ttl)
        .context("Failed to build TMDB client")?;

    let state = AppState::new(
        Arc::new(store),
        PosterFetcher::with_settings(Arc::new(provider), config.poster_fetcher_settings()),
        ApiSettings {
            default_recommendations: config.default_recommendations,
            max_recommendations: config.max_recommendations,
            placeholder_poster_url: config.placeholder_poster_url.clone(),
        },
    );

    let app = create_router(Arc::new(state));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

fn create_cache(config: &Config) -> anyhow::Result<(Cache, Option<CacheWriterHandle>)> {
    match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url).context("Invalid REDIS_URL")?;
            let (cache, handle) = Cache::new(client);
            tracing::info!("Poster cache enabled");
            Ok((cache, Some(handle)))
        }
        None => {
            tracing::info!("REDIS_URL not set, poster cache disabled");
            Ok((Cache::disabled(), None))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
