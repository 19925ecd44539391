/// Read-through lookup of a poster reference.
///
/// Evaluates to an `AppResult`. A hit in `$cache` is returned without touching
/// the metadata API. On a miss `$lookup` is awaited and its result, including
/// `None` for a movie without a poster, is queued for the background writer
/// under `$key` for `$ttl` seconds. A failed lookup is returned with `?` and
/// leaves the cache untouched, so the next request asks TMDB again.
///
/// `$cache` is a [`Cache`](crate::db::Cache) (a disabled one always misses) and
/// `$key` a [`CacheKey`](crate::db::CacheKey).
///
/// ```rust,ignore
/// let poster_path: Option<String> = cached!(
///     self.cache,
///     CacheKey::PosterById(movie_id),
///     self.cache_ttl,
///     async move { self.fetch_details(movie_id).await.map(|d| d.poster_path) }
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $lookup:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => Ok(hit),
            None => {
                let fresh = $lookup.await?;
                $cache.set_in_background(&key, &fresh, $ttl);
                Ok(fresh)
            }
        }
    }};
}
