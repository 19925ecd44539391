use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::routes::{
    extract::{ApiPath, ApiQuery},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct PosterQuery {
    /// Fallback title for the search; defaults to the title in the movie table
    title: Option<String>,
}

/// Serves poster bytes, or redirects to the placeholder image
pub async fn poster(
    State(state): State<Arc<AppState>>,
    ApiPath(movie_id): ApiPath<u64>,
    ApiQuery(params): ApiQuery<PosterQuery>,
) -> Response {
    let fallback_title = params.title.or_else(|| {
        state
            .store
            .find_by_movie_id(movie_id)
            .map(|movie| movie.title.clone())
    });

    match state
        .posters
        .fetch_poster(movie_id, fallback_title.as_deref())
        .await
    {
        Some(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        None => Redirect::temporary(&state.settings.placeholder_poster_url).into_response(),
    }
}
