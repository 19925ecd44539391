use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    models::MovieSummary,
    routes::{extract::ApiQuery, AppState},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring filter on the title
    q: Option<String>,
    limit: Option<usize>,
}

/// Lists titles in table order, for populating the selection control
pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListQuery>,
) -> Json<Vec<MovieSummary>> {
    let needle = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let movies = state
        .store
        .movies()
        .iter()
        .filter(|movie| match &needle {
            Some(needle) => movie.title.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .take(params.limit.unwrap_or(usize::MAX))
        .map(MovieSummary::from)
        .collect();

    Json(movies)
}
