use axum::{
    extract::State,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{RecommendationCard, RecommendationResponse},
    routes::{extract::ApiQuery, AppState},
    services::recommendations,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
    pub n: Option<usize>,
    /// Fetch posters for the results; defaults to true
    pub posters: Option<bool>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let n = params.n.unwrap_or(state.settings.default_recommendations);
    if n > state.settings.max_recommendations {
        return Err(AppError::InvalidInput(format!(
            "Number of recommendations must be at most {}",
            state.settings.max_recommendations
        )));
    }

    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        n,
        "Processing recommendation request"
    );

    let ranked = recommendations::recommend(&state.store, &params.title, n)?;

    let posters = if params.posters.unwrap_or(true) {
        let items = ranked
            .iter()
            .map(|r| (r.movie.movie_id, Some(r.movie.title.clone())))
            .collect();
        state.posters.fetch_posters(items).await
    } else {
        vec![None; ranked.len()]
    };

    let results: Vec<RecommendationCard> = ranked
        .into_iter()
        .zip(posters)
        .map(|(recommendation, poster)| {
            let has_poster = poster.is_some();
            RecommendationCard {
                title: recommendation.movie.title,
                movie_id: recommendation.movie.movie_id,
                score: recommendation.score,
                poster_url: poster
                    .map(|image| image.source_url)
                    .unwrap_or_else(|| state.settings.placeholder_poster_url.clone()),
                has_poster,
            }
        })
        .collect();

    tracing::info!(
        request_id = %request_id,
        results = results.len(),
        with_poster = results.iter().filter(|card| card.has_poster).count(),
        "Recommendations completed"
    );

    Ok(Json(RecommendationResponse {
        query: params.title,
        results,
    }))
}
