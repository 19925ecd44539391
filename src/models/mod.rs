use serde::{Deserialize, Serialize};

/// A movie in the loaded table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    /// TMDB movie id, used for metadata lookups
    pub movie_id: u64,
    pub title: String,
    /// Position in the movie table, aligned with the similarity matrix
    pub row_index: usize,
}

/// One row of the persisted movie table
///
/// Only the columns the service needs are read; anything else in the snapshot
/// is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieRecord {
    pub movie_id: u64,
    pub title: String,
}

/// A ranked recommendation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub movie: Movie,
    pub score: f32,
}

/// Poster image bytes as served by the image host
#[derive(Debug, Clone, PartialEq)]
pub struct PosterImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Absolute URL the bytes were fetched from
    pub source_url: String,
}

// ============================================================================
// API Types
// ============================================================================

/// Entry in the movie listing used to populate the selection control
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub movie_id: u64,
    pub title: String,
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            movie_id: movie.movie_id,
            title: movie.title.clone(),
        }
    }
}

/// A result card: title plus poster or placeholder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationCard {
    pub title: String,
    pub movie_id: u64,
    pub score: f32,
    pub poster_url: String,
    pub has_poster: bool,
}

/// Response for a recommendation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub results: Vec<RecommendationCard>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Response from GET /movie/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Response from GET /search/movie
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResult {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl TmdbSearchResponse {
    /// Poster reference of the first search hit, if it has one
    pub fn first_poster_path(&self) -> Option<String> {
        self.results
            .first()
            .and_then(|result| result.poster_path.clone())
            .filter(|path| !path.is_empty())
    }
}
