/// Persisted movie table and similarity matrix
///
/// Both artifacts are produced offline and loaded once at startup. After
/// `MovieStore::load` returns, the store is immutable and shared behind an
/// `Arc` for the lifetime of the process.
use chrono::{DateTime, Utc};
use std::{collections::HashMap, fs, path::Path};

use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieRecord},
};

/// Square matrix of pairwise similarity scores, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    scores: Vec<f32>,
}

impl SimilarityMatrix {
    /// Builds a matrix from rows, rejecting ragged or non-finite input
    pub fn from_rows(rows: Vec<Vec<f32>>) -> AppResult<Self> {
        let size = rows.len();
        let mut scores = Vec::with_capacity(size * size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(AppError::Snapshot(format!(
                    "Similarity matrix is not square: row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            scores.extend(row);
        }

        Self::from_flat(size, scores)
    }

    /// Builds a matrix from row-major scores
    pub fn from_flat(size: usize, scores: Vec<f32>) -> AppResult<Self> {
        if scores.len() != size * size {
            return Err(AppError::Snapshot(format!(
                "Similarity matrix has {} scores, expected {}",
                scores.len(),
                size * size
            )));
        }

        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            return Err(AppError::Snapshot(format!(
                "Similarity matrix has a non-finite score at ({}, {})",
                pos / size,
                pos % size
            )));
        }

        Ok(Self { size, scores })
    }

    /// Decodes little-endian `f32` scores; the side length is inferred
    pub fn from_le_bytes(bytes: &[u8]) -> AppResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(AppError::Snapshot(format!(
                "Binary similarity matrix length {} is not a multiple of 4",
                bytes.len()
            )));
        }

        let count = bytes.len() / 4;
        let size = (count as f64).sqrt().round() as usize;
        if size * size != count {
            return Err(AppError::Snapshot(format!(
                "Binary similarity matrix has {} scores, which is not a square",
                count
            )));
        }

        let scores = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Self::from_flat(size, scores)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Scores of movie `index` against every movie, in row order
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.size {
            return None;
        }
        let start = index * self.size;
        Some(&self.scores[start..start + self.size])
    }
}

/// The movie table and its similarity matrix
#[derive(Debug)]
pub struct MovieStore {
    movies: Vec<Movie>,
    similarity: SimilarityMatrix,
    /// Title → row index of its first occurrence
    title_index: HashMap<String, usize>,
    loaded_at: DateTime<Utc>,
}

impl MovieStore {
    /// Pairs movie records with a matrix of matching size
    pub fn new(records: Vec<MovieRecord>, similarity: SimilarityMatrix) -> AppResult<Self> {
        if records.is_empty() {
            return Err(AppError::Snapshot(
                "Movie table is empty, nothing to recommend".to_string(),
            ));
        }

        if records.len() != similarity.size() {
            return Err(AppError::Snapshot(format!(
                "Movie table has {} rows but similarity matrix is {}x{}",
                records.len(),
                similarity.size(),
                similarity.size()
            )));
        }

        let movies: Vec<Movie> = records
            .into_iter()
            .enumerate()
            .map(|(row_index, record)| Movie {
                movie_id: record.movie_id,
                title: record.title,
                row_index,
            })
            .collect();

        let mut title_index = HashMap::with_capacity(movies.len());
        for movie in &movies {
            if title_index.contains_key(&movie.title) {
                tracing::debug!(
                    title = %movie.title,
                    row_index = movie.row_index,
                    "Duplicate title in movie table, keeping first occurrence"
                );
                continue;
            }
            title_index.insert(movie.title.clone(), movie.row_index);
        }

        Ok(Self {
            movies,
            similarity,
            title_index,
            loaded_at: Utc::now(),
        })
    }

    /// Loads both snapshot files from disk
    ///
    /// The movie table is JSON. The similarity matrix is JSON when the file
    /// has a `.json` extension and raw little-endian `f32` otherwise.
    pub fn load(movies_path: impl AsRef<Path>, similarity_path: impl AsRef<Path>) -> AppResult<Self> {
        let movies_path = movies_path.as_ref();
        let similarity_path = similarity_path.as_ref();

        let records = load_movie_records(movies_path)?;
        let similarity = load_similarity(similarity_path)?;
        let store = Self::new(records, similarity)?;

        tracing::info!(
            movies = store.len(),
            movies_path = %movies_path.display(),
            similarity_path = %similarity_path.display(),
            "Loaded movie snapshot"
        );

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn movie(&self, row_index: usize) -> Option<&Movie> {
        self.movies.get(row_index)
    }

    /// Exact title match; the first row wins when titles repeat
    pub fn find_by_title(&self, title: &str) -> Option<&Movie> {
        self.title_index
            .get(title)
            .and_then(|&row_index| self.movies.get(row_index))
    }

    pub fn find_by_movie_id(&self, movie_id: u64) -> Option<&Movie> {
        self.movies.iter().find(|movie| movie.movie_id == movie_id)
    }

    pub fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn load_movie_records(path: &Path) -> AppResult<Vec<MovieRecord>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AppError::Snapshot(format!("Failed to read movie table {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        AppError::Snapshot(format!("Failed to parse movie table {}: {}", path.display(), e))
    })
}

fn load_similarity(path: &Path) -> AppResult<SimilarityMatrix> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::Snapshot(format!(
            "Failed to read similarity matrix {}: {}",
            path.display(),
            e
        ))
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let rows: Vec<Vec<f32>> = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Snapshot(format!(
                "Failed to parse similarity matrix {}: {}",
                path.display(),
                e
            ))
        })?;
        SimilarityMatrix::from_rows(rows)
    } else {
        SimilarityMatrix::from_le_bytes(&bytes)
    }
}
