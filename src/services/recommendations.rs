use std::cmp::Ordering;

use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::Recommendation,
};

/// Returns the `n` movies most similar to `title`
///
/// Rows are ranked by descending similarity to the queried movie. Equal scores
/// keep table order, and the queried row itself is removed by index, so a
/// different movie tying with the self-similarity cannot displace it into the
/// results or push a real match out.
pub fn recommend(store: &MovieStore, title: &str, n: usize) -> AppResult<Vec<Recommendation>> {
    if n == 0 {
        return Err(AppError::InvalidInput(
            "Number of recommendations must be at least 1".to_string(),
        ));
    }

    let query = store
        .find_by_title(title)
        .ok_or_else(|| AppError::NotFound(format!("Movie '{}' not found", title)))?;

    let row = store.similarity().row(query.row_index).ok_or_else(|| {
        AppError::Internal(format!(
            "No similarity row for '{}' at index {}",
            title, query.row_index
        ))
    })?;

    let mut ranked: Vec<(usize, f32)> = row.iter().copied().enumerate().collect();
    // Stable: ties stay in row order. Scores are finite, and numeric
    // comparison treats -0.0 and 0.0 as equal.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let recommendations: Vec<Recommendation> = ranked
        .into_iter()
        .filter(|&(row_index, _)| row_index != query.row_index)
        .take(n)
        .filter_map(|(row_index, score)| {
            store.movie(row_index).map(|movie| Recommendation {
                movie: movie.clone(),
                score,
            })
        })
        .collect();

    tracing::debug!(
        title = %title,
        row_index = query.row_index,
        requested = n,
        returned = recommendations.len(),
        "Recommendations ranked"
    );

    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::SimilarityMatrix, models::MovieRecord};

    fn store(titles: &[&str], rows: Vec<Vec<f32>>) -> MovieStore {
        let records = titles
            .iter()
            .enumerate()
            .map(|(i, title)| MovieRecord {
                movie_id: 1000 + i as u64,
                title: title.to_string(),
            })
            .collect();
        MovieStore::new(records, SimilarityMatrix::from_rows(rows).unwrap()).unwrap()
    }

    fn abcd() -> MovieStore {
        store(
            &["A", "B", "C", "D"],
            vec![
                vec![1.0, 0.8, 0.3, 0.5],
                vec![0.8, 1.0, 0.2, 0.4],
                vec![0.3, 0.2, 1.0, 0.6],
                vec![0.5, 0.4, 0.6, 1.0],
            ],
        )
    }

    fn titles(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations
            .iter()
            .map(|r| r.movie.title.as_str())
            .collect()
    }

    #[test]
    fn test_recommend_orders_by_descending_score() {
        let store = abcd();
        let result = recommend(&store, "A", 2).unwrap();

        assert_eq!(titles(&result), vec!["B", "D"]);
        assert_eq!(result[0].movie.movie_id, 1001);
        assert_eq!(result[0].score, 0.8);
        assert_eq!(result[1].score, 0.5);
    }

    #[test]
    fn test_recommend_scores_non_increasing() {
        let store = abcd();
        for title in ["A", "B", "C", "D"] {
            let result = recommend(&store, title, 3).unwrap();
            assert_eq!(result.len(), 3);
            assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_recommend_excludes_queried_movie() {
        let store = abcd();
        for title in ["A", "B", "C", "D"] {
            let result = recommend(&store, title, 3).unwrap();
            assert!(result.iter().all(|r| r.movie.title != title));
        }
    }

    #[test]
    fn test_recommend_returns_all_others_when_n_too_large() {
        let store = abcd();
        let result = recommend(&store, "C", 10).unwrap();
        assert_eq!(titles(&result), vec!["D", "A", "B"]);
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let store = abcd();
        let first = recommend(&store, "D", 3).unwrap();
        let second = recommend(&store, "D", 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_recommend_ties_keep_row_order() {
        let store = store(
            &["Q", "X", "Y", "Z"],
            vec![
                vec![1.0, 0.5, 0.7, 0.5],
                vec![0.5, 1.0, 0.0, 0.0],
                vec![0.7, 0.0, 1.0, 0.0],
                vec![0.5, 0.0, 0.0, 1.0],
            ],
        );
        let result = recommend(&store, "Q", 3).unwrap();
        assert_eq!(titles(&result), vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_recommend_signed_zero_scores_keep_row_order() {
        let store = store(
            &["Q", "NegZero", "PosZero"],
            vec![
                vec![1.0, -0.0, 0.0],
                vec![-0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        );
        let result = recommend(&store, "Q", 2).unwrap();
        assert_eq!(titles(&result), vec!["NegZero", "PosZero"]);
    }

    #[test]
    fn test_recommend_excludes_self_when_another_row_ties_at_max() {
        // "Dup" sits before "Q" and ties with Q's self-similarity
        let store = store(
            &["Dup", "Q", "Other"],
            vec![
                vec![1.0, 1.0, 0.1],
                vec![1.0, 1.0, 0.2],
                vec![0.1, 0.2, 1.0],
            ],
        );
        let result = recommend(&store, "Q", 2).unwrap();
        assert_eq!(titles(&result), vec!["Dup", "Other"]);
    }

    #[test]
    fn test_recommend_unknown_title_is_not_found() {
        let store = abcd();
        let result = recommend(&store, "Nope", 2);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_recommend_zero_is_invalid() {
        let store = abcd();
        let result = recommend(&store, "A", 0);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_recommend_single_movie_table_is_empty() {
        let store = store(&["Only"], vec![vec![1.0]]);
        let result = recommend(&store, "Only", 5).unwrap();
        assert!(result.is_empty());
    }
}
