use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::AppResult,
    models::{MovieId, MovieSummary, Recommendations, TimeWindow},
    services::providers::MovieProvider,
};

pub const DEFAULT_LIMIT: usize = 10;

/// Number of trending movies served when a recommendation request fails
pub const FALLBACK_SIZE: usize = 10;

const GENRE_WEIGHT: f64 = 2.0;
const KEYWORD_WEIGHT: f64 = 1.0;
const OCCURRENCE_WEIGHT: f64 = 3.0;
const CONTENT_POPULARITY_CAP: f64 = 1.0;
const HYBRID_POPULARITY_CAP: f64 = 0.5;

/// A candidate together with its ranking score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMovie {
    pub movie: MovieSummary,
    pub score: f64,
}

fn overlap(a: &BTreeSet<i64>, b: &BTreeSet<i64>) -> f64 {
    a.intersection(b).count() as f64
}

/// Rating contribution in `0.0..=1.0`
fn rating_signal(vote_average: Option<f64>) -> f64 {
    match vote_average {
        Some(v) if v.is_finite() && v > 0.0 => (v / 10.0).min(1.0),
        _ => 0.0,
    }
}

/// Popularity contribution in `0.0..=cap`
fn popularity_signal(popularity: Option<f64>, cap: f64) -> f64 {
    match popularity {
        Some(p) if p.is_finite() && p > 0.0 => (p / 100.0).min(cap),
        _ => 0.0,
    }
}

/// Highest scores first; equal scores keep their incoming order
fn top(mut scored: Vec<ScoredMovie>, limit: usize) -> Vec<MovieSummary> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.into_iter().take(limit).map(|s| s.movie).collect()
}

/// Genre-overlap score of a candidate against the seed.
///
/// Keyword overlap and the rating and popularity signals are added on top by
/// the caller.
pub fn content_score(seed_genres: &BTreeSet<i64>, candidate: &MovieSummary) -> f64 {
    GENRE_WEIGHT * overlap(seed_genres, &candidate.genre_ids)
}

/// Merges per-seed recommendation lists and scores each distinct movie by how
/// many seeds produced it, plus rating and (half-weighted) popularity.
///
/// Movies are returned in first-seen order, which is the tie-break for the
/// final sort.
pub fn merge_seed_results(per_seed: Vec<Vec<MovieSummary>>) -> Vec<ScoredMovie> {
    let mut merged: Vec<(MovieSummary, usize)> = Vec::new();
    let mut positions: HashMap<MovieId, usize> = HashMap::new();

    for movie in per_seed.into_iter().flatten() {
        match positions.get(&movie.id) {
            Some(&idx) => merged[idx].1 += 1,
            None => {
                positions.insert(movie.id, merged.len());
                merged.push((movie, 1));
            }
        }
    }

    merged
        .into_iter()
        .map(|(movie, occurrences)| {
            let score = occurrences as f64 * OCCURRENCE_WEIGHT
                + rating_signal(movie.vote_average)
                + popularity_signal(movie.popularity, HYBRID_POPULARITY_CAP);
            ScoredMovie { movie, score }
        })
        .collect()
}

/// Content-based and hybrid recommendation over a movie catalog
///
/// Cheap to clone; the provider and cache are shared.
#[derive(Clone)]
pub struct RecommendationEngine {
    provider: Arc<dyn MovieProvider>,
    cache: Arc<Cache>,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn MovieProvider>, cache: Arc<Cache>) -> Self {
        Self { provider, cache }
    }

    /// Ranks the catalog's recommendations for `movie_id` by similarity to it
    ///
    /// Any provider failure is returned to the caller.
    pub async fn content_based(
        &self,
        movie_id: MovieId,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        cached!(
            self.cache,
            CacheKey::ContentBased { movie_id, limit },
            async move { self.rank_content_based(movie_id, limit).await }
        )
    }

    async fn rank_content_based(
        &self,
        movie_id: MovieId,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let seed = self.provider.fetch_movie(movie_id).await?.summary;
        let candidates = self.provider.fetch_recommendations(movie_id, 1).await?;

        let mut scored = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            let mut score = content_score(&seed.genre_ids, &candidate);

            if !seed.keyword_ids.is_empty() && score > 0.0 {
                let details = self.provider.fetch_movie(candidate.id).await?;
                candidate.keyword_ids = details.summary.keyword_ids;
                score += KEYWORD_WEIGHT * overlap(&seed.keyword_ids, &candidate.keyword_ids);
            }

            score += rating_signal(candidate.vote_average)
                + popularity_signal(candidate.popularity, CONTENT_POPULARITY_CAP);

            scored.push(ScoredMovie {
                movie: candidate,
                score,
            });
        }

        tracing::info!(
            movie_id = movie_id,
            candidates = scored.len(),
            limit = limit,
            "Content-based recommendations ranked"
        );

        Ok(top(scored, limit))
    }

    /// Recommendations across several seeds, ranked by how many seeds agree
    ///
    /// Seeds are computed concurrently. A seed that fails is logged and
    /// skipped; if every seed fails the result is empty.
    pub async fn hybrid(
        &self,
        movie_ids: &[MovieId],
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        if movie_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        cached!(
            self.cache,
            CacheKey::Hybrid {
                movie_ids: movie_ids.to_vec(),
                limit,
            },
            async move { self.rank_hybrid(movie_ids, limit).await }
        )
    }

    async fn rank_hybrid(
        &self,
        movie_ids: &[MovieId],
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let mut tasks = Vec::with_capacity(movie_ids.len());
        for &movie_id in movie_ids {
            let engine = self.clone();
            let task = tokio::spawn(async move { engine.content_based(movie_id, limit).await });
            tasks.push((movie_id, task));
        }

        let mut per_seed = Vec::with_capacity(tasks.len());
        for (movie_id, task) in tasks {
            match task.await {
                Ok(Ok(movies)) => per_seed.push(movies),
                Ok(Err(e)) => {
                    tracing::warn!(
                        movie_id = movie_id,
                        error = %e,
                        "Skipping seed: recommendations failed"
                    );
                }
                Err(e) => {
                    tracing::error!(movie_id = movie_id, error = %e, "Seed task join error");
                }
            }
        }

        if per_seed.is_empty() {
            tracing::warn!(seeds = movie_ids.len(), "No seed produced recommendations");
        }

        Ok(top(merge_seed_results(per_seed), limit))
    }

    /// Current weekly trending movies in catalog order, unscored
    pub async fn fallback(&self) -> AppResult<Vec<MovieSummary>> {
        cached!(self.cache, CacheKey::Fallback, async move {
            let mut trending = self.provider.fetch_trending(TimeWindow::Week).await?.results;
            trending.truncate(FALLBACK_SIZE);
            Ok(trending)
        })
    }

    /// Wraps a recommendation result, substituting the fallback list on failure
    ///
    /// If the fallback itself fails, that error is returned.
    pub async fn or_fallback(
        &self,
        primary: AppResult<Vec<MovieSummary>>,
    ) -> AppResult<Recommendations> {
        match primary {
            Ok(results) => Ok(Recommendations::primary(results)),
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation failed, serving trending fallback");
                let results = self.fallback().await?;
                Ok(Recommendations {
                    results,
                    fallback: true,
                    error: Some(e.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{Credits, MovieDetails, Page},
        services::providers::MockMovieProvider,
    };
    use mockall::predicate::eq;
    use std::time::Duration;

    fn movie(id: MovieId, genres: &[i64], vote: Option<f64>, popularity: Option<f64>) -> MovieSummary {
        MovieSummary {
            id,
            title: format!("Movie {}", id),
            release_date: None,
            genre_ids: genres.iter().copied().collect(),
            keyword_ids: BTreeSet::new(),
            vote_average: vote,
            popularity,
            poster_url: None,
            overview: None,
        }
    }

    fn details(summary: MovieSummary, keywords: &[i64]) -> MovieDetails {
        let mut summary = summary;
        summary.keyword_ids = keywords.iter().copied().collect();
        MovieDetails {
            summary,
            tagline: None,
            runtime: None,
            backdrop_path: None,
            genres: Vec::new(),
            keywords: Vec::new(),
            credits: Credits::default(),
            videos: Vec::new(),
        }
    }

    fn engine(provider: MockMovieProvider) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(provider),
            Arc::new(Cache::new(100, Duration::from_secs(60))),
        )
    }

    fn ids(movies: &[MovieSummary]) -> Vec<MovieId> {
        movies.iter().map(|m| m.id).collect()
    }

    fn provider_error() -> AppError {
        AppError::Provider {
            status: 404,
            message: "The resource you requested could not be found.".to_string(),
        }
    }

    #[test]
    fn test_signals_are_bounded_and_ignore_invalid_values() {
        assert_eq!(rating_signal(Some(8.0)), 0.8);
        assert_eq!(rating_signal(None), 0.0);
        assert_eq!(rating_signal(Some(f64::NAN)), 0.0);
        assert_eq!(rating_signal(Some(-3.0)), 0.0);
        assert_eq!(popularity_signal(Some(50.0), 1.0), 0.5);
        assert_eq!(popularity_signal(Some(500.0), 1.0), 1.0);
        assert_eq!(popularity_signal(Some(500.0), 0.5), 0.5);
        assert_eq!(popularity_signal(Some(f64::INFINITY), 1.0), 0.0);
    }

    #[test]
    fn test_content_score_counts_only_genre_overlap() {
        let seed = BTreeSet::from([28, 12, 878]);
        let candidate = movie(1, &[28, 12, 35], Some(9.0), Some(300.0));
        assert_eq!(content_score(&seed, &candidate), 4.0);
        assert_eq!(content_score(&BTreeSet::new(), &candidate), 0.0);
    }

    #[tokio::test]
    async fn test_more_shared_genres_rank_first() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(details(movie(1, &[28, 12], None, None), &[])));
        provider
            .expect_fetch_recommendations()
            .with(eq(1), eq(1))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    // A: 2 + 0.8 + 0.5 = 3.3
                    movie(100, &[28], Some(8.0), Some(50.0)),
                    // B: 4 + 0.5 + 0.1 = 4.6
                    movie(200, &[28, 12], Some(5.0), Some(10.0)),
                ])
            });

        let results = engine(provider).content_based(1, 10).await.unwrap();
        assert_eq!(ids(&results), vec![200, 100]);
    }

    #[tokio::test]
    async fn test_keyword_overlap_uses_candidate_details() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(details(movie(1, &[18], None, None), &[7, 8, 9])));
        provider
            .expect_fetch_recommendations()
            .returning(|_, _| {
                Ok(vec![
                    movie(10, &[18], None, None),
                    movie(20, &[18], None, None),
                    // No genre overlap: its details are never requested
                    movie(30, &[35], Some(9.0), Some(100.0)),
                ])
            });
        provider
            .expect_fetch_movie()
            .with(eq(10))
            .times(1)
            .returning(|_| Ok(details(movie(10, &[18], None, None), &[1])));
        provider
            .expect_fetch_movie()
            .with(eq(20))
            .times(1)
            .returning(|_| Ok(details(movie(20, &[18], None, None), &[7, 8])));

        let results = engine(provider).content_based(1, 10).await.unwrap();

        assert_eq!(ids(&results), vec![20, 10, 30]);
        assert_eq!(results[0].keyword_ids, BTreeSet::from([7, 8]));
        assert!(results[2].keyword_ids.is_empty());
    }

    #[tokio::test]
    async fn test_seed_without_keywords_skips_detail_fetches() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(details(movie(1, &[18], None, None), &[])));
        provider
            .expect_fetch_recommendations()
            .returning(|_, _| Ok(vec![movie(10, &[18], None, None)]));

        let results = engine(provider).content_based(1, 10).await.unwrap();
        assert_eq!(ids(&results), vec![10]);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_provider_order() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .returning(|_| Ok(details(movie(1, &[18], None, None), &[])));
        provider.expect_fetch_recommendations().returning(|_, _| {
            Ok(vec![
                movie(3, &[18], Some(7.0), None),
                movie(1, &[18], Some(7.0), None),
                movie(2, &[18], Some(7.0), None),
            ])
        });

        let results = engine(provider).content_based(1, 10).await.unwrap();
        assert_eq!(ids(&results), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_content_based_truncates_to_limit() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .returning(|_| Ok(details(movie(1, &[], None, None), &[])));
        provider.expect_fetch_recommendations().returning(|_, _| {
            Ok((1..=20)
                .map(|id| movie(id, &[], Some(id as f64 / 4.0), None))
                .collect())
        });

        let results = engine(provider).content_based(1, 3).await.unwrap();
        assert_eq!(ids(&results), vec![20, 19, 18]);
    }

    #[tokio::test]
    async fn test_content_based_propagates_provider_error() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .returning(|_| Ok(details(movie(1, &[18], None, None), &[])));
        provider
            .expect_fetch_recommendations()
            .returning(|_, _| Err(provider_error()));

        let err = engine(provider).content_based(1, 10).await.unwrap_err();
        assert!(matches!(err, AppError::Provider { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_content_based_results_are_memoized() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .times(1)
            .returning(|_| Ok(details(movie(1, &[], None, None), &[])));
        provider
            .expect_fetch_recommendations()
            .times(1)
            .returning(|_, _| Ok(vec![movie(5, &[], None, None)]));

        let engine = engine(provider);
        let first = engine.content_based(1, 10).await.unwrap();
        let second = engine.content_based(1, 10).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_hybrid_with_no_seeds_makes_no_fetch() {
        // Any provider call on a bare mock panics
        let provider = MockMovieProvider::new();
        let results = engine(provider).hybrid(&[], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_merge_counts_occurrences_across_seeds() {
        let shared = movie(42, &[], None, None);
        let merged = merge_seed_results(vec![
            vec![shared.clone(), movie(7, &[], None, None)],
            vec![shared],
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].movie.id, 42);
        assert_eq!(merged[0].score, 6.0);
        assert_eq!(merged[1].score, 3.0);
    }

    #[test]
    fn test_merge_caps_popularity_at_half() {
        let merged = merge_seed_results(vec![vec![movie(1, &[], Some(9.0), Some(400.0))]]);
        // 3 + 0.9 + 0.5
        assert!((merged[0].score - 4.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_hybrid_ranks_by_agreement_between_seeds() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .returning(|id| Ok(details(movie(id, &[], None, None), &[])));
        provider
            .expect_fetch_recommendations()
            .with(eq(1), eq(1))
            .returning(|_, _| {
                Ok(vec![
                    movie(100, &[], Some(9.9), Some(99.0)),
                    movie(42, &[], Some(5.0), None),
                ])
            });
        provider
            .expect_fetch_recommendations()
            .with(eq(2), eq(1))
            .returning(|_, _| Ok(vec![movie(42, &[], Some(5.0), None)]));

        let results = engine(provider).hybrid(&[1, 2], 10).await.unwrap();
        assert_eq!(ids(&results), vec![42, 100]);
    }

    #[tokio::test]
    async fn test_hybrid_skips_failing_seed() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .with(eq(1))
            .returning(|id| Ok(details(movie(id, &[], None, None), &[])));
        provider
            .expect_fetch_movie()
            .with(eq(999))
            .returning(|_| Err(provider_error()));
        provider
            .expect_fetch_recommendations()
            .with(eq(1), eq(1))
            .returning(|_, _| Ok(vec![movie(5, &[], None, None)]));

        let results = engine(provider).hybrid(&[999, 1], 10).await.unwrap();
        assert_eq!(ids(&results), vec![5]);
    }

    #[tokio::test]
    async fn test_hybrid_all_seeds_failing_is_empty_not_error() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_movie()
            .returning(|_| Err(provider_error()));

        let results = engine(provider).hybrid(&[1, 2, 3], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_returns_first_ten_trending_in_order() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_trending()
            .with(eq(TimeWindow::Week))
            .times(1)
            .returning(|_| {
                Ok(Page::single(
                    (1..=15)
                        .map(|id| movie(id, &[], Some(15.0 - id as f64), None))
                        .collect(),
                ))
            });

        let results = engine(provider).fallback().await.unwrap();
        assert_eq!(ids(&results), (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fallback_with_short_trending_list() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_trending()
            .returning(|_| {
                Ok(Page::single(vec![
                    movie(1, &[], None, None),
                    movie(2, &[], None, None),
                ]))
            });

        let results = engine(provider).fallback().await.unwrap();
        assert_eq!(ids(&results), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_or_fallback_marks_substituted_results() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_fetch_trending()
            .returning(|_| Ok(Page::single(vec![movie(77, &[], None, None)])));

        let engine = engine(provider);
        let response = engine.or_fallback(Err(provider_error())).await.unwrap();

        assert!(response.fallback);
        assert_eq!(ids(&response.results), vec![77]);
        assert!(response.error.unwrap().contains("could not be found"));
    }

    #[tokio::test]
    async fn test_or_fallback_passes_success_through() {
        let provider = MockMovieProvider::new();
        let response = engine(provider)
            .or_fallback(Ok(vec![movie(1, &[], None, None)]))
            .await
            .unwrap();

        assert!(!response.fallback);
        assert_eq!(response.error, None);
    }
}
