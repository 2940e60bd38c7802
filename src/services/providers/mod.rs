/// Movie catalog provider abstraction
///
/// The recommendation engine and the HTTP handlers only see this trait, so the
/// catalog backing them can be swapped or stubbed out in tests.
use crate::{
    error::AppResult,
    models::{
        MovieDetails, MovieId, MovieSummary, Page, PersonCredit, TimeWindow, WatchProviders,
    },
};

pub mod rate_limit;
pub mod tmdb;

pub use rate_limit::RateLimiter;
pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
///
/// Implementations are expected to rate limit and memoize their own outbound
/// calls. A non-success answer from the catalog surfaces as
/// [`AppError::Provider`](crate::error::AppError::Provider); an empty result set
/// is not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Search movies by title, one page at a time
    async fn search_movies(&self, query: &str, page: u32) -> AppResult<Page<MovieSummary>>;

    /// Fetch a movie with its genres, keywords, credits and videos
    async fn fetch_movie(&self, movie_id: MovieId) -> AppResult<MovieDetails>;

    /// The catalog's own recommendation list for a movie
    async fn fetch_recommendations(
        &self,
        movie_id: MovieId,
        page: u32,
    ) -> AppResult<Vec<MovieSummary>>;

    /// First page of currently trending movies, in catalog order
    async fn fetch_trending(&self, window: TimeWindow) -> AppResult<Page<MovieSummary>>;

    /// Streaming, rental and purchase offers per country
    async fn fetch_watch_providers(&self, movie_id: MovieId) -> AppResult<WatchProviders>;

    /// Filmography of the best matching person, most popular first
    ///
    /// Returns an empty list when no person matches.
    async fn fetch_person_movies(&self, query: &str, page: u32) -> AppResult<Vec<PersonCredit>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
