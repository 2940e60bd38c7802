/// TMDb (The Movie Database) provider
///
/// Every call goes through the shared rate limiter and is memoized in the
/// shared cache. Poster and logo paths are rewritten into absolute URLs using
/// the configured image base.
use std::sync::Arc;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    cache::{Cache, CacheKey},
    cached,
    config::Config,
    error::{AppError, AppResult},
    models::{
        ApiMovie, ApiMovieDetails, ApiPage, ApiPerson, ApiPersonCredits, ApiWatchProviders,
        MovieDetails, MovieId, MovieSummary, Page, PersonCredit, TimeWindow, WatchProviders,
    },
    services::providers::{MovieProvider, RateLimiter},
};

const DETAILS_APPEND: &str = "credits,videos,keywords";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_base_url: String,
    cache: Arc<Cache>,
    rate_limiter: Arc<RateLimiter>,
}

impl TmdbProvider {
    pub fn new(cache: Arc<Cache>, config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            image_base_url: config.tmdb_image_base_url.clone(),
            cache,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_interval())),
        })
    }

    /// Performs a rate-limited GET against the catalog and decodes the body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.api_url, endpoint);
        tracing::debug!(endpoint = %endpoint, "Calling TMDb");

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                endpoint = %endpoint,
                status = %status,
                body = %body,
                "TMDb request failed"
            );
            return Err(AppError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                endpoint = %endpoint,
                error = %e,
                "Failed to deserialize TMDb response"
            );
            AppError::MalformedResponse {
                endpoint: endpoint.to_string(),
                source: e,
            }
        })
    }

    fn summaries(&self, page: ApiPage<ApiMovie>) -> Page<MovieSummary> {
        page.into_page(|movie| movie.into_summary(&self.image_base_url))
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn search_movies(&self, query: &str, page: u32) -> AppResult<Page<MovieSummary>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::SearchMovies {
                query: query.to_string(),
                page,
            },
            async move {
                let results: ApiPage<ApiMovie> = self
                    .get_json(
                        "search/movie",
                        &[
                            ("query", query.to_string()),
                            ("page", page.to_string()),
                            ("include_adult", "false".to_string()),
                        ],
                    )
                    .await?;
                let movies = self.summaries(results);

                tracing::info!(
                    query = %query,
                    page = page,
                    results = movies.results.len(),
                    total_results = movies.total_results,
                    provider = "tmdb",
                    "Movie search completed"
                );

                Ok(movies)
            }
        )
    }

    async fn fetch_movie(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        cached!(self.cache, CacheKey::MovieDetails(movie_id), async move {
            let details: ApiMovieDetails = self
                .get_json(
                    &format!("movie/{}", movie_id),
                    &[("append_to_response", DETAILS_APPEND.to_string())],
                )
                .await?;
            let details = details.into_details(&self.image_base_url);

            tracing::info!(
                movie_id = movie_id,
                genres = details.summary.genre_ids.len(),
                keywords = details.summary.keyword_ids.len(),
                provider = "tmdb",
                "Movie details fetched"
            );

            Ok(details)
        })
    }

    async fn fetch_recommendations(
        &self,
        movie_id: MovieId,
        page: u32,
    ) -> AppResult<Vec<MovieSummary>> {
        cached!(
            self.cache,
            CacheKey::MovieRecommendations { movie_id, page },
            async move {
                let results: ApiPage<ApiMovie> = self
                    .get_json(
                        &format!("movie/{}/recommendations", movie_id),
                        &[("page", page.to_string())],
                    )
                    .await?;
                let movies = self.summaries(results).results;

                tracing::info!(
                    movie_id = movie_id,
                    results = movies.len(),
                    provider = "tmdb",
                    "Recommendations fetched"
                );

                Ok(movies)
            }
        )
    }

    async fn fetch_trending(&self, window: TimeWindow) -> AppResult<Page<MovieSummary>> {
        cached!(self.cache, CacheKey::Trending(window), async move {
            let results: ApiPage<ApiMovie> = self
                .get_json(&format!("trending/movie/{}", window), &[])
                .await?;
            let movies = self.summaries(results);

            tracing::info!(
                window = %window,
                results = movies.results.len(),
                provider = "tmdb",
                "Trending movies fetched"
            );

            Ok(movies)
        })
    }

    async fn fetch_watch_providers(&self, movie_id: MovieId) -> AppResult<WatchProviders> {
        cached!(self.cache, CacheKey::WatchProviders(movie_id), async move {
            let providers: ApiWatchProviders = self
                .get_json(&format!("movie/{}/watch/providers", movie_id), &[])
                .await?;
            let providers = providers.into_watch_providers(&self.image_base_url);

            tracing::info!(
                movie_id = movie_id,
                countries = providers.countries.len(),
                provider = "tmdb",
                "Watch providers fetched"
            );

            Ok(providers)
        })
    }

    async fn fetch_person_movies(&self, query: &str, page: u32) -> AppResult<Vec<PersonCredit>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Person query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::PersonMovies {
                query: query.to_string(),
                page,
            },
            async move {
                let people: ApiPage<ApiPerson> = self
                    .get_json(
                        "search/person",
                        &[("query", query.to_string()), ("page", page.to_string())],
                    )
                    .await?;

                let Some(person) = people.results.into_iter().next() else {
                    tracing::info!(query = %query, "No person matched");
                    return Ok(Vec::new());
                };

                let credits: ApiPersonCredits = self
                    .get_json(&format!("person/{}/movie_credits", person.id), &[])
                    .await?;
                let filmography = credits.into_filmography(&self.image_base_url);

                tracing::info!(
                    query = %query,
                    person_id = person.id,
                    person = %person.name,
                    movies = filmography.len(),
                    provider = "tmdb",
                    "Person filmography fetched"
                );

                Ok(filmography)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
