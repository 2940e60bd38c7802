use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    cache::CacheStats,
    error::{AppError, AppResult},
    models::{
        MovieDetails, MovieId, MovieSummary, Page, PersonCredit, Recommendations, Suggestion,
        TimeWindow, WatchProviders,
    },
    services::{movie_search, recommendations::DEFAULT_LIMIT},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<u32>,
}

impl SearchParams {
    /// The trimmed query, rejecting a missing or blank one
    fn required_query(&self) -> AppResult<&str> {
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => Ok(query),
            _ => Err(AppError::InvalidInput(
                "Query parameter is required".to_string(),
            )),
        }
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub results: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HybridParams {
    pub movie_ids: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub time_window: Option<String>,
}

/// Parses a comma separated id list, dropping entries that are not integers
pub fn parse_movie_ids(raw: &str) -> Vec<MovieId> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "provider": state.provider.name(),
        "cache": state.cache.stats(),
    }))
}

/// Search movies by title
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Page<MovieSummary>>> {
    let query = params.required_query()?;
    let results = state.provider.search_movies(query, params.page()).await?;
    Ok(Json(results))
}

/// Type-ahead suggestions
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> AppResult<Json<SuggestionsResponse>> {
    let query = params.query.unwrap_or_default();
    let results =
        movie_search::autocomplete(state.provider.as_ref(), &state.cache, &query).await?;
    Ok(Json(SuggestionsResponse { results }))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    let movie = state.provider.fetch_movie(movie_id).await?;
    Ok(Json(movie))
}

pub async fn get_watch_providers(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<WatchProviders>> {
    let providers = state.provider.fetch_watch_providers(movie_id).await?;
    Ok(Json(providers))
}

/// Filmography of the best matching person
///
/// `page` selects the person search page; the filmography itself is served
/// whole as a single page.
pub async fn person_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Page<PersonCredit>>> {
    let query = params.required_query()?;
    let results = state.provider.fetch_person_movies(query, params.page()).await?;
    Ok(Json(Page::single(results)))
}

/// Content-based recommendations for one movie, or trending on failure
pub async fn movie_recommendations(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<Recommendations>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let primary = state.engine.content_based(movie_id, limit).await;
    let response = state.engine.or_fallback(primary).await?;
    Ok(Json(response))
}

/// Recommendations across several seed movies, or trending on failure
pub async fn hybrid_recommendations(
    State(state): State<AppState>,
    Query(params): Query<HybridParams>,
) -> AppResult<Json<Recommendations>> {
    let raw = params
        .movie_ids
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("movie_ids parameter is required".to_string()))?;

    let movie_ids = parse_movie_ids(&raw);
    if movie_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "No valid movie IDs provided".to_string(),
        ));
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let primary = state.engine.hybrid(&movie_ids, limit).await;
    let response = state.engine.or_fallback(primary).await?;
    Ok(Json(response))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> AppResult<Json<Page<MovieSummary>>> {
    let window = params
        .time_window
        .as_deref()
        .map(TimeWindow::parse_lossy)
        .unwrap_or_default();
    let results = state.provider.fetch_trending(window).await?;
    Ok(Json(results))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

pub async fn clear_cache(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    state.cache.clear();

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Cache cleared successfully",
            "cache": state.cache.stats(),
        })),
    )
}
