use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::AppResult,
    models::Suggestion,
    services::providers::MovieProvider,
};

/// Shortest query that triggers a catalog lookup
pub const MIN_AUTOCOMPLETE_CHARS: usize = 2;

/// Maximum number of suggestions returned
pub const MAX_SUGGESTIONS: usize = 10;

/// Type-ahead suggestions for a partial title
///
/// Short queries return nothing without touching the provider. Otherwise the
/// first page of search results is reduced to compact suggestions.
pub async fn autocomplete(
    provider: &dyn MovieProvider,
    cache: &Cache,
    query: &str,
) -> AppResult<Vec<Suggestion>> {
    let query = query.trim();
    if query.chars().count() < MIN_AUTOCOMPLETE_CHARS {
        return Ok(Vec::new());
    }

    cached!(cache, CacheKey::Autocomplete(query.to_string()), async move {
        let movies = provider.search_movies(query, 1).await?.results;
        Ok(movies
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(Suggestion::from)
            .collect())
    })
}
