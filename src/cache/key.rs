use sha2::{Digest, Sha256};
use std::fmt::Display;

use crate::models::{MovieId, TimeWindow};

/// Identity of a memoized operation together with all of its arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    SearchMovies { query: String, page: u32 },
    MovieDetails(MovieId),
    MovieRecommendations { movie_id: MovieId, page: u32 },
    Trending(TimeWindow),
    WatchProviders(MovieId),
    PersonMovies { query: String, page: u32 },
    Autocomplete(String),
    ContentBased { movie_id: MovieId, limit: usize },
    Hybrid { movie_ids: Vec<MovieId>, limit: usize },
    Fallback,
}

/// Arguments split the way the operation receives them
struct Arguments {
    positional: Vec<String>,
    named: Vec<(&'static str, String)>,
}

impl Arguments {
    fn positional(values: Vec<String>) -> Self {
        Self {
            positional: values,
            named: Vec::new(),
        }
    }

    fn with_named(mut self, name: &'static str, value: impl Display) -> Self {
        self.named.push((name, value.to_string()));
        self
    }
}

/// Free text is quoted so separators inside it cannot shift argument boundaries
fn text(value: &str) -> String {
    format!("{:?}", value.trim().to_lowercase())
}

impl CacheKey {
    pub fn operation(&self) -> &'static str {
        match self {
            CacheKey::SearchMovies { .. } => "search_movies",
            CacheKey::MovieDetails(_) => "movie_details",
            CacheKey::MovieRecommendations { .. } => "movie_recommendations",
            CacheKey::Trending(_) => "trending",
            CacheKey::WatchProviders(_) => "watch_providers",
            CacheKey::PersonMovies { .. } => "person_movies",
            CacheKey::Autocomplete(_) => "autocomplete",
            CacheKey::ContentBased { .. } => "content_based",
            CacheKey::Hybrid { .. } => "hybrid",
            CacheKey::Fallback => "fallback",
        }
    }

    fn arguments(&self) -> Arguments {
        match self {
            CacheKey::SearchMovies { query, page } | CacheKey::PersonMovies { query, page } => {
                Arguments::positional(vec![text(query), page.to_string()])
            }
            CacheKey::MovieDetails(id) | CacheKey::WatchProviders(id) => {
                Arguments::positional(vec![id.to_string()])
            }
            CacheKey::MovieRecommendations { movie_id, page } => {
                Arguments::positional(vec![movie_id.to_string(), page.to_string()])
            }
            CacheKey::Trending(window) => Arguments::positional(vec![window.to_string()]),
            CacheKey::Autocomplete(query) => Arguments::positional(vec![text(query)]),
            CacheKey::ContentBased { movie_id, limit } => {
                Arguments::positional(vec![movie_id.to_string()]).with_named("limit", limit)
            }
            CacheKey::Hybrid { movie_ids, limit } => {
                let ids: Vec<String> = movie_ids.iter().map(|id| id.to_string()).collect();
                Arguments::positional(vec![format!("[{}]", ids.join(","))])
                    .with_named("limit", limit)
            }
            CacheKey::Fallback => Arguments::positional(Vec::new()),
        }
    }

    /// Stable digest stored as the cache entry key
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Display for CacheKey {
    /// Canonical form: `operation(pos1,pos2;name_a=1,name_b=2)` with named
    /// arguments sorted by name
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Arguments {
            positional,
            mut named,
        } = self.arguments();
        named.sort_by(|a, b| a.0.cmp(b.0));

        write!(f, "{}({}", self.operation(), positional.join(","))?;
        if !named.is_empty() {
            let named: Vec<String> = named
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            write!(f, ";{}", named.join(","))?;
        }
        write!(f, ")")
    }
}
