use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

pub mod tmdb;

pub use tmdb::*;

/// Catalog identifier of a movie
pub type MovieId = i64;

/// A movie as returned to clients and consumed by the recommendation engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: BTreeSet<i64>,
    /// Only known once the movie's details have been fetched
    #[serde(default)]
    pub keyword_ids: BTreeSet<i64>,
    pub vote_average: Option<f64>,
    pub popularity: Option<f64>,
    pub poster_url: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// One page of a catalog listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl<T> Page<T> {
    /// A complete listing served as a single page
    pub fn single(results: Vec<T>) -> Self {
        Self {
            page: 1,
            total_pages: 1,
            total_results: results.len() as u32,
            results,
        }
    }
}

/// Full movie record: the summary plus credits, keywords and videos
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub tagline: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<Keyword>,
    pub credits: Credits,
    pub videos: Vec<Video>,
}

/// Top-billed cast and the full crew
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub order: Option<u32>,
    /// Catalog-relative path, for clients choosing their own image size
    pub profile_path: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

/// What a person did on a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    Cast { character: Option<String> },
    Crew { job: Option<String> },
}

/// One entry of a person's filmography
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonCredit {
    #[serde(flatten)]
    pub movie: MovieSummary,
    #[serde(flatten)]
    pub role: Role,
}

/// Trending window accepted by the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    /// Parses a user supplied window; anything unrecognised means `Week`
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "day" => TimeWindow::Day,
            _ => TimeWindow::Week,
        }
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::Day => write!(f, "day"),
            TimeWindow::Week => write!(f, "week"),
        }
    }
}

/// Compact search hit used for type-ahead
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: MovieId,
    pub title: String,
    pub year: String,
    pub poster_url: Option<String>,
}

impl From<&MovieSummary> for Suggestion {
    fn from(movie: &MovieSummary) -> Self {
        let year = movie
            .release_date
            .as_deref()
            .map(|date| date.chars().take(4).collect())
            .unwrap_or_default();

        Self {
            id: movie.id,
            title: movie.title.clone(),
            year,
            poster_url: movie.poster_url.clone(),
        }
    }
}

/// Where a movie can be watched, keyed by ISO 3166-1 country code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProviders {
    pub movie_id: MovieId,
    pub countries: BTreeMap<String, CountryProviders>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryProviders {
    pub link: Option<String>,
    pub offers: Vec<ProviderOffer>,
}

/// A single streaming offer for one service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderOffer {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_url: Option<String>,
    pub availability_type: AvailabilityType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityType {
    Subscription,
    Rent,
    Buy,
    Free,
    Ads,
}

/// Ranked movie list returned by the recommendation endpoints
///
/// `fallback` is set when the requested computation failed and trending movies
/// were substituted; `error` then carries the original failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub results: Vec<MovieSummary>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Recommendations {
    pub fn primary(results: Vec<MovieSummary>) -> Self {
        Self {
            results,
            fallback: false,
            error: None,
        }
    }
}
