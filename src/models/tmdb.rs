//! Raw TMDb payloads and their normalization into domain records.
//!
//! `id` and `title` are required on every movie payload; anything else the
//! catalog may omit is optional and defaults to empty.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::{
    AvailabilityType, CastMember, CountryProviders, Credits, CrewMember, Genre, Keyword,
    MovieDetails, MovieSummary, Page, PersonCredit, ProviderOffer, Role, Video, WatchProviders,
};

/// Number of billed cast members kept on a movie's details
const TOP_BILLED_CAST: usize = 20;

/// Builds an absolute image URL from a catalog path
pub fn image_url(image_base_url: &str, path: Option<&str>) -> Option<String> {
    match path {
        Some(path) if !path.trim().is_empty() => Some(format!("{}{}", image_base_url, path)),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A paginated list response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl<T> ApiPage<T> {
    /// Converts every result, keeping the paging counters
    pub fn into_page<U>(self, convert: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            results: self.results.into_iter().map(convert).collect(),
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

/// Movie as it appears in search, recommendation and trending lists
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl ApiMovie {
    pub fn into_summary(self, image_base_url: &str) -> MovieSummary {
        MovieSummary {
            id: self.id,
            poster_url: image_url(image_base_url, self.poster_path.as_deref()),
            title: self.title,
            release_date: non_empty(self.release_date),
            genre_ids: self.genre_ids.into_iter().collect(),
            keyword_ids: Default::default(),
            vote_average: self.vote_average,
            popularity: self.popularity,
            overview: non_empty(self.overview),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyword {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeywords {
    #[serde(default)]
    pub keywords: Vec<ApiKeyword>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCast {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCrew {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCredits {
    #[serde(default)]
    pub cast: Vec<ApiCast>,
    #[serde(default)]
    pub crew: Vec<ApiCrew>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideo {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiVideos {
    #[serde(default)]
    pub results: Vec<ApiVideo>,
}

/// Response of `movie/{id}?append_to_response=credits,videos,keywords`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub keywords: ApiKeywords,
    #[serde(default)]
    pub credits: ApiCredits,
    #[serde(default)]
    pub videos: ApiVideos,
}

impl ApiMovieDetails {
    pub fn into_details(self, image_base_url: &str) -> MovieDetails {
        let summary = MovieSummary {
            id: self.id,
            title: self.title,
            release_date: non_empty(self.release_date),
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
            keyword_ids: self.keywords.keywords.iter().map(|k| k.id).collect(),
            vote_average: self.vote_average,
            popularity: self.popularity,
            poster_url: image_url(image_base_url, self.poster_path.as_deref()),
            overview: non_empty(self.overview),
        };

        let mut cast = self.credits.cast;
        cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));

        MovieDetails {
            summary,
            tagline: non_empty(self.tagline),
            runtime: self.runtime,
            backdrop_path: non_empty(self.backdrop_path),
            genres: self
                .genres
                .into_iter()
                .map(|g| Genre {
                    id: g.id,
                    name: g.name,
                })
                .collect(),
            keywords: self
                .keywords
                .keywords
                .into_iter()
                .map(|k| Keyword {
                    id: k.id,
                    name: k.name,
                })
                .collect(),
            credits: Credits {
                cast: cast
                    .into_iter()
                    .take(TOP_BILLED_CAST)
                    .map(|c| {
                        let profile_path = non_empty(c.profile_path);
                        CastMember {
                            id: c.id,
                            name: c.name,
                            character: non_empty(c.character),
                            order: c.order,
                            profile_url: image_url(image_base_url, profile_path.as_deref()),
                            profile_path,
                        }
                    })
                    .collect(),
                crew: self
                    .credits
                    .crew
                    .into_iter()
                    .map(|c| CrewMember {
                        id: c.id,
                        name: c.name,
                        job: c.job,
                        department: c.department,
                    })
                    .collect(),
            },
            videos: self
                .videos
                .results
                .into_iter()
                .map(|v| Video {
                    key: v.key,
                    name: v.name,
                    site: v.site,
                    video_type: v.video_type,
                })
                .collect(),
        }
    }
}

/// Person as returned by `search/person`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPerson {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCastCredit {
    #[serde(flatten)]
    pub movie: ApiMovie,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCrewCredit {
    #[serde(flatten)]
    pub movie: ApiMovie,
    #[serde(default)]
    pub job: Option<String>,
}

/// Response of `person/{id}/movie_credits`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPersonCredits {
    #[serde(default)]
    pub cast: Vec<ApiCastCredit>,
    #[serde(default)]
    pub crew: Vec<ApiCrewCredit>,
}

impl ApiPersonCredits {
    /// Combined filmography, one entry per movie, most popular first.
    ///
    /// When a movie appears several times the first occurrence wins, and cast
    /// credits are visited before crew credits.
    pub fn into_filmography(self, image_base_url: &str) -> Vec<PersonCredit> {
        let cast = self.cast.into_iter().map(|c| PersonCredit {
            movie: c.movie.into_summary(image_base_url),
            role: Role::Cast {
                character: non_empty(c.character),
            },
        });
        let crew = self.crew.into_iter().map(|c| PersonCredit {
            movie: c.movie.into_summary(image_base_url),
            role: Role::Crew {
                job: non_empty(c.job),
            },
        });

        let mut seen = std::collections::HashSet::new();
        let mut credits: Vec<PersonCredit> = cast
            .chain(crew)
            .filter(|credit| seen.insert(credit.movie.id))
            .collect();

        credits.sort_by(|a, b| {
            let pa = a.movie.popularity.unwrap_or(0.0);
            let pb = b.movie.popularity.unwrap_or(0.0);
            pb.total_cmp(&pa)
        });

        credits
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiWatchProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCountryProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<ApiWatchProvider>,
    #[serde(default)]
    pub rent: Vec<ApiWatchProvider>,
    #[serde(default)]
    pub buy: Vec<ApiWatchProvider>,
    #[serde(default)]
    pub free: Vec<ApiWatchProvider>,
    #[serde(default)]
    pub ads: Vec<ApiWatchProvider>,
}

/// Response of `movie/{id}/watch/providers`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiWatchProviders {
    pub id: i64,
    #[serde(default)]
    pub results: HashMap<String, ApiCountryProviders>,
}

impl ApiWatchProviders {
    pub fn into_watch_providers(self, image_base_url: &str) -> WatchProviders {
        let countries: BTreeMap<String, CountryProviders> = self
            .results
            .into_iter()
            .map(|(country, providers)| {
                let groups = [
                    (AvailabilityType::Subscription, providers.flatrate),
                    (AvailabilityType::Rent, providers.rent),
                    (AvailabilityType::Buy, providers.buy),
                    (AvailabilityType::Free, providers.free),
                    (AvailabilityType::Ads, providers.ads),
                ];

                let offers = groups
                    .into_iter()
                    .flat_map(|(availability_type, list)| {
                        list.into_iter().map(move |p| (availability_type, p))
                    })
                    .map(|(availability_type, p)| ProviderOffer {
                        provider_id: p.provider_id,
                        provider_name: p.provider_name,
                        logo_url: image_url(image_base_url, p.logo_path.as_deref()),
                        availability_type,
                    })
                    .collect();

                (
                    country,
                    CountryProviders {
                        link: providers.link,
                        offers,
                    },
                )
            })
            .collect();

        WatchProviders {
            movie_id: self.id,
            countries,
        }
    }
}
