//! TMDB page payloads.

use serde::{Deserialize, Serialize};

/// Base URL for poster images.
const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// One page of movies, as returned by both search and recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MoviePage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

/// A movie summary.
///
/// TMDB returns many more fields; unknown ones are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Movie {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl Movie {
    /// Absolute poster URL, if the movie has one.
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path.as_ref().map(|path| format!("{IMAGE_BASE_URL}{path}"))
    }

    /// Release year parsed from `release_date` (`YYYY-MM-DD`).
    pub fn release_year(&self) -> Option<u16> {
        self.release_date.as_deref()?.get(..4)?.parse().ok()
    }
}

impl MoviePage {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
