//! TMDB movie catalog client.
//!
//! Catalog calls are ordinary page fetches: they go through the active worker
//! so that a previously seen search or recommendation list is answered from
//! the dynamic partition when the network is gone.
//!
//! ### Endpoints
//!
//! - **Search**: `GET {base}/search/movie?api_key=..&query=..`
//! - **Recommendations**: `GET {base}/movie/{id}/recommendations?api_key=..`
//! - **Authentication**: `api_key` query parameter.
//! - **Payload**: a page object (`page`, `results[]`, `total_pages`, `total_results`).

pub mod error;
pub mod response;

pub use error::CatalogError;
pub use response::{Movie, MoviePage};

use std::time::Instant;

use cinecache_core::{AppConfig, FetchEvent, Registration, Request, Response, ResponseSource};
use url::Url;

/// Default base URL for the TMDB v3 API.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Catalog client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// API key from CINECACHE_TMDB_API_KEY.
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { api_key: String::new(), base_url: DEFAULT_BASE_URL.to_string() }
    }
}

impl CatalogConfig {
    /// Take the key and base URL from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let api_key = config.tmdb_api_key.clone().ok_or(CatalogError::MissingApiKey)?;
        Ok(Self { api_key, base_url: config.tmdb_base_url.clone() })
    }
}

/// A parsed page and where the worker found it.
#[derive(Debug, Clone)]
pub struct CatalogResponse {
    pub page: MoviePage,
    pub source: ResponseSource,
}

/// TMDB catalog client.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        if config.api_key.is_empty() {
            return Err(CatalogError::MissingApiKey);
        }
        Url::parse(&config.base_url).map_err(|e| CatalogError::InvalidQuery(format!("base URL: {e}")))?;

        Ok(Self { config })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url =
            Url::parse(&format!("{base}{path}")).map_err(|e| CatalogError::InvalidQuery(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("api_key", &self.config.api_key)
            .extend_pairs(params);

        Ok(url)
    }

    /// The request a search for `keyword` issues.
    pub fn search_request(&self, keyword: &str) -> Result<Request, CatalogError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CatalogError::InvalidQuery("keyword cannot be empty".to_string()));
        }

        Ok(Request::get(self.endpoint("/search/movie", &[("query", keyword)])?))
    }

    /// The request for movies similar to `movie_id`.
    pub fn recommendations_request(&self, movie_id: u64) -> Result<Request, CatalogError> {
        Ok(Request::get(self.endpoint(&format!("/movie/{movie_id}/recommendations"), &[])?))
    }

    /// Search movies by keyword through the registration's active worker.
    pub async fn search(&self, registration: &Registration, keyword: &str) -> Result<CatalogResponse, CatalogError> {
        tracing::debug!("searching catalog: keyword={}", keyword.trim());
        self.resolve(registration, self.search_request(keyword)?).await
    }

    /// Fetch recommendations for a movie through the registration's active worker.
    pub async fn recommendations(
        &self, registration: &Registration, movie_id: u64,
    ) -> Result<CatalogResponse, CatalogError> {
        tracing::debug!("fetching recommendations: movie_id={}", movie_id);
        self.resolve(registration, self.recommendations_request(movie_id)?).await
    }

    async fn resolve(&self, registration: &Registration, request: Request) -> Result<CatalogResponse, CatalogError> {
        let start = Instant::now();
        let served = registration.fetch(FetchEvent::new(request)).await?;

        let page = parse_page(&served.response)?;

        tracing::debug!(
            "catalog page resolved in {:?} from {:?}, {} results",
            start.elapsed(),
            served.source,
            page.results.len()
        );

        Ok(CatalogResponse { page, source: served.source })
    }
}

/// Map an HTTP answer from TMDB to a page.
pub fn parse_page(response: &Response) -> Result<MoviePage, CatalogError> {
    match response.status {
        401 | 403 => return Err(CatalogError::AuthError),
        status if !response.ok() => return Err(CatalogError::HttpError { status }),
        _ => {}
    }

    serde_json::from_slice(&response.body).map_err(|e| CatalogError::Parse(e.to_string()))
}
