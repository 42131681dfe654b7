//! Catalog client error types.

use cinecache_core::NetworkError;

/// Errors from the TMDB catalog client.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Missing CINECACHE_TMDB_API_KEY.
    #[error("missing API key: CINECACHE_TMDB_API_KEY not set")]
    MissingApiKey,

    /// Empty keyword or otherwise unusable query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Neither the network nor any cache could answer.
    #[error("network error: {0}")]
    Network(NetworkError),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// The worker failed for a reason other than connectivity.
    #[error("worker error: {0}")]
    Worker(String),
}

impl CatalogError {
    /// True when the failure means "offline": the caller may answer from local records.
    pub fn is_network(&self) -> bool {
        matches!(self, CatalogError::Network(_))
    }
}

impl From<cinecache_core::Error> for CatalogError {
    fn from(err: cinecache_core::Error) -> Self {
        match err {
            cinecache_core::Error::Network(e) => CatalogError::Network(e),
            other => CatalogError::Worker(other.to_string()),
        }
    }
}

impl From<CatalogError> for cinecache_core::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingApiKey => cinecache_core::Error::Config(cinecache_core::ConfigError::Missing {
                field: "tmdb_api_key".into(),
                hint: "Set CINECACHE_TMDB_API_KEY environment variable".into(),
            }),
            CatalogError::InvalidQuery(msg) => cinecache_core::Error::InvalidInput(msg),
            CatalogError::Network(e) => cinecache_core::Error::Network(e),
            other => cinecache_core::Error::Catalog(other.to_string()),
        }
    }
}
