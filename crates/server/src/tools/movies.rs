//! movie_search and movie_recommendations tool implementations.
//!
//! Catalog calls go through the active worker. Every page obtained is kept in
//! the record store (`movieStore` by keyword, `suggestStore` by movie id), and
//! when the worker can reach neither the network nor a cached copy the stored
//! page answers instead.

use cinecache_client::{CatalogClient, CatalogConfig, CatalogError, CatalogResponse, MoviePage};
use cinecache_core::{AppConfig, Error, MOVIE_STORE, ResponseSource, SUGGEST_STORE};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::HostState;
use crate::tools::json_result;

/// Parameters for the movie_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovieSearchParams {
    /// Search keyword (required).
    pub keyword: String,
}

/// Parameters for the movie_recommendations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovieRecommendationsParams {
    /// TMDB id of the reference movie.
    pub movie_id: u64,
}

/// Output from both catalog tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovieListOutput {
    /// Record key: the keyword or the movie id.
    pub key: String,
    /// Record collection the page is kept in.
    pub store: String,
    pub page: MoviePage,
    /// Where the worker found the page; absent when answered from the record store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    pub from_records: bool,
}

fn catalog_client(config: &AppConfig) -> Result<CatalogClient, Error> {
    Ok(CatalogClient::new(CatalogConfig::from_app_config(config)?)?)
}

/// Implementation of the movie_search tool.
pub async fn search_impl(state: &HostState, params: MovieSearchParams) -> Result<CallToolResult, McpError> {
    let keyword = params.keyword.trim().to_string();
    if keyword.is_empty() {
        return Err(Error::InvalidInput("keyword cannot be empty".into()).into());
    }

    let client = catalog_client(&state.config)?;
    let outcome = client.search(&state.registration, &keyword).await;

    remember_or_recall(state, MOVIE_STORE, keyword, outcome).await
}

/// Implementation of the movie_recommendations tool.
pub async fn recommendations_impl(
    state: &HostState, params: MovieRecommendationsParams,
) -> Result<CallToolResult, McpError> {
    let client = catalog_client(&state.config)?;
    let outcome = client.recommendations(&state.registration, params.movie_id).await;

    remember_or_recall(state, SUGGEST_STORE, params.movie_id.to_string(), outcome).await
}

async fn remember_or_recall(
    state: &HostState, store: &str, key: String, outcome: Result<CatalogResponse, CatalogError>,
) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(response) => {
            let value = serde_json::to_value(&response.page).map_err(Error::from)?;
            if let Err(e) = state.db().put_record(store, &key, &value).await {
                tracing::warn!("failed to store {} record {}: {}", store, key, e);
            }

            json_result(&MovieListOutput {
                key,
                store: store.to_string(),
                page: response.page,
                source: Some(response.source),
                from_records: false,
            })
        }
        Err(err) if err.is_network() => {
            let Some(value) = state.db().get_record(store, &key).await? else {
                return Err(Error::from(err).into());
            };

            tracing::info!("catalog unreachable; answering {} {} from records", store, key);
            let page: MoviePage = serde_json::from_value(value).map_err(Error::from)?;

            json_result(&MovieListOutput { key, store: store.to_string(), page, source: None, from_records: true })
        }
        Err(err) => Err(Error::from(err).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{ORIGIN, config, installed_state, output, state_with};
    use cinecache_core::Response;
    use serde_json::json;

    fn page_body(title: &str) -> String {
        json!({
            "page": 1,
            "results": [{"id": 348, "title": title}],
            "total_pages": 1,
            "total_results": 1
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_search_stores_record() {
        let (state, network) = installed_state().await;
        network.route(
            &format!("{ORIGIN}/tmdb/3/search/movie?api_key=test-key&query=alien"),
            Response::new(200, page_body("Alien")),
        );

        let result = search_impl(&state, MovieSearchParams { keyword: " alien ".into() }).await.unwrap();
        let list: MovieListOutput = output(&result);

        assert_eq!(list.key, "alien");
        assert_eq!(list.source, Some(ResponseSource::Network));
        assert!(!list.from_records);

        let stored = state.db().get_record(MOVIE_STORE, "alien").await.unwrap().unwrap();
        assert_eq!(stored["results"][0]["title"], "Alien");
    }

    #[tokio::test]
    async fn test_search_offline_after_cache_loss_uses_records() {
        let (state, network) = installed_state().await;
        state
            .db()
            .put_record(MOVIE_STORE, "alien", &serde_json::from_str(&page_body("Alien")).unwrap())
            .await
            .unwrap();
        network.set_offline(true);

        let result = search_impl(&state, MovieSearchParams { keyword: "alien".into() }).await.unwrap();
        let list: MovieListOutput = output(&result);

        assert!(list.from_records);
        assert!(list.source.is_none());
        assert_eq!(list.page.results[0].title, "Alien");
    }

    #[tokio::test]
    async fn test_search_offline_without_record_fails() {
        let (state, network) = installed_state().await;
        network.set_offline(true);

        let err = search_impl(&state, MovieSearchParams { keyword: "alien".into() }).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32006));
    }

    #[tokio::test]
    async fn test_recommendations_repeat_served_by_worker_cache() {
        let (state, network) = installed_state().await;
        network.route(
            &format!("{ORIGIN}/tmdb/3/movie/348/recommendations?api_key=test-key"),
            Response::new(200, page_body("Aliens")),
        );

        recommendations_impl(&state, MovieRecommendationsParams { movie_id: 348 }).await.unwrap();
        network.set_offline(true);

        let result = recommendations_impl(&state, MovieRecommendationsParams { movie_id: 348 }).await.unwrap();
        let list: MovieListOutput = output(&result);

        assert_eq!(list.store, SUGGEST_STORE);
        assert_eq!(list.source, Some(ResponseSource::Cache { partition: "dynamic-3".into() }));
        assert!(!list.from_records);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let (state, _network) = state_with(AppConfig { tmdb_api_key: None, ..config() }).await;

        let result = search_impl(&state, MovieSearchParams { keyword: "alien".into() }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_keyword() {
        let (state, _network) = installed_state().await;

        let err = search_impl(&state, MovieSearchParams { keyword: "  ".into() }).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32602));
    }
}
