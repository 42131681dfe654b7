//! cache_keys tool implementation.
//!
//! Lists a partition's entries in insertion order, oldest first.

use cinecache_core::{CacheDb, Error, StoredRequest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Partition name, e.g. "static-v3" or "dynamic-3".
    pub partition: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub partition: String,
    /// Entries in eviction order: the first one goes next.
    pub entries: Vec<StoredRequest>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    if !cache.has_partition(&params.partition).await? {
        return Err(Error::CacheMiss(format!("no partition named {}", params.partition)).into());
    }

    let entries = cache.open_partition(&params.partition).await?.keys().await?;

    json_result(&CacheKeysOutput { partition: params.partition, entries })
}
