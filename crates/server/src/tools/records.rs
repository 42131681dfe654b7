//! records_list tool implementation.
//!
//! Reads a record collection the way the pages do when offline.

use cinecache_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::json_result;

/// Parameters for the records_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecordsListParams {
    /// Collection name: "movieStore" or "suggestStore".
    pub collection: String,
}

/// Output from the records_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecordsListOutput {
    pub collection: String,
    pub records: Vec<Value>,
}

/// Implementation of the records_list tool.
pub async fn list_impl(db: &CacheDb, params: RecordsListParams) -> Result<CallToolResult, McpError> {
    let records = db.get_all_records(&params.collection).await?;

    json_result(&RecordsListOutput { collection: params.collection, records })
}
