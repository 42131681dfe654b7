//! worker_install, worker_activate and worker_status tool implementations.
//!
//! Install provisions the configured generation. Because an installed worker
//! asks to skip waiting, a successful install normally activates it right
//! away; `worker_activate` covers a worker left waiting behind an active one.

use cinecache_core::{ActivationReport, Error, WorkerState, WorkerStatus};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::state::HostState;
use crate::tools::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub status: WorkerStatus,
    /// Number of manifest URLs now in the static partition.
    pub manifest_entries: usize,
    pub activated: bool,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub report: ActivationReport,
    pub status: Option<WorkerStatus>,
}

/// One partition and its entry count.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    /// Every partition on disk, in creation order.
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let generation = state.config.generation().map_err(Error::from)?;
    let manifest_entries = generation.manifest.len();

    let worker = state.registration.register(generation).await?;
    let status = worker.status().await;
    let activated = status.state == WorkerState::Active;

    json_result(&WorkerInstallOutput { status, manifest_entries, activated })
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let report = state
        .registration
        .activate_waiting()
        .await?
        .ok_or(HostError::NothingWaiting)?;

    json_result(&WorkerActivateOutput { report, status: state.registration.status().await })
}

/// Implementation of the worker_status tool.
pub async fn status_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let active = state.registration.status().await;
    let waiting = match state.registration.waiting().await {
        Some(worker) => Some(worker.status().await),
        None => None,
    };

    let mut partitions = Vec::new();
    for name in state.db().partition_names().await? {
        let entries = state.db().open_partition(&name).await?.len().await?;
        partitions.push(PartitionSummary { name, entries });
    }

    json_result(&WorkerStatusOutput { active, waiting, partitions })
}
