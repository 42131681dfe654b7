//! Install and activate: provisioning and retiring partition generations.

use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{ServiceWorker, WorkerState};
use crate::Error;
use crate::http::Request;

/// Everything that identifies one deployed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Partition holding the manifest; immutable once installed.
    pub static_cache: String,
    /// Partition filled at runtime by intercepted fetches.
    pub dynamic_cache: String,
    /// Absolute URLs fetched in full during install.
    pub manifest: Vec<Url>,
    /// Document returned when a navigation fails with nothing cached.
    pub offline_url: Url,
    /// Entry ceiling for the dynamic partition.
    pub max_dynamic_entries: usize,
    pub navigation_preload: bool,
}

/// What activation removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    /// Partitions deleted because they belong to other generations.
    pub deleted: Vec<String>,
    /// Partitions whose deletion failed; they are retried on the next activation.
    pub failed: Vec<String>,
}

impl ServiceWorker {
    /// Handle the `install` signal.
    ///
    /// Fetches every manifest URL, then writes them all into the static
    /// partition in a single transaction. Any failure marks this worker
    /// redundant and leaves storage untouched, so whatever generation was
    /// serving before keeps serving. On success the worker is `Waiting` with
    /// skip-waiting requested.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the worker was already installed, `ProvisionFailed`
    /// if any manifest entry could not be fetched or stored.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition("install", WorkerState::Parsed, WorkerState::Installing)
            .await?;

        tracing::info!(
            static_cache = %self.generation.static_cache,
            assets = self.generation.manifest.len(),
            "Caching static assets"
        );

        match self.provision().await {
            Ok(()) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Waiting).await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(static_cache = %self.generation.static_cache, error = %err, "install failed");
                self.set_state(WorkerState::Redundant).await;
                Err(err)
            }
        }
    }

    async fn provision(&self) -> Result<(), Error> {
        let mut entries = Vec::with_capacity(self.generation.manifest.len());

        for url in &self.generation.manifest {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::ProvisionFailed(format!("{url}: {e}")))?;

            if !response.ok() {
                return Err(Error::ProvisionFailed(format!("{url}: status {}", response.status)));
            }

            entries.push((request, response));
        }

        self.db
            .install_partition(&self.generation.static_cache, entries)
            .await
            .map_err(|e| Error::ProvisionFailed(format!("{}: {e}", self.generation.static_cache)))?;

        Ok(())
    }

    /// Handle the `activate` signal.
    ///
    /// Deletes every partition not named by this generation, then claims all
    /// clients. Deletion failures are logged and reported but never block
    /// the claim.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the worker is `Waiting`.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition("activate", WorkerState::Waiting, WorkerState::Activating)
            .await?;

        let report = self.retire_stale_partitions().await;

        self.controls_clients.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Active).await;

        Ok(report)
    }

    async fn retire_stale_partitions(&self) -> ActivationReport {
        let mut report = ActivationReport::default();

        let names = match self.db.partition_names().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "could not enumerate partitions during activation");
                return report;
            }
        };

        let current = [self.generation.static_cache.as_str(), self.generation.dynamic_cache.as_str()];
        for name in names.into_iter().filter(|n| !current.contains(&n.as_str())) {
            match self.db.delete_partition(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "deleted stale partition");
                    report.deleted.push(name);
                }
                Err(err) => {
                    tracing::warn!(partition = %name, error = %err, "failed to delete stale partition");
                    report.failed.push(name);
                }
            }
        }

        report
    }
}
