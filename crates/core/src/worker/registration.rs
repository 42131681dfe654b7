//! Worker registration: sequencing generations across deploys.
//!
//! The registration is the host's view of the worker slot. A new generation
//! installs next to the active worker and only replaces it after installing
//! successfully, so a failed deploy keeps the previous generation serving.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{ActivationReport, FetchEvent, GenerationConfig, Resolution, ResponseSource, Served, ServiceWorker};
use super::{WorkerMessage, WorkerStatus};
use crate::Error;
use crate::cache::CacheDb;
use crate::http::Network;

/// Holds the active worker and, between install and activation, the waiting one.
pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<ServiceWorker>>>,
    waiting: RwLock<Option<Arc<ServiceWorker>>>,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { db, network, active: RwLock::new(None), waiting: RwLock::new(None) }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<ServiceWorker>> {
        self.waiting.read().await.clone()
    }

    /// Install a worker for `generation` and, if it asks to skip waiting or
    /// nothing is active yet, activate it.
    ///
    /// # Errors
    ///
    /// Propagates the install error. The previously active worker, if any,
    /// is left in place.
    pub async fn register(&self, generation: GenerationConfig) -> Result<Arc<ServiceWorker>, Error> {
        let worker = Arc::new(ServiceWorker::new(generation, self.db.clone(), Arc::clone(&self.network)));

        worker.install().await?;

        let nothing_active = self.active.read().await.is_none();
        if worker.skip_waiting_requested() || nothing_active {
            self.promote(Arc::clone(&worker)).await?;
        } else if let Some(replaced) = self.waiting.write().await.replace(Arc::clone(&worker)) {
            replaced.mark_redundant().await;
        }

        Ok(worker)
    }

    /// Activate the waiting worker, e.g. once every client of the old one closed.
    pub async fn activate_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        let Some(worker) = self.waiting.write().await.take() else {
            return Ok(None);
        };
        self.promote(worker).await.map(Some)
    }

    /// Retire the active worker, then activate `worker` in its place.
    ///
    /// The previous worker is retired before the new one deletes stale
    /// partitions, so none of its in-flight fetches can write into a
    /// partition after activation removed it.
    async fn promote(&self, worker: Arc<ServiceWorker>) -> Result<ActivationReport, Error> {
        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            previous.mark_redundant().await;
        }

        let report = worker.activate().await?;
        *active = Some(worker);

        Ok(report)
    }

    /// Deliver a `fetch` signal and produce the response the page sees.
    ///
    /// Requests the active worker passes through, or that arrive with no
    /// active worker, go straight to the network.
    ///
    /// # Errors
    ///
    /// `Error::Network` when the request cannot be satisfied.
    pub async fn fetch(&self, event: FetchEvent) -> Result<Served, Error> {
        let request = event.request.clone();

        let resolution = match self.active().await {
            Some(worker) => worker.handle_fetch(event).await?,
            None => Resolution::Passthrough,
        };

        match resolution {
            Resolution::Respond(served) => Ok(served),
            Resolution::Passthrough => {
                let response = self.network.fetch(&request).await?;
                Ok(Served { response, source: ResponseSource::Passthrough })
            }
        }
    }

    /// Deliver a `message` signal to the active worker.
    pub async fn message(&self, payload: Value) -> WorkerMessage {
        match self.active().await {
            Some(worker) => worker.handle_message(payload),
            None => {
                let message = WorkerMessage::parse(payload);
                tracing::debug!(?message, "message with no active worker");
                message
            }
        }
    }

    /// Status of the active worker, if any.
    pub async fn status(&self) -> Option<WorkerStatus> {
        match self.active().await {
            Some(worker) => Some(worker.status().await),
            None => None,
        }
    }
}
