//! Request interception and the offline fallback policy.
//!
//! Resolution order for an intercepted GET:
//!
//! 1. static partition, then dynamic partition (a hit never touches the network)
//! 2. the navigation preload response, for navigations that carry one
//! 3. the network; a successful answer is cloned into the dynamic partition
//!    and the partition is trimmed back to its ceiling
//! 4. on a transport failure, the offline document for navigations and
//!    `.html` requests; everything else sees the failure
//!
//! Store errors along the way are logged and treated as misses or skipped
//! writes. They never turn a successful network response into a failure.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::{ServiceWorker, WorkerState};
use crate::Error;
use crate::cache::enforce_ceiling;
use crate::http::{NetworkError, Request, Response};

/// Where a served response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResponseSource {
    /// Found in the named partition.
    Cache { partition: String },
    /// The host's speculative navigation fetch.
    Preload,
    Network,
    /// The offline document, substituted for a failed request.
    Fallback,
    /// Not intercepted; the host fetched it directly.
    Passthrough,
}

/// A response together with its origin.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

/// Outcome of the `fetch` signal.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The worker does not handle this request; the host should fetch it.
    Passthrough,
    Respond(Served),
}

/// Sending half of a navigation preload, held by the host.
#[derive(Debug)]
pub struct PreloadSender(oneshot::Sender<Result<Response, NetworkError>>);

impl PreloadSender {
    /// Deliver the outcome of the speculative fetch.
    pub fn send(self, outcome: Result<Response, NetworkError>) {
        if self.0.send(outcome).is_err() {
            tracing::debug!("preload response dropped; fetch already resolved");
        }
    }
}

/// A navigation response the host may have started before interception ran.
#[derive(Debug)]
pub struct PreloadResponse(oneshot::Receiver<Result<Response, NetworkError>>);

impl PreloadResponse {
    pub fn channel() -> (PreloadSender, PreloadResponse) {
        let (tx, rx) = oneshot::channel();
        (PreloadSender(tx), PreloadResponse(rx))
    }

    /// A preload whose outcome is already known.
    pub fn ready(outcome: Result<Response, NetworkError>) -> Self {
        let (tx, rx) = Self::channel();
        tx.send(outcome);
        rx
    }

    /// Wait for the preload. `None` if the host never started one.
    pub async fn resolve(self) -> Result<Option<Response>, NetworkError> {
        match self.0.await {
            Ok(Ok(response)) => Ok(Some(response)),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(None),
        }
    }
}

/// The `fetch` signal payload.
#[derive(Debug)]
pub struct FetchEvent {
    pub request: Request,
    pub preload: Option<PreloadResponse>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, preload: None }
    }

    pub fn with_preload(mut self, preload: PreloadResponse) -> Self {
        self.preload = Some(preload);
        self
    }
}

impl ServiceWorker {
    /// Handle the `fetch` signal.
    ///
    /// Non-GET requests, and any request reaching a worker that is not
    /// active, resolve to [`Resolution::Passthrough`].
    ///
    /// # Errors
    ///
    /// `Error::Network` when the network fails and no fallback applies.
    pub async fn handle_fetch(&self, event: FetchEvent) -> Result<Resolution, Error> {
        let FetchEvent { request, preload } = event;

        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.display_url(), "not intercepted");
            return Ok(Resolution::Passthrough);
        }

        if self.state().await != WorkerState::Active {
            return Ok(Resolution::Passthrough);
        }

        if let Some((partition, response)) = self.lookup(&request).await {
            tracing::debug!(url = %request.display_url(), partition = %partition, "cache hit");
            return Ok(Resolution::Respond(Served { response, source: ResponseSource::Cache { partition } }));
        }

        tracing::debug!(url = %request.display_url(), "cache miss");

        match self.fetch_from_network(&request, preload).await {
            Ok(served) => {
                self.store_runtime(&request, &served.response).await;
                Ok(Resolution::Respond(served))
            }
            Err(err) => self.fallback(&request, err).await.map(Resolution::Respond),
        }
    }

    /// Static partition first so build assets shadow runtime copies.
    async fn lookup(&self, request: &Request) -> Option<(String, Response)> {
        let partitions = [self.generation.static_cache.as_str(), self.generation.dynamic_cache.as_str()];
        match self.db.match_request(&partitions, request).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    url = %request.display_url(), error = %err,
                    "cache lookup failed; treating as miss"
                );
                None
            }
        }
    }

    async fn fetch_from_network(
        &self, request: &Request, preload: Option<PreloadResponse>,
    ) -> Result<Served, NetworkError> {
        if request.is_navigation()
            && self.generation.navigation_preload
            && let Some(preload) = preload
            && let Some(response) = preload.resolve().await?
        {
            tracing::debug!(url = %request.display_url(), "using preload response");
            return Ok(Served { response, source: ResponseSource::Preload });
        }

        let response = self.network.fetch(request).await?;
        Ok(Served { response, source: ResponseSource::Network })
    }

    /// Write a copy into the dynamic partition and trim it. Never fails.
    ///
    /// The state lock is held across the write, so once a newer generation
    /// has retired this worker a late response cannot recreate a partition
    /// that activation already deleted.
    async fn store_runtime(&self, request: &Request, response: &Response) {
        let name = &self.generation.dynamic_cache;

        let state = self.state.lock().await;
        let current = *state;
        if current != WorkerState::Active {
            tracing::debug!(url = %request.display_url(), state = %current, "worker retired; response not stored");
            return;
        }

        let stored = match self.db.open_partition(name).await {
            Ok(partition) => partition.put(request, response).await,
            Err(err) => Err(err),
        };
        if let Err(err) = stored {
            tracing::warn!(
                url = %request.display_url(), partition = %name, error = %err,
                "dynamic cache write failed"
            );
            return;
        }

        if let Err(err) = enforce_ceiling(&self.db, name, self.generation.max_dynamic_entries).await {
            tracing::warn!(partition = %name, error = %err, "eviction abandoned");
        }
    }

    async fn fallback(&self, request: &Request, err: NetworkError) -> Result<Served, Error> {
        if !(request.is_navigation() || request.targets_html()) {
            return Err(Error::Network(err));
        }

        tracing::info!(
            url = %request.display_url(), error = %err,
            "Fetch failed; returning offline page instead"
        );

        let offline = Request::get(self.generation.offline_url.clone());
        let found = self
            .db
            .match_request(&[self.generation.static_cache.as_str()], &offline)
            .await;

        match found {
            Ok(Some((_, response))) => Ok(Served { response, source: ResponseSource::Fallback }),
            Ok(None) => Err(Error::Network(err)),
            Err(store_err) => {
                tracing::warn!(error = %store_err, "offline document lookup failed");
                Err(Error::Network(err))
            }
        }
    }
}
