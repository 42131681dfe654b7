//! The offline worker.
//!
//! A [`ServiceWorker`] owns one generation of partitions and answers the four
//! lifecycle signals the host delivers:
//!
//! - `install` provisions the static partition from the manifest
//!   ([`ServiceWorker::install`])
//! - `activate` retires every other generation and claims clients
//!   ([`ServiceWorker::activate`])
//! - `fetch` resolves a request from cache, network or the offline document
//!   ([`ServiceWorker::handle_fetch`])
//! - `message` is a logging hook ([`ServiceWorker::handle_message`])
//!
//! Transitions follow `Parsed -> Installing -> Waiting -> Activating ->
//! Active`. A failed install, or being replaced by a newer worker, ends in
//! `Redundant`. [`Registration`] sequences workers across deploys.

mod generation;
mod intercept;
mod message;
mod registration;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::CacheDb;
use crate::http::Network;
use crate::Error;

pub use generation::{ActivationReport, GenerationConfig};
pub use intercept::{FetchEvent, PreloadResponse, PreloadSender, Resolution, ResponseSource, Served};
pub use message::WorkerMessage;
pub use registration::Registration;

/// Lifecycle state of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed, not yet controlling clients.
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a worker for hosts and tooling.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub skip_waiting: bool,
    pub controls_clients: bool,
}

/// One generation's worker.
pub struct ServiceWorker {
    generation: GenerationConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
    controls_clients: AtomicBool,
}

impl fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("static_cache", &self.generation.static_cache)
            .field("dynamic_cache", &self.generation.dynamic_cache)
            .finish_non_exhaustive()
    }
}

impl ServiceWorker {
    pub fn new(generation: GenerationConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            generation,
            db,
            network,
            state: Mutex::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            controls_clients: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    /// Whether install asked to be promoted without waiting for clients to close.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation claimed the open clients.
    pub fn controls_clients(&self) -> bool {
        self.controls_clients.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state().await,
            static_cache: self.generation.static_cache.clone(),
            dynamic_cache: self.generation.dynamic_cache.clone(),
            skip_waiting: self.skip_waiting_requested(),
            controls_clients: self.controls_clients(),
        }
    }

    /// Move from `from` to `to`, or fail with `InvalidState` naming the signal.
    async fn transition(&self, signal: &str, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if *state != from {
            return Err(Error::InvalidState(format!("{signal} delivered while {}", *state)));
        }
        tracing::info!(static_cache = %self.generation.static_cache, from = %from, to = %to, "worker state change");
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        let mut state = self.state.lock().await;
        let from = *state;
        tracing::info!(static_cache = %self.generation.static_cache, from = %from, to = %to, "worker state change");
        *state = to;
    }

    /// Retire this worker. It stops controlling clients and will not
    /// intercept further fetches.
    pub async fn mark_redundant(&self) {
        self.controls_clients.store(false, Ordering::SeqCst);
        self.set_state(WorkerState::Redundant).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_serde() {
        for state in [
            WorkerState::Parsed,
            WorkerState::Installing,
            WorkerState::Waiting,
            WorkerState::Activating,
            WorkerState::Active,
            WorkerState::Redundant,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
