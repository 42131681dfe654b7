//! Shared host state handed to every tool.

use std::sync::Arc;

use cinecache_core::{AppConfig, CacheDb, Network, Registration};

/// Configuration, the worker registration and the network the host fetches through.
pub struct HostState {
    pub config: AppConfig,
    pub registration: Registration,
    pub network: Arc<dyn Network>,
}

impl HostState {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let registration = Registration::new(db, Arc::clone(&network));
        Self { config, registration, network }
    }

    pub fn db(&self) -> &CacheDb {
        self.registration.db()
    }
}
