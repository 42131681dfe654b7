//! Lifecycle and fetch tools: the signals a browser would deliver to the worker.

pub mod fetch;
pub mod lifecycle;
pub mod message;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl, status_impl};
pub use message::{WorkerMessageParams, message_impl};
