//! Core types and shared functionality for cinecache.
//!
//! This crate provides:
//! - Named cache partitions with a SQLite backend
//! - The offline worker: generation lifecycle, request interception, eviction
//! - A keyed record store sharing the same database
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod worker;

pub use cache::{CacheDb, MOVIE_STORE, Partition, SUGGEST_STORE, StoredRequest};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Network, NetworkError, Request, RequestMode, Response, redact_url};
pub use worker::{
    ActivationReport, FetchEvent, GenerationConfig, PreloadResponse, PreloadSender, Registration, Resolution,
    ResponseSource, Served, ServiceWorker, WorkerMessage, WorkerState, WorkerStatus,
};
