//! SQLite-backed storage for cache partitions and page records.
//!
//! This module provides persistent named partitions using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Request-keyed entries hashed with SHA-256
//! - Insertion-ordered keys for FIFO eviction
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Keyed record collections for the application pages

pub mod connection;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod partition;
pub mod records;

pub use crate::Error;

pub use connection::CacheDb;
pub use eviction::enforce_ceiling;
pub use partition::{Partition, StoredRequest};
pub use records::{MOVIE_STORE, SUGGEST_STORE};
