//! Cache-related MCP tools.
//!
//! This module provides read-only views of the worker's partitions.

pub mod keys;

pub use keys::{CacheKeysParams, keys_impl};
