//! Client code for cinecache.
//!
//! This crate provides the reqwest-backed network the worker fetches through
//! and the TMDB catalog client the host drives through the worker.

pub mod fetch;
pub mod tmdb;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize};
pub use tmdb::{CatalogClient, CatalogConfig, CatalogError, CatalogResponse, Movie, MoviePage};
