//! Catalog access: typed, read-only queries against NRK's public API.
//!
//! - [`client`] - HTTP client with pagination, season walking, and
//!   manifest/chapter resolution
//! - [`models`] - tolerant wire models and the typed domain structs
//!   (`CatalogShow`, `Episode`, `Chapter`)

mod client;
mod models;

pub use client::{CatalogClient, CatalogError, ShowDetails};
pub use models::{
    normalize_episode_title, parse_iso_duration, CatalogShow, Chapter, Episode, MediaRef, ShowKind,
};
