//! nrkcast: generates podcast RSS feeds from NRK's public catalog API.
//!
//! Two independent routines operate on a shared show registry:
//!
//! - **Discovery** compares the catalog listing against the registry and
//!   appends untracked audio shows (additive-only; video shows are
//!   curated by hand).
//! - **Feed building** turns each enabled registry entry's episode list
//!   into an RSS document — plain audio enclosures for podcasts, HLS
//!   alternate enclosures plus chapter documents for TV series — and
//!   replaces the published file atomically.
//!
//! The registry is the only shared state: discovery writes it, builders
//! read it, and both go through whole-file atomic replacement.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod feed;
pub mod output;
pub mod registry;

pub use catalog::{CatalogClient, CatalogError, ShowKind};
pub use config::{Config, ConfigError};
pub use discovery::{run_discovery, DiscoveryError, DiscoveryReport};
pub use registry::{Registry, RegistryEntry, RegistryError};
