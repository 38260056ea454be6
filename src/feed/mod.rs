//! Feed generation: the build pipeline, RSS rendering, and chapter
//! marshaling.
//!
//! - [`build`] - fetch → sort → window → assemble → render → write, with
//!   bounded fan-out over registry entries
//! - [`rss`] - RSS 2.0 + iTunes + Podcasting 2.0 + Podlove rendering
//! - [`chapters`] - external JSON chapter documents and NPT offsets

pub mod build;
pub mod chapters;
pub mod rss;

pub use build::{
    build_all, build_entry, run_status, BuildError, BuildOutcome, BuiltFeed, FeedDocument,
    RunStatus,
};

/// MIME type of HLS streaming manifests.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Generator string embedded in rendered feeds.
pub const GENERATOR: &str = concat!("nrkcast/", env!("CARGO_PKG_VERSION"));
