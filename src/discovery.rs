//! Discovery: compares the catalog listing against the registry and
//! appends shows that are not yet tracked.
//!
//! Strictly additive and one-directional. Existing entries are manual
//! curation (titles, enabled flags, archival policy) and are never
//! reordered, edited, or removed here. Video shows are excluded from
//! automatic discovery entirely; they enter the registry only through
//! manual edits.
use crate::catalog::{CatalogClient, CatalogError, ShowKind};
use crate::config::Config;
use crate::registry::{Registry, RegistryEntry};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Listing failed; the run aborts without touching the registry.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Registry(#[from] crate::registry::RegistryError),
}

/// Outcome of one discovery run.
#[derive(Debug)]
pub struct DiscoveryReport {
    /// Shows the catalog listed.
    pub listed: usize,
    /// New audio entries appended to the registry.
    pub added: usize,
    /// Video shows present in the listing but skipped by policy.
    pub skipped_video: usize,
}

/// Runs one discovery pass: load registry, list catalog, append unknown
/// audio shows, save. The registry file is only rewritten when something
/// was added.
pub async fn run_discovery(
    client: &CatalogClient,
    registry_path: &Path,
    config: &Config,
) -> Result<DiscoveryReport, DiscoveryError> {
    let mut registry = Registry::load(registry_path)?;
    let shows = client.list_shows().await?;
    let listed = shows.len();

    let mut skipped_video = 0;
    let mut new_entries = Vec::new();
    for show in shows {
        if registry.contains(&show.id) {
            continue;
        }
        if show.kind == ShowKind::Video {
            // Video feeds are curated by hand only.
            tracing::debug!(id = %show.id, "Skipping video show (not auto-discovered)");
            skipped_video += 1;
            continue;
        }
        tracing::info!(id = %show.id, title = %show.title, "Discovered new show");
        new_entries.push(RegistryEntry {
            id: show.id,
            title: show.title,
            kind: ShowKind::Audio,
            season: None,
            enabled: config.auto_enable_audio,
            archival: false,
            episodes: None,
            artwork: None,
        });
    }

    let added = registry.append(new_entries);
    if added > 0 {
        registry.save()?;
    } else {
        tracing::debug!("Discovery found nothing new, registry left untouched");
    }

    Ok(DiscoveryReport {
        listed,
        added,
        skipped_video,
    })
}
