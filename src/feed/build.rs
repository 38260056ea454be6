//! The feed build pipeline: fetch → sort → window → assemble → render →
//! write, composed per entry, fanned out over all enabled entries with a
//! bounded concurrency pool.
//!
//! Per-entry failures are isolated: a failed entry leaves its previously
//! written feed untouched and never aborts sibling builds. The sort,
//! window, and assemble stages are pure functions so they are testable
//! without a network.
use crate::catalog::{CatalogClient, CatalogError, Chapter, Episode, MediaRef, ShowKind};
use crate::config::Config;
use crate::feed::chapters::{chapters_filename, ChaptersDocument};
use crate::feed::rss;
use crate::output::{self, WriteError};
use crate::registry::RegistryEntry;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The catalog returned no playable episode. The previous feed file
    /// stays authoritative.
    #[error("no playable episodes")]
    NoEpisodes,

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("failed to render feed: {0}")]
    Render(anyhow::Error),

    #[error("failed to encode chapter document: {0}")]
    Chapters(#[from] serde_json::Error),
}

/// The assembled feed, ready for rendering. Regenerated wholesale on every
/// build.
#[derive(Debug)]
pub struct FeedDocument {
    pub show_id: String,
    pub kind: ShowKind,
    pub title: String,
    pub link: String,
    pub description: String,
    pub image: Option<String>,
    /// Public URL this feed is served under; the channel `podcast:guid`
    /// derives from it.
    pub feed_url: String,
    /// Ordered by publish timestamp descending.
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug)]
pub struct FeedEntry {
    /// Stable identifier, equal to the catalog episode id.
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub published: DateTime<Utc>,
    pub duration_secs: u64,
    pub media: MediaRef,
    pub image: Option<String>,
    pub chapters: Vec<Chapter>,
    /// Public URL of the external chapter JSON document, when chapters
    /// exist.
    pub chapters_url: Option<String>,
}

/// What one successful entry build produced.
#[derive(Debug)]
pub struct BuiltFeed {
    pub path: PathBuf,
    pub episodes: usize,
}

/// Result of building one registry entry, keyed for summary reporting.
#[derive(Debug)]
pub struct BuildOutcome {
    pub show_id: String,
    pub result: Result<BuiltFeed, BuildError>,
}

/// Aggregate verdict of one build run.
///
/// Entries with nothing playable upstream are skips, not failures: their
/// previous feed stays authoritative and they never degrade the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every entry built or was skipped.
    Success,
    /// Some entries failed, at least one succeeded.
    Partial,
    /// Entries failed and none succeeded.
    Failed,
}

impl RunStatus {
    /// Process exit code for this verdict: 0, 2, or 1.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Partial => 2,
            RunStatus::Failed => 1,
        }
    }
}

/// Classifies a run's outcomes into its aggregate verdict.
pub fn run_status(outcomes: &[BuildOutcome]) -> RunStatus {
    let mut succeeded = 0;
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(_) => succeeded += 1,
            Err(BuildError::NoEpisodes) => {}
            Err(_) => failed += 1,
        }
    }
    if failed == 0 {
        RunStatus::Success
    } else if succeeded == 0 {
        RunStatus::Failed
    } else {
        RunStatus::Partial
    }
}

// ============================================================================
// Pure pipeline stages
// ============================================================================

/// Deterministic total order: publish timestamp descending, ties broken by
/// episode id ascending so repeated runs agree.
pub fn sort_episodes(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| {
        b.published
            .cmp(&a.published)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Bounded recent-episode window; `None` keeps everything (archival
/// entries).
pub fn apply_window(episodes: Vec<Episode>, window: Option<usize>) -> Vec<Episode> {
    match window {
        Some(n) => episodes.into_iter().take(n).collect(),
        None => episodes,
    }
}

/// Window size for one entry: unbounded when archival, otherwise the
/// per-entry override or the configured default.
pub fn entry_window(entry: &RegistryEntry, default: usize) -> Option<usize> {
    if entry.archival {
        None
    } else {
        Some(entry.episodes.unwrap_or(default))
    }
}

/// Assembles the feed document from sorted, windowed episodes. Artwork
/// falls back episode → registry entry → catalog image.
pub fn assemble(
    entry: &RegistryEntry,
    catalog_title: Option<&str>,
    catalog_image: Option<&str>,
    episodes: Vec<Episode>,
    site_base_url: &str,
) -> FeedDocument {
    let (subdir, link) = match entry.kind {
        ShowKind::Audio => (
            "audio",
            format!("https://radio.nrk.no/podkast/{}", entry.id),
        ),
        ShowKind::Video => ("video", format!("https://tv.nrk.no/serie/{}", entry.id)),
    };
    let site_base = site_base_url.trim_end_matches('/');
    let feed_url = format!("{site_base}/rss/{subdir}/{}.xml", entry.id);

    let channel_image = entry
        .artwork
        .clone()
        .or_else(|| catalog_image.map(str::to_string));
    let display_title = if entry.title.is_empty() {
        catalog_title.unwrap_or(&entry.id).to_string()
    } else {
        entry.title.clone()
    };
    let description = format!(
        "Uoffisiell strøm fra {display_title}. Innholdet er opphavsrettsbeskyttet av NRK. \
         Kun for personlig bruk. Se {link} for mer informasjon."
    );

    let entries = episodes
        .into_iter()
        .map(|ep| {
            let chapters_url = if ep.chapters.is_empty() {
                None
            } else {
                Some(format!(
                    "{site_base}/chapters/{}",
                    chapters_filename(&entry.id, ep.published)
                ))
            };
            FeedEntry {
                guid: ep.id,
                title: ep.title,
                description: ep.subtitle,
                published: ep.published,
                duration_secs: ep.duration_secs,
                media: ep.media,
                image: ep
                    .image
                    .or_else(|| entry.artwork.clone())
                    .or_else(|| catalog_image.map(str::to_string)),
                chapters: ep.chapters,
                chapters_url,
            }
        })
        .collect();

    FeedDocument {
        show_id: entry.id.clone(),
        kind: entry.kind,
        title: display_title,
        link,
        description,
        image: channel_image,
        feed_url,
        entries,
    }
}

// ============================================================================
// Build driver
// ============================================================================

/// Builds feeds for all given entries with bounded concurrency. Outcomes
/// are returned in completion order, one per entry, successes and failures
/// alike.
pub async fn build_all(
    client: &CatalogClient,
    config: &Config,
    entries: Vec<RegistryEntry>,
) -> Vec<BuildOutcome> {
    if entries.is_empty() {
        return Vec::new();
    }

    let concurrency = config.concurrency.max(1);
    stream::iter(entries.into_iter())
        .map(|entry| {
            let client = client.clone();
            let config = config.clone();
            async move {
                let show_id = entry.id.clone();
                let result = build_entry(&client, &config, &entry).await;
                match &result {
                    Ok(built) => tracing::info!(
                        show = %show_id,
                        episodes = built.episodes,
                        path = %built.path.display(),
                        "Feed written"
                    ),
                    Err(BuildError::NoEpisodes) => tracing::info!(
                        show = %show_id,
                        "Nothing playable upstream, previous version left in place"
                    ),
                    Err(e) => tracing::warn!(
                        show = %show_id,
                        error = %e,
                        "Feed build failed, previous version left in place"
                    ),
                }
                BuildOutcome { show_id, result }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await
}

/// Builds and writes the feed for one registry entry.
pub async fn build_entry(
    client: &CatalogClient,
    config: &Config,
    entry: &RegistryEntry,
) -> Result<BuiltFeed, BuildError> {
    let window = entry_window(entry, config.episode_window);

    // Audio listings are cheap, so fetch everything and let the sorted
    // window decide. Video episodes cost a manifest round trip each, so
    // the season walk stops at the window (seasons come newest-first).
    let fetch_limit = match entry.kind {
        ShowKind::Audio => None,
        ShowKind::Video => window,
    };
    let mut episodes = client
        .fetch_episodes(&entry.id, entry.kind, entry.season.as_deref(), fetch_limit)
        .await?;
    sort_episodes(&mut episodes);
    let episodes = apply_window(episodes, window);
    if episodes.is_empty() {
        return Err(BuildError::NoEpisodes);
    }

    // Channel fallbacks are best-effort: a failed metadata fetch degrades
    // artwork, it does not fail the feed.
    let details = match client.fetch_show_details(&entry.id, entry.kind).await {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::warn!(show = %entry.id, error = %e, "Could not fetch show details");
            None
        }
    };
    let catalog_title = details.as_ref().and_then(|d| d.title.as_deref());
    let catalog_image = details.as_ref().and_then(|d| d.image.as_deref());

    let doc = assemble(
        entry,
        catalog_title,
        catalog_image,
        episodes,
        &config.site_base_url,
    );

    // External chapter documents are written first so a published feed
    // never references a missing file.
    if entry.kind == ShowKind::Video {
        for item in &doc.entries {
            if item.chapters.is_empty() {
                continue;
            }
            let chapters = ChaptersDocument::new(&item.title, &doc.title, &item.chapters);
            let path = config
                .chapters_dir
                .join(chapters_filename(&entry.id, item.published));
            output::write_atomic(&path, &chapters.to_json()?)?;
        }
    }

    let xml = rss::render(&doc).map_err(BuildError::Render)?;
    let dir = match entry.kind {
        ShowKind::Audio => &config.audio_feeds_dir,
        ShowKind::Video => &config.video_feeds_dir,
    };
    let path = dir.join(format!("{}.xml", entry.id));
    output::write_atomic(&path, xml.as_bytes())?;

    Ok(BuiltFeed {
        path,
        episodes: doc.entries.len(),
    })
}

// ============================================================================
// Tests
// ============================================================================
