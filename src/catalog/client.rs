//! Read-only client for NRK's public PSAPI.
//!
//! Audio shows are podcast catalog entries with direct media URLs in the
//! episode listing. Video shows are TV series whose episodes (instalments)
//! are grouped into seasons and need a playback-manifest round trip per
//! episode to resolve the HLS stream. Both are exposed through the same
//! surface: a flat show listing and a per-show episode list.
use crate::catalog::models::{
    CatalogShow, Episode, Manifest, PodcastEpisodesPage, PodcastMetadata, ProgramDetails,
    SeriesSearchPage, ShowKind, TvSeriesMetadata,
};
use crate::catalog::Chapter;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: usize = 50;
/// Hard cap on listing pages so a misbehaving upstream cannot loop us.
const MAX_PAGES: usize = 200;

const USER_AGENT: &str = concat!("nrkcast/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("catalog unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// Request exceeded the 30-second timeout
    #[error("catalog request timed out")]
    Timeout,
    /// The identifier no longer resolves upstream
    #[error("not found upstream: {0}")]
    NotFound(String),
    /// HTTP response with an unexpected non-2xx status code
    #[error("catalog returned status {status} for {path}")]
    Status { status: u16, path: String },
    /// Response body could not be decoded as the expected JSON shape
    #[error("undecodable catalog response for {path}: {message}")]
    Decode { path: String, message: String },
}

impl CatalogError {
    /// Whether the error is transport-level (retryable) rather than a
    /// definite answer about the requested resource.
    pub fn is_transport(&self) -> bool {
        matches!(self, CatalogError::Unavailable(_) | CatalogError::Timeout)
    }
}

/// Read-only catalog query client. Cheap to clone (shares the underlying
/// connection pool).
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Lists every show the catalog exposes, paging through the podcast
    /// search endpoint until a short page signals the end.
    pub async fn list_shows(&self) -> Result<Vec<CatalogShow>, CatalogError> {
        let mut shows = Vec::new();
        for page in 0..MAX_PAGES {
            let path = format!(
                "/radio/search/categories/podcast?take={}&skip={}",
                PAGE_SIZE,
                page * PAGE_SIZE
            );
            let listing: SeriesSearchPage = self.get_json(&path).await?;
            let page_len = listing.series.len();
            shows.extend(listing.series.into_iter().filter_map(|s| s.into_show()));
            if page_len < PAGE_SIZE {
                break;
            }
        }
        tracing::debug!(count = shows.len(), "Catalog listing complete");
        Ok(shows)
    }

    /// Fetches title and artwork for a show, used as channel-level fallbacks.
    pub async fn fetch_show_details(
        &self,
        show_id: &str,
        kind: ShowKind,
    ) -> Result<ShowDetails, CatalogError> {
        match kind {
            ShowKind::Audio => {
                let meta: PodcastMetadata = self
                    .get_json(&format!("/radio/catalog/podcast/{show_id}"))
                    .await?;
                Ok(ShowDetails {
                    title: meta.title(),
                    image: meta.image(),
                })
            }
            ShowKind::Video => {
                let meta: TvSeriesMetadata = self
                    .get_json(&format!("/tv/catalog/series/{show_id}"))
                    .await?;
                Ok(ShowDetails {
                    title: meta.title(),
                    image: meta.image(),
                })
            }
        }
    }

    /// Fetches the episode list for a show, newest first as reported by the
    /// catalog.
    ///
    /// `season` restricts the fetch to one season. `limit` stops fetching
    /// once that many playable episodes have been collected (`None` keeps
    /// everything, for archival feeds). Episodes missing required fields
    /// are dropped with a warning, never fatal for the fetch.
    pub async fn fetch_episodes(
        &self,
        show_id: &str,
        kind: ShowKind,
        season: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Episode>, CatalogError> {
        match kind {
            ShowKind::Audio => self.fetch_podcast_episodes(show_id, season, limit).await,
            ShowKind::Video => self.fetch_tv_episodes(show_id, season, limit).await,
        }
    }

    async fn fetch_podcast_episodes(
        &self,
        show_id: &str,
        season: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Episode>, CatalogError> {
        let base = match season {
            Some(season) => {
                format!("/radio/catalog/podcast/{show_id}/seasons/{season}/episodes")
            }
            None => format!("/radio/catalog/podcast/{show_id}/episodes"),
        };

        let mut episodes = Vec::new();
        for page in 1..=MAX_PAGES {
            let path = format!("{base}?page={page}&pageSize={PAGE_SIZE}");
            let listing: PodcastEpisodesPage = self.get_json(&path).await?;
            let page_len = listing.embedded.episodes.len();

            for wire in listing.embedded.episodes {
                if wire.availability.is_upcoming() {
                    tracing::debug!(
                        show = show_id,
                        episode = wire.episode_id.as_deref().unwrap_or("<missing id>"),
                        "Skipping upcoming episode"
                    );
                    continue;
                }
                let id = wire.episode_id.clone();
                match wire.into_episode() {
                    Some(ep) => episodes.push(ep),
                    None => {
                        tracing::warn!(
                            show = show_id,
                            episode = id.as_deref().unwrap_or("<missing id>"),
                            "Dropping episode with missing or malformed fields"
                        );
                    }
                }
                if limit.is_some_and(|l| episodes.len() >= l) {
                    return Ok(episodes);
                }
            }

            if page_len < PAGE_SIZE {
                break;
            }
        }
        Ok(episodes)
    }

    /// Walks TV seasons newest-first, resolving the HLS manifest and index
    /// points per instalment. Instalments whose manifest is missing or has
    /// no stream are skipped; transport errors abort the fetch.
    async fn fetch_tv_episodes(
        &self,
        show_id: &str,
        season: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Episode>, CatalogError> {
        let meta: TvSeriesMetadata = self
            .get_json(&format!("/tv/catalog/series/{show_id}"))
            .await?;

        let seasons: Vec<String> = match season {
            Some(wanted) => meta
                .season_ids()
                .into_iter()
                .filter(|s| s == wanted)
                .collect(),
            None => meta.season_ids(),
        };
        if seasons.is_empty() {
            tracing::info!(show = show_id, "No seasons found for TV series");
            return Ok(Vec::new());
        }

        let mut episodes = Vec::new();
        'seasons: for season_id in seasons {
            let page: crate::catalog::models::SeasonPage = self
                .get_json(&format!("/tv/catalog/series/{show_id}/seasons/{season_id}"))
                .await?;

            for inst in page.embedded.instalments {
                if inst.availability.is_upcoming() {
                    tracing::debug!(
                        show = show_id,
                        episode = inst.program_id().unwrap_or("<missing id>"),
                        "Skipping upcoming episode"
                    );
                    continue;
                }
                let Some(program_id) = inst.program_id().map(str::to_string) else {
                    tracing::warn!(show = show_id, "Dropping instalment without program id");
                    continue;
                };

                let Some((manifest_url, mime)) = self.resolve_stream(&program_id).await? else {
                    tracing::info!(
                        show = show_id,
                        episode = %program_id,
                        "Skipping episode without a playable HLS stream"
                    );
                    continue;
                };

                let chapters = self.fetch_chapters(&program_id).await?;
                match inst.into_episode(manifest_url, mime) {
                    Some(mut ep) => {
                        ep.chapters = chapters;
                        episodes.push(ep);
                    }
                    None => {
                        tracing::warn!(
                            show = show_id,
                            episode = %program_id,
                            "Dropping episode with missing or malformed fields"
                        );
                    }
                }

                if limit.is_some_and(|l| episodes.len() >= l) {
                    break 'seasons;
                }
            }
        }
        Ok(episodes)
    }

    /// Resolves the playback manifest for one program. A missing manifest
    /// or unexpected status skips the episode rather than failing the show.
    async fn resolve_stream(
        &self,
        program_id: &str,
    ) -> Result<Option<(String, String)>, CatalogError> {
        let path = format!("/playback/manifest/program/{program_id}");
        match self.get_json::<Manifest>(&path).await {
            Ok(manifest) => Ok(manifest.hls_stream()),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                tracing::debug!(program = program_id, error = %e, "No manifest for program");
                Ok(None)
            }
        }
    }

    /// Fetches chapter markers (index points) for a program. Missing data
    /// yields an empty list, never an error.
    async fn fetch_chapters(&self, program_id: &str) -> Result<Vec<Chapter>, CatalogError> {
        let path = format!("/tv/catalog/programs/{program_id}");
        match self.get_json::<ProgramDetails>(&path).await {
            Ok(details) => Ok(details.into_chapters()),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                tracing::debug!(program = program_id, error = %e, "No index points for program");
                Ok(Vec::new())
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.http.get(&url).send())
            .await
            .map_err(|_| CatalogError::Timeout)?
            .map_err(CatalogError::Unavailable)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                CatalogError::Decode {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            } else {
                CatalogError::Unavailable(e)
            }
        })
    }
}

/// Channel-level fallbacks fetched from the catalog.
#[derive(Debug, Clone)]
pub struct ShowDetails {
    pub title: Option<String>,
    pub image: Option<String>,
}
