//! Wire models for NRK PSAPI responses and their typed domain counterparts.
//!
//! Upstream shapes are an unstable external contract: every field that has
//! ever been observed missing is `Option` (or `#[serde(default)]`), and
//! conversion to domain types drops individual malformed episodes instead
//! of failing a whole fetch.
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ============================================================================
// Domain Types
// ============================================================================

/// Whether a show is an audio podcast or a TV series with HLS streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowKind {
    Audio,
    Video,
}

impl std::fmt::Display for ShowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShowKind::Audio => write!(f, "audio"),
            ShowKind::Video => write!(f, "video"),
        }
    }
}

/// A show as listed by the catalog. Ephemeral — fetched fresh each
/// discovery run, never persisted directly.
#[derive(Debug, Clone)]
pub struct CatalogShow {
    pub id: String,
    pub title: String,
    pub kind: ShowKind,
}

/// Media reference for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// Direct audio file URL.
    Audio { url: String },
    /// HLS streaming manifest plus the MIME type reported by the manifest.
    Video { manifest_url: String, mime: String },
}

/// One playable episode, recomputed from the catalog on every build.
#[derive(Debug, Clone)]
pub struct Episode {
    /// Catalog-assigned identifier, stable across fetches. Feed-entry guids
    /// are derived from this so regenerated feeds keep their item identity.
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub published: DateTime<Utc>,
    pub duration_secs: u64,
    pub media: MediaRef,
    pub image: Option<String>,
    /// Index points, ordered by start offset. Empty is the normal case for
    /// shows without chapter markers.
    pub chapters: Vec<Chapter>,
}

/// A chapter marker within an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub start_secs: u64,
    pub title: String,
    pub image: Option<String>,
    pub link: Option<String>,
}

// ============================================================================
// Wire Types — series listing
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesSearchPage {
    #[serde(default)]
    pub series: Vec<SeriesListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesListItem {
    pub series_id: Option<String>,
    pub title: Option<String>,
    /// Catalog discriminator ("podcast", "series", ...). Anything that is
    /// not explicitly a TV series is treated as audio.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl SeriesListItem {
    pub(crate) fn into_show(self) -> Option<CatalogShow> {
        let id = self.series_id.filter(|s| !s.is_empty())?;
        let kind = match self.kind.as_deref() {
            Some("tv") | Some("tvSeries") => ShowKind::Video,
            _ => ShowKind::Audio,
        };
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_id(&id));
        Some(CatalogShow { id, title, kind })
    }
}

// ============================================================================
// Wire Types — podcast episodes (audio)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PodcastEpisodesPage {
    #[serde(rename = "_embedded", default)]
    pub embedded: PodcastEpisodesEmbedded,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PodcastEpisodesEmbedded {
    #[serde(default)]
    pub episodes: Vec<WireEpisode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEpisode {
    pub episode_id: Option<String>,
    #[serde(default)]
    pub titles: WireTitles,
    pub date: Option<String>,
    pub duration: Option<String>,
    #[serde(default)]
    pub duration_in_seconds: u64,
    /// Direct media URL for podcast episodes.
    pub url: Option<String>,
    #[serde(default)]
    pub image: Vec<WireImage>,
    #[serde(default)]
    pub availability: WireAvailability,
}

impl WireEpisode {
    /// Converts to a domain episode, or `None` when a required field is
    /// missing (id, date, or media URL). Callers log and skip those.
    pub(crate) fn into_episode(self) -> Option<Episode> {
        if self.availability.is_upcoming() {
            return None;
        }
        let id = self.episode_id.filter(|s| !s.is_empty())?;
        let published = parse_timestamp(self.date.as_deref()?)?;
        let url = self.url.filter(|u| !u.is_empty())?;
        let duration_secs = effective_duration(self.duration.as_deref(), self.duration_in_seconds);
        Some(Episode {
            title: normalize_episode_title(self.titles.title.as_deref().unwrap_or(&id)),
            subtitle: self.titles.subtitle,
            published,
            duration_secs,
            media: MediaRef::Audio { url },
            image: best_image(&self.image),
            chapters: Vec::new(),
            id,
        })
    }
}

/// Podcast catalog entry, used for channel-level title/artwork fallbacks.
#[derive(Debug, Deserialize)]
pub(crate) struct PodcastMetadata {
    pub series: Option<PodcastSeries>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PodcastSeries {
    #[serde(default)]
    pub titles: WireTitles,
    #[serde(default)]
    pub image: Vec<WireImage>,
}

impl PodcastMetadata {
    pub(crate) fn title(&self) -> Option<String> {
        self.series
            .as_ref()
            .and_then(|s| s.titles.title.clone())
            .filter(|t| !t.is_empty())
    }

    pub(crate) fn image(&self) -> Option<String> {
        self.series.as_ref().and_then(|s| best_image(&s.image))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireTitles {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireImage {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireAvailability {
    pub status: Option<String>,
}

impl WireAvailability {
    /// Episodes announced but not yet playable carry status "coming".
    pub(crate) fn is_upcoming(&self) -> bool {
        self.status.as_deref() == Some("coming")
    }
}

// ============================================================================
// Wire Types — TV series metadata and instalments (video)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TvSeriesMetadata {
    #[serde(default)]
    pub navigation: TvNavigation,
    #[serde(default)]
    pub news: Option<TvNews>,
}

impl TvSeriesMetadata {
    /// Season identifiers in catalog order (most recent first upstream).
    pub(crate) fn season_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for section in &self.navigation.sections {
            if section.section_type.as_deref() != Some("subnavigation") {
                continue;
            }
            for sub in &section.sections {
                if sub.section_type.as_deref() == Some("season") {
                    if let Some(id) = sub.id.as_ref().filter(|s| !s.is_empty()) {
                        ids.push(id.clone());
                    }
                }
            }
        }
        ids
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.news
            .as_ref()
            .and_then(|n| n.titles.as_ref())
            .and_then(|t| t.title.clone())
            .filter(|t| !t.is_empty())
    }

    /// Highest-resolution image URL (upstream lists sizes ascending).
    pub(crate) fn image(&self) -> Option<String> {
        self.news
            .as_ref()
            .map(|n| best_image(&n.image))
            .unwrap_or(None)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TvNavigation {
    #[serde(default)]
    pub sections: Vec<TvSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TvSection {
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub sections: Vec<TvSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TvNews {
    pub titles: Option<WireTitles>,
    #[serde(default)]
    pub image: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeasonPage {
    #[serde(rename = "_embedded", default)]
    pub embedded: SeasonEmbedded,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeasonEmbedded {
    #[serde(default)]
    pub instalments: Vec<WireInstalment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireInstalment {
    pub prf_id: Option<String>,
    #[serde(default)]
    pub titles: WireTitles,
    pub duration: Option<String>,
    #[serde(default)]
    pub duration_in_seconds: u64,
    pub release_date_on_demand: Option<String>,
    pub first_transmission_date_display_value: Option<String>,
    #[serde(default)]
    pub image: Vec<WireImage>,
    #[serde(default)]
    pub availability: WireAvailability,
}

impl WireInstalment {
    pub(crate) fn program_id(&self) -> Option<&str> {
        self.prf_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Converts to a domain episode once the manifest has resolved the HLS
    /// stream. Returns `None` on missing id or unparseable dates.
    pub(crate) fn into_episode(self, manifest_url: String, mime: String) -> Option<Episode> {
        let id = self.prf_id.filter(|s| !s.is_empty())?;
        let published = self
            .release_date_on_demand
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| {
                self.first_transmission_date_display_value
                    .as_deref()
                    .and_then(parse_timestamp)
            })?;
        let duration_secs = effective_duration(self.duration.as_deref(), self.duration_in_seconds);
        Some(Episode {
            title: normalize_episode_title(self.titles.title.as_deref().unwrap_or(&id)),
            subtitle: self.titles.subtitle,
            published,
            duration_secs,
            media: MediaRef::Video { manifest_url, mime },
            image: best_image(&self.image),
            chapters: Vec::new(),
            id,
        })
    }
}

// ============================================================================
// Wire Types — playback manifest and index points
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct Manifest {
    pub playable: Option<Playable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Playable {
    #[serde(default)]
    pub assets: Vec<ManifestAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManifestAsset {
    pub url: Option<String>,
    pub format: Option<String>,
    pub mime_type: Option<String>,
}

impl Manifest {
    /// Picks the HLS asset, falling back to the first asset with a URL.
    pub(crate) fn hls_stream(&self) -> Option<(String, String)> {
        let assets = &self.playable.as_ref()?.assets;
        let pick = assets
            .iter()
            .find(|a| a.format.as_deref() == Some("HLS"))
            .or_else(|| assets.first())?;
        let url = pick.url.clone().filter(|u| !u.is_empty())?;
        let mime = pick
            .mime_type
            .clone()
            .unwrap_or_else(|| crate::feed::HLS_MIME.to_string());
        Some((url, mime))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgramDetails {
    #[serde(default)]
    pub index_points: Vec<WireIndexPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireIndexPoint {
    pub title: Option<String>,
    pub start_point: Option<String>,
    #[serde(default)]
    pub image: Vec<WireImage>,
}

impl ProgramDetails {
    pub(crate) fn into_chapters(self) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = self
            .index_points
            .into_iter()
            .filter_map(|p| {
                let title = p.title.filter(|t| !t.is_empty())?;
                let start_secs = parse_iso_duration(p.start_point.as_deref()?)?;
                Some(Chapter {
                    start_secs,
                    title,
                    image: best_image(&p.image),
                    link: None,
                })
            })
            .collect();
        chapters.sort_by_key(|c| c.start_secs);
        chapters
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Parses an upstream timestamp (RFC 3339 with offset) into UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an ISO 8601 duration like `PT43M33.76S` into whole seconds.
/// Returns `None` for empty or unrecognized input.
pub fn parse_iso_duration(raw: &str) -> Option<u64> {
    let rest = raw.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut total = 0f64;
    let mut number = String::new();
    for ch in rest.chars() {
        match ch {
            '0'..='9' | '.' => number.push(ch),
            'H' | 'M' | 'S' => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                total += match ch {
                    'H' => value * 3600.0,
                    'M' => value * 60.0,
                    _ => value,
                };
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None; // trailing digits without a unit
    }
    Some(total as u64)
}

fn effective_duration(iso: Option<&str>, fallback_secs: u64) -> u64 {
    iso.and_then(parse_iso_duration)
        .filter(|&d| d > 0)
        .unwrap_or(fallback_secs)
}

/// Highest-resolution image URL; upstream orders variants ascending by size.
pub(crate) fn best_image(images: &[WireImage]) -> Option<String> {
    images
        .iter()
        .rev()
        .find_map(|img| img.url.clone().filter(|u| !u.is_empty()))
}

/// Strips the dynamic temporal prefix from NRK episode titles.
///
/// News programs use titles like "I dag · Dagsrevyen" where the prefix
/// changes over time (I dag → I går → weekday → date), which makes clients
/// show duplicates. Everything up to the first " · " separator is dropped,
/// as is a leading "– " dash.
pub fn normalize_episode_title(title: &str) -> String {
    let title = match title.split_once(" · ") {
        Some((_, rest)) => rest,
        None => title,
    };
    title.strip_prefix("– ").unwrap_or(title).to_string()
}

/// Fallback display title derived from a series id ("dagsrevyen-21" →
/// "Dagsrevyen 21").
pub(crate) fn title_from_id(id: &str) -> String {
    id.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration("PT43M33.76S"), Some(2613));
        assert_eq!(parse_iso_duration("PT1H30M0S"), Some(5400));
        assert_eq!(parse_iso_duration("PT5M"), Some(300));
        assert_eq!(parse_iso_duration("PT30S"), Some(30));
        assert_eq!(parse_iso_duration("PT1H"), Some(3600));
        assert_eq!(parse_iso_duration("PT1H5M30S"), Some(3930));
        assert_eq!(parse_iso_duration(""), None);
        assert_eq!(parse_iso_duration("PT"), None);
        assert_eq!(parse_iso_duration("garbage"), None);
    }

    #[test]
    fn test_normalize_episode_title() {
        assert_eq!(
            normalize_episode_title("I dag · Dagsrevyen"),
            "Dagsrevyen"
        );
        assert_eq!(
            normalize_episode_title("12. oktober · Dagsrevyen 21"),
            "Dagsrevyen 21"
        );
        assert_eq!(normalize_episode_title("– Kveldsnytt"), "Kveldsnytt");
        assert_eq!(normalize_episode_title("Plain title"), "Plain title");
    }

    #[test]
    fn test_title_from_id() {
        assert_eq!(title_from_id("dagsrevyen-21"), "Dagsrevyen 21");
        assert_eq!(title_from_id("kveldsnytt"), "Kveldsnytt");
    }

    #[test]
    fn test_episode_missing_required_fields_dropped() {
        // No episodeId
        let ep: WireEpisode = serde_json::from_value(serde_json::json!({
            "titles": {"title": "T"},
            "date": "2024-01-01T20:00:00+01:00",
            "url": "https://media.example/ep.mp3"
        }))
        .unwrap();
        assert!(ep.into_episode().is_none());

        // No media URL
        let ep: WireEpisode = serde_json::from_value(serde_json::json!({
            "episodeId": "e1",
            "date": "2024-01-01T20:00:00+01:00"
        }))
        .unwrap();
        assert!(ep.into_episode().is_none());

        // Unparseable date
        let ep: WireEpisode = serde_json::from_value(serde_json::json!({
            "episodeId": "e1",
            "date": "yesterday-ish",
            "url": "https://media.example/ep.mp3"
        }))
        .unwrap();
        assert!(ep.into_episode().is_none());
    }

    #[test]
    fn test_episode_complete_converts() {
        let ep: WireEpisode = serde_json::from_value(serde_json::json!({
            "episodeId": "l_e1",
            "titles": {"title": "I dag · Nyheter", "subtitle": "Kort oppsummert"},
            "date": "2024-01-01T20:00:00+01:00",
            "duration": "PT20M",
            "url": "https://media.example/ep.mp3",
            "image": [
                {"url": "https://img.example/small.jpg"},
                {"url": "https://img.example/large.jpg"}
            ]
        }))
        .unwrap();
        let ep = ep.into_episode().unwrap();
        assert_eq!(ep.id, "l_e1");
        assert_eq!(ep.title, "Nyheter");
        assert_eq!(ep.duration_secs, 1200);
        assert_eq!(ep.image.as_deref(), Some("https://img.example/large.jpg"));
        assert_eq!(
            ep.media,
            MediaRef::Audio {
                url: "https://media.example/ep.mp3".into()
            }
        );
        // 20:00+01:00 == 19:00Z
        assert_eq!(ep.published.to_rfc3339(), "2024-01-01T19:00:00+00:00");
    }

    #[test]
    fn test_upcoming_episode_skipped() {
        let ep: WireEpisode = serde_json::from_value(serde_json::json!({
            "episodeId": "e1",
            "date": "2099-01-01T20:00:00+01:00",
            "url": "https://media.example/ep.mp3",
            "availability": {"status": "coming"}
        }))
        .unwrap();
        assert!(ep.into_episode().is_none());
    }

    #[test]
    fn test_manifest_prefers_hls_asset() {
        let manifest: Manifest = serde_json::from_value(serde_json::json!({
            "playable": {"assets": [
                {"url": "https://s.example/a.mpd", "format": "DASH", "mimeType": "application/dash+xml"},
                {"url": "https://s.example/a.m3u8", "format": "HLS", "mimeType": "application/vnd.apple.mpegurl"}
            ]}
        }))
        .unwrap();
        let (url, mime) = manifest.hls_stream().unwrap();
        assert_eq!(url, "https://s.example/a.m3u8");
        assert_eq!(mime, "application/vnd.apple.mpegurl");
    }

    #[test]
    fn test_manifest_falls_back_to_first_asset() {
        let manifest: Manifest = serde_json::from_value(serde_json::json!({
            "playable": {"assets": [
                {"url": "https://s.example/a.mpd", "format": "DASH", "mimeType": "application/dash+xml"}
            ]}
        }))
        .unwrap();
        let (url, mime) = manifest.hls_stream().unwrap();
        assert_eq!(url, "https://s.example/a.mpd");
        assert_eq!(mime, "application/dash+xml");
    }

    #[test]
    fn test_manifest_without_playable_is_none() {
        let manifest: Manifest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(manifest.hls_stream().is_none());
        let manifest: Manifest =
            serde_json::from_value(serde_json::json!({"playable": null})).unwrap();
        assert!(manifest.hls_stream().is_none());
    }

    #[test]
    fn test_season_ids_walks_subnavigation() {
        let meta: TvSeriesMetadata = serde_json::from_value(serde_json::json!({
            "navigation": {"sections": [
                {"type": "other", "sections": []},
                {"type": "subnavigation", "sections": [
                    {"type": "season", "id": "202402"},
                    {"type": "banner", "id": "x"},
                    {"type": "season", "id": "202401"}
                ]}
            ]}
        }))
        .unwrap();
        assert_eq!(meta.season_ids(), vec!["202402", "202401"]);
    }

    #[test]
    fn test_index_points_sorted_and_filtered() {
        let details: ProgramDetails = serde_json::from_value(serde_json::json!({
            "indexPoints": [
                {"title": "Sport", "startPoint": "PT20M"},
                {"title": "Innenriks", "startPoint": "PT0S"},
                {"title": "", "startPoint": "PT5M"},
                {"title": "No offset"}
            ]
        }))
        .unwrap();
        let chapters = details.into_chapters();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Innenriks");
        assert_eq!(chapters[0].start_secs, 0);
        assert_eq!(chapters[1].title, "Sport");
        assert_eq!(chapters[1].start_secs, 1200);
    }
}
