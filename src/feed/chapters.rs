//! Chapter marshaling: the external Podcasting 2.0 JSON chapter document
//! and the Normal Play Time offsets used by the inline Podlove block.
//!
//! Both representations are derived from the same `Vec<Chapter>` carried
//! on the episode, so they can never diverge.
use crate::catalog::Chapter;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Podcasting 2.0 JSON chapters document (spec version 1.2.0).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaptersDocument {
    pub version: &'static str,
    pub title: String,
    pub author: &'static str,
    pub podcast_name: String,
    pub chapters: Vec<JsonChapter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonChapter {
    pub start_time: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChaptersDocument {
    pub fn new(episode_title: &str, podcast_name: &str, chapters: &[Chapter]) -> Self {
        Self {
            version: "1.2.0",
            title: episode_title.to_string(),
            author: "NRK",
            podcast_name: podcast_name.to_string(),
            chapters: chapters
                .iter()
                .map(|c| JsonChapter {
                    start_time: c.start_secs,
                    title: c.title.clone(),
                    img: c.image.clone(),
                    url: c.link.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// File name of the external chapter document for one episode:
/// `{series_id}-{YYYY-MM-DD}.json`.
pub fn chapters_filename(series_id: &str, published: DateTime<Utc>) -> String {
    format!("{}-{}.json", series_id, published.format("%Y-%m-%d"))
}

/// Formats seconds as Normal Play Time: `H:MM:SS` with hours, `M:SS`
/// without.
pub fn format_npt(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_npt() {
        assert_eq!(format_npt(0), "0:00");
        assert_eq!(format_npt(59), "0:59");
        assert_eq!(format_npt(60), "1:00");
        assert_eq!(format_npt(2613), "43:33");
        assert_eq!(format_npt(3600), "1:00:00");
        assert_eq!(format_npt(3930), "1:05:30");
    }

    #[test]
    fn test_chapters_filename() {
        let date = Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap();
        assert_eq!(
            chapters_filename("dagsrevyen-21", date),
            "dagsrevyen-21-2024-03-02.json"
        );
    }

    #[test]
    fn test_document_shape() {
        let chapters = vec![
            Chapter {
                start_secs: 0,
                title: "Innenriks".into(),
                image: None,
                link: None,
            },
            Chapter {
                start_secs: 1200,
                title: "Sport".into(),
                image: Some("https://img.example/sport.jpg".into()),
                link: None,
            },
        ];
        let doc = ChaptersDocument::new("Dagsrevyen", "Dagsrevyen 21", &chapters);
        let json: serde_json::Value =
            serde_json::from_slice(&doc.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], "1.2.0");
        assert_eq!(json["podcastName"], "Dagsrevyen 21");
        assert_eq!(json["chapters"][0]["startTime"], 0);
        assert_eq!(json["chapters"][1]["img"], "https://img.example/sport.jpg");
        // img key absent entirely when there is no image
        assert!(json["chapters"][0].get("img").is_none());
    }
}
