//! RSS 2.0 rendering with iTunes, Podcasting 2.0, and Podlove Simple
//! Chapters extensions.
//!
//! The whole document is rendered in memory; writing it to disk is the
//! output writer's concern. Video feeds carry the Podcasting 2.0 channel
//! tags (`podcast:guid`, `podcast:medium`, ...) plus per-item
//! `podcast:alternateEnclosure`, an external `podcast:chapters` reference,
//! and an inline `psc:chapters` block for clients that predate the JSON
//! chapter format.
use crate::catalog::{MediaRef, ShowKind};
use crate::feed::build::{FeedDocument, FeedEntry};
use crate::feed::chapters::format_npt;
use crate::feed::{GENERATOR, HLS_MIME};
use anyhow::{Context, Result};
use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use uuid::Uuid;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const PODCAST_NS: &str = "https://podcastindex.org/namespace/1.0";
const PSC_NS: &str = "http://podlove.org/simple-chapters";

/// Namespace UUID defined by the Podcasting 2.0 spec for `podcast:guid`.
const PODCAST_GUID_NS: Uuid = Uuid::from_bytes([
    0xea, 0xd4, 0xc2, 0x36, 0xbf, 0x58, 0x58, 0xc6, 0xa2, 0xc6, 0xa6, 0xb2, 0x8d, 0x12, 0x8c,
    0xb6,
]);

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// UUIDv5 of the feed URL stripped of scheme and trailing slashes, per the
/// Podcasting 2.0 `podcast:guid` rules. Stable for a given feed location.
pub fn podcast_guid(feed_url: &str) -> String {
    let stripped = feed_url
        .strip_prefix("https://")
        .or_else(|| feed_url.strip_prefix("http://"))
        .unwrap_or(feed_url)
        .trim_end_matches('/');
    Uuid::new_v5(&PODCAST_GUID_NS, stripped.as_bytes()).to_string()
}

/// Renders a complete RSS document as a UTF-8 string.
pub fn render(doc: &FeedDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    rss.push_attribute(("xmlns:podcast", PODCAST_NS));
    if doc.kind == ShowKind::Video {
        rss.push_attribute(("xmlns:psc", PSC_NS));
    }
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;

    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_channel_metadata(&mut writer, doc)?;
    for entry in &doc.entries {
        write_item(&mut writer, doc, entry)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).context("Generated RSS contains invalid UTF-8")
}

fn write_channel_metadata(writer: &mut XmlWriter, doc: &FeedDocument) -> Result<()> {
    text_element(writer, "title", &doc.title)?;
    text_element(writer, "link", &doc.link)?;
    text_element(writer, "description", &doc.description)?;
    text_element(writer, "language", "no")?;
    text_element(writer, "generator", GENERATOR)?;
    text_element(writer, "lastBuildDate", &Utc::now().to_rfc2822())?;

    if let Some(image) = &doc.image {
        empty_element(writer, "itunes:image", &[("href", image.as_str())])?;
    }
    text_element(writer, "itunes:author", "NRK")?;
    // Unofficial feeds stay out of the iTunes directory
    text_element(writer, "itunes:block", "Yes")?;
    text_element(writer, "itunes:explicit", "false")?;
    empty_element(writer, "itunes:category", &[("text", "News")])?;

    if doc.kind == ShowKind::Video {
        text_element(writer, "podcast:guid", &podcast_guid(&doc.feed_url))?;
        text_element(writer, "podcast:locked", "yes")?;
        text_element(writer, "podcast:medium", "video")?;
        person_element(writer)?;
    }
    Ok(())
}

fn write_item(writer: &mut XmlWriter, doc: &FeedDocument, entry: &FeedEntry) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    text_element(writer, "title", &entry.title)?;
    if let Some(description) = &entry.description {
        text_element(writer, "description", description)?;
    }

    // Guid derives from the catalog episode id, not the window position,
    // so regenerated feeds keep item identity.
    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer
        .write_event(Event::Start(guid))
        .context("Failed to write guid element")?;
    writer
        .write_event(Event::Text(BytesText::new(&entry.guid)))
        .context("Failed to write guid text")?;
    writer
        .write_event(Event::End(BytesEnd::new("guid")))
        .context("Failed to write guid end")?;

    text_element(writer, "pubDate", &entry.published.to_rfc2822())?;
    text_element(writer, "itunes:duration", &entry.duration_secs.to_string())?;
    if let Some(image) = &entry.image {
        empty_element(writer, "itunes:image", &[("href", image.as_str())])?;
    }

    match &entry.media {
        MediaRef::Audio { url } => {
            empty_element(
                writer,
                "enclosure",
                &[("url", url.as_str()), ("type", "audio/mpeg"), ("length", "0")],
            )?;
        }
        MediaRef::Video { manifest_url, mime } => {
            empty_element(
                writer,
                "enclosure",
                &[
                    ("url", manifest_url.as_str()),
                    ("type", mime.as_str()),
                    ("length", "0"),
                ],
            )?;
            write_alternate_enclosure(writer, manifest_url)?;
            if let Some(chapters_url) = &entry.chapters_url {
                empty_element(
                    writer,
                    "podcast:chapters",
                    &[
                        ("url", chapters_url.as_str()),
                        ("type", "application/json+chapters"),
                    ],
                )?;
            }
            if !entry.chapters.is_empty() {
                write_psc_chapters(writer, entry)?;
            }
            person_element(writer)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_alternate_enclosure(writer: &mut XmlWriter, manifest_url: &str) -> Result<()> {
    let mut alt = BytesStart::new("podcast:alternateEnclosure");
    alt.push_attribute(("type", HLS_MIME));
    alt.push_attribute(("length", "0"));
    alt.push_attribute(("default", "true"));
    alt.push_attribute(("title", "HLS Video Stream"));
    writer
        .write_event(Event::Start(alt))
        .context("Failed to write alternateEnclosure element")?;
    empty_element(writer, "podcast:source", &[("uri", manifest_url)])?;
    writer
        .write_event(Event::End(BytesEnd::new("podcast:alternateEnclosure")))
        .context("Failed to write alternateEnclosure end")?;
    Ok(())
}

fn write_psc_chapters(writer: &mut XmlWriter, entry: &FeedEntry) -> Result<()> {
    let mut psc = BytesStart::new("psc:chapters");
    psc.push_attribute(("version", "1.2"));
    writer
        .write_event(Event::Start(psc))
        .context("Failed to write psc:chapters element")?;

    for chapter in &entry.chapters {
        let mut elem = BytesStart::new("psc:chapter");
        let start = format_npt(chapter.start_secs);
        elem.push_attribute(("start", start.as_str()));
        elem.push_attribute(("title", chapter.title.as_str()));
        if let Some(image) = &chapter.image {
            elem.push_attribute(("image", image.as_str()));
        }
        if let Some(link) = &chapter.link {
            elem.push_attribute(("href", link.as_str()));
        }
        writer
            .write_event(Event::Empty(elem))
            .context("Failed to write psc:chapter element")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("psc:chapters")))
        .context("Failed to write psc:chapters end")?;
    Ok(())
}

fn person_element(writer: &mut XmlWriter) -> Result<()> {
    let mut person = BytesStart::new("podcast:person");
    person.push_attribute(("role", "host"));
    person.push_attribute(("href", "https://www.nrk.no"));
    writer
        .write_event(Event::Start(person))
        .context("Failed to write person element")?;
    writer
        .write_event(Event::Text(BytesText::new("NRK")))
        .context("Failed to write person text")?;
    writer
        .write_event(Event::End(BytesEnd::new("podcast:person")))
        .context("Failed to write person end")?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

fn empty_element(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer
        .write_event(Event::Empty(elem))
        .with_context(|| format!("Failed to write {name} element"))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
