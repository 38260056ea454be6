//! Tracked-show registry: the durable JSON list of shows feeds are built
//! for.
//!
//! The file is read wholesale at run start and written wholesale at run
//! end via an atomic temp-file-then-rename replacement, so concurrent
//! readers never observe a partial write. Discovery only appends; existing
//! entries are manual curation and are preserved verbatim.
use crate::catalog::ShowKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or unparseable registry file. Fatal for the run: no
    /// partial write is attempted on top of a corrupt file.
    #[error("Registry file is corrupt: {0}")]
    Corrupt(String),
}

/// One tracked show. Created by discovery or manual edit, never deleted
/// automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Catalog series identifier.
    pub id: String,
    /// Display title; may diverge from the catalog title after manual edits.
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ShowKind,
    /// Restricts builds to one season when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    pub enabled: bool,
    /// Keep every episode instead of the bounded recent window.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub archival: bool,
    /// Per-entry window override; falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<usize>,
    /// Curated artwork URL overriding the catalog image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}

/// In-memory registry bound to its backing file.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Loads the registry. A missing file is an empty registry; anything
    /// unparseable is [`RegistryError::Corrupt`].
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No registry file, starting empty");
                return Ok(Self {
                    path: path.to_path_buf(),
                    entries: Vec::new(),
                });
            }
            Err(e) => return Err(RegistryError::Io(e)),
        };

        let entries: Vec<RegistryEntry> = serde_json::from_str(&content)
            .map_err(|e| RegistryError::Corrupt(e.to_string()))?;

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(RegistryError::Corrupt(format!(
                    "duplicate entry id {:?}",
                    entry.id
                )));
            }
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded registry");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Enabled entries of one kind, in registry order.
    pub fn enabled(&self, kind: ShowKind) -> Vec<&RegistryEntry> {
        self.entries
            .iter()
            .filter(|e| e.enabled && e.kind == kind)
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Appends new entries in the given order, skipping ids already
    /// tracked. Existing entries are never reordered or mutated. Returns
    /// the number actually added.
    pub fn append(&mut self, new_entries: Vec<RegistryEntry>) -> usize {
        let mut added = 0;
        for entry in new_entries {
            if self.contains(&entry.id) {
                tracing::debug!(id = %entry.id, "Skipping already-tracked show");
                continue;
            }
            self.entries.push(entry);
            added += 1;
        }
        added
    }

    /// Persists the whole list atomically: serialize in memory, write to a
    /// randomized temp file in the same directory, fsync, then rename over
    /// the destination. A crash mid-write never leaves a partial file
    /// visible.
    pub fn save(&self) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| RegistryError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Randomized temp name so a concurrent save cannot collide.
        use std::time::{SystemTime, UNIX_EPOCH};
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", suffix));

        let result = (|| {
            let mut temp = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            temp.write_all(json.as_bytes())?;
            temp.write_all(b"\n")?;
            temp.sync_all()?;
            drop(temp);
            std::fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(RegistryError::Io(e));
        }

        tracing::info!(path = %self.path.display(), entries = self.entries.len(), "Saved registry");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> RegistryEntry {
        RegistryEntry {
            id: id.to_string(),
            title: format!("Show {id}"),
            kind: ShowKind::Audio,
            season: None,
            enabled: true,
            archival: false,
            episodes: None,
            artwork: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(&dir.path().join("programs.json")).unwrap();
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");

        let mut registry = Registry::load(&path).unwrap();
        registry.append(vec![entry("a"), entry("b")]);
        registry.save().unwrap();

        let reloaded = Registry::load(&path).unwrap();
        assert_eq!(reloaded.entries(), registry.entries());
    }

    #[test]
    fn test_append_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::load(&dir.path().join("programs.json")).unwrap();

        assert_eq!(registry.append(vec![entry("a")]), 1);
        let mut duplicate = entry("a");
        duplicate.title = "Renamed".to_string();
        assert_eq!(registry.append(vec![duplicate, entry("b")]), 1);

        assert_eq!(registry.entries().len(), 2);
        // The original "a" is untouched
        assert_eq!(registry.entries()[0].title, "Show a");
        assert_eq!(registry.entries()[1].id, "b");
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Registry::load(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt(_)));
    }

    #[test]
    fn test_duplicate_ids_in_file_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","title":"A","type":"audio","enabled":true},
               {"id":"a","title":"A again","type":"audio","enabled":false}]"#,
        )
        .unwrap();

        let err = Registry::load(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt(_)));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");

        let mut registry = Registry::load(&path).unwrap();
        registry.append(vec![entry("a")]);
        registry.save().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["programs.json"]);
    }

    #[test]
    fn test_optional_fields_default_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","title":"A","type":"video","season":"202401","enabled":false}]"#,
        )
        .unwrap();

        let registry = Registry::load(&path).unwrap();
        let e = &registry.entries()[0];
        assert_eq!(e.kind, ShowKind::Video);
        assert_eq!(e.season.as_deref(), Some("202401"));
        assert!(!e.enabled);
        assert!(!e.archival);
        assert!(e.episodes.is_none());
        assert!(e.artwork.is_none());
    }

    #[test]
    fn test_enabled_filters_kind_and_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::load(&dir.path().join("programs.json")).unwrap();
        let mut disabled = entry("b");
        disabled.enabled = false;
        let mut video = entry("c");
        video.kind = ShowKind::Video;
        registry.append(vec![entry("a"), disabled, video]);

        let audio: Vec<&str> = registry
            .enabled(ShowKind::Audio)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(audio, vec!["a"]);
        assert_eq!(registry.enabled(ShowKind::Video).len(), 1);
    }
}
