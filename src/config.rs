//! Configuration file parser for nrkcast.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the NRK PSAPI. Overridable so tests can point at a mock.
    pub api_base_url: String,

    /// Public base URL under which generated files are served. Feed and
    /// chapter URLs embedded in the documents are derived from this.
    pub site_base_url: String,

    /// Path to the tracked-show registry file.
    pub registry_path: PathBuf,

    /// Output directory for audio feed documents.
    pub audio_feeds_dir: PathBuf,

    /// Output directory for video feed documents.
    pub video_feeds_dir: PathBuf,

    /// Output directory for external chapter JSON documents.
    pub chapters_dir: PathBuf,

    /// Episodes kept per feed unless the entry is archival or carries its
    /// own override.
    pub episode_window: usize,

    /// Maximum number of entries built concurrently.
    pub concurrency: usize,

    /// Whether newly discovered audio shows start out enabled. Video shows
    /// are never auto-discovered regardless of this setting.
    pub auto_enable_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://psapi.nrk.no".to_string(),
            site_base_url: "https://example.github.io/nrkcast".to_string(),
            registry_path: PathBuf::from("programs.json"),
            audio_feeds_dir: PathBuf::from("docs/rss/audio"),
            video_feeds_dir: PathBuf::from("docs/rss/video"),
            chapters_dir: PathBuf::from("docs/chapters"),
            episode_window: 10,
            concurrency: 4,
            auto_enable_audio: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading so a corrupted file cannot exhaust
        // memory.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "api_base_url",
                "site_base_url",
                "registry_path",
                "audio_feeds_dir",
                "video_feeds_dir",
                "chapters_dir",
                "episode_window",
                "concurrency",
                "auto_enable_audio",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), api = %config.api_base_url, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
