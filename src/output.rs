//! Atomic output writer for generated documents.
//!
//! Documents are always rendered fully in memory before this module is
//! involved. The write itself goes to a randomized temp file in the
//! destination directory (`create_new` so a concurrent writer cannot be
//! clobbered), is synced to disk, then renamed over the destination.
//! POSIX rename atomicity guarantees consumers never observe a partial
//! feed; every failure path removes the temp file.
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Atomically replaces `dst` with `content`. Parent directories are
/// created on demand.
pub fn write_atomic(dst: &Path, content: &[u8]) -> Result<(), WriteError> {
    let io_err = |source: std::io::Error| WriteError::Io {
        path: dst.display().to_string(),
        source,
    };

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    // Randomized temp filename so concurrent writers cannot collide and a
    // pre-created symlink cannot redirect the write.
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let result = (|| {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        // Sync so the rename never publishes a file whose data is still
        // in flight.
        temp_file.sync_all()?;
        drop(temp_file);
        std::fs::rename(&temp_path, dst)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_err(e));
    }

    Ok(())
}
