//! FileTracker: read-before-write interlock for file-mutating tools.
//!
//! A tool that edits a file by line range corrupts it if the file changed
//! out-of-band since the model last saw it. FileTracker makes that precise:
//! per absolute path it remembers whether the path was read in this session
//! and the mtime observed at that read. A write/update is only allowed when
//! both still hold; either way, the entry resets afterward so a second write
//! requires a fresh read.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy)]
struct Entry {
    mtime: Option<SystemTime>,
    was_read: bool,
}

/// Tracks per-path read/write state for one [`crate::agent_client::AgentClient`].
///
/// Not `Send`-restricted by any interior mutability choice of its own; callers
/// needing shared access wrap it in `Arc<Mutex<_>>`, matching the single-writer
/// discipline the rest of the runtime uses for mutable component state.
#[derive(Debug, Default)]
pub struct FileTracker {
    entries: HashMap<PathBuf, Entry>,
}

impl FileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` was read just now, capturing its current mtime.
    /// Missing files are tracked with `mtime=None` (a subsequent write must
    /// still pass `record_write`'s existence/mtime checks if the file then
    /// exists).
    pub fn record_read(&mut self, path: &Path) -> Result<()> {
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        self.entries.insert(path.to_path_buf(), Entry { mtime, was_read: true });
        Ok(())
    }

    /// Enforce (when `require_read_before_write`) that `path` was read and is
    /// unchanged since, then reset its entry to `was_read=false`. When
    /// `allow_create` is true and the file does not yet exist, the check is
    /// skipped — there is nothing to have read.
    pub fn record_write(&mut self, path: &Path, allow_create: bool, require_read_before_write: bool) -> Result<()> {
        let exists = path.exists();
        if !exists && allow_create {
            self.entries.insert(path.to_path_buf(), Entry { mtime: None, was_read: false });
            return Ok(());
        }

        if require_read_before_write && exists {
            self.check_read_and_unchanged(path)?;
        }

        self.entries.insert(path.to_path_buf(), Entry { mtime: None, was_read: false });
        Ok(())
    }

    /// Same invariants as [`Self::record_write`], but the file must already
    /// exist (an Update cannot create a file).
    pub fn record_update(&mut self, path: &Path, require_read_before_write: bool) -> Result<()> {
        if !path.exists() {
            return Err(Error::FileTracker(crate::error::FileTrackerErrorKind::FileNotFound {
                path: path.display().to_string(),
            }));
        }
        self.record_write(path, false, require_read_before_write)
    }

    fn check_read_and_unchanged(&self, path: &Path) -> Result<()> {
        let entry = self.entries.get(path);
        let was_read = entry.map(|e| e.was_read).unwrap_or(false);
        if !was_read {
            return Err(Error::FileTracker(crate::error::FileTrackerErrorKind::FileNotRead {
                path: path.display().to_string(),
            }));
        }

        let current_mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let recorded_mtime = entry.and_then(|e| e.mtime);
        if current_mtime != recorded_mtime {
            return Err(Error::FileTracker(crate::error::FileTrackerErrorKind::FileModifiedExternally {
                path: path.display().to_string(),
            }));
        }

        Ok(())
    }

    pub fn was_read(&self, path: &Path) -> bool {
        self.entries.get(path).map(|e| e.was_read).unwrap_or(false)
    }

    pub fn clear(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}
