//! Watched-folder gate
//!
//! Optional short-circuit for the arbiter loop: when watched folders are
//! configured and none of them currently hold qualifying content, the tick
//! skips all client API calls. Saves the clients from being polled every few
//! seconds on a box with nothing queued.

use std::path::{Path, PathBuf};

use tracing::debug;

/// File extensions that indicate an in-flight artifact rather than content
/// worth arbitrating for.
const TRANSIENT_EXTENSIONS: &[&str] = &["part", "tmp", "!qB"];

/// Gate over the configured watched folders.
pub struct Gate {
    folders: Vec<PathBuf>,
}

impl Gate {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }

    /// Whether this tick should poll the clients at all.
    ///
    /// No folders configured means the gate is disabled and every tick
    /// polls. An unreadable or missing folder counts as empty.
    pub fn should_poll(&self) -> bool {
        if self.folders.is_empty() {
            return true;
        }
        self.folders.iter().any(|f| Self::has_content(f))
    }

    fn has_content(folder: &Path) -> bool {
        let entries = match std::fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(folder = %folder.display(), error = %e, "watched folder unreadable");
                return false;
            }
        };

        for entry in entries.flatten() {
            if Self::qualifies(&entry.path()) {
                return true;
            }
        }
        false
    }

    /// Anything except hidden dot-files and transient download artifacts.
    fn qualifies(path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if TRANSIENT_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(ext)) {
                return false;
            }
        }
        true
    }
}
