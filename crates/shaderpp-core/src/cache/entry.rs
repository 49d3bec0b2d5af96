use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

use crate::fs::FileSystem;

/// A file reached while expanding a cached entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedFile {
    /// Path as written in the directive
    pub requested: PathBuf,

    /// File it resolved to
    pub resolved: PathBuf,

    /// Last write time of `resolved` when it was expanded
    pub modified: SystemTime,
}

/// Fully flattened text of one requested path
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Requested path this entry is stored under
    pub path: PathBuf,

    /// File `path` resolved to when the text was produced
    pub resolved: PathBuf,

    /// Last write time of the resolved file when the text was produced
    pub last_write_time: SystemTime,

    /// Complete expansion, never a partial one
    pub expanded_text: String,

    /// Every file included beneath `path`, depth-first, in the order the
    /// expansion first reached them
    pub includes: Vec<IncludedFile>,
}

impl CacheEntry {
    pub fn new(
        path: PathBuf,
        resolved: PathBuf,
        last_write_time: SystemTime,
        expanded_text: String,
        includes: Vec<IncludedFile>,
    ) -> Self {
        Self {
            path,
            resolved,
            last_write_time,
            expanded_text,
            includes,
        }
    }

    /// Whether the entry can be served when the requested path now resolves
    /// to `resolved` with timestamp `current`.
    ///
    /// The same spelling resolving to another file is stale. Equal timestamps
    /// count as fresh. Included files are probed too; a probe that fails makes
    /// the entry stale so the re-expansion reports the real error.
    pub fn is_fresh(&self, resolved: &Path, current: SystemTime, fs: &dyn FileSystem) -> bool {
        if resolved != self.resolved {
            trace!("{:?} now resolves to {:?}", self.path, resolved);
            return false;
        }

        if current > self.last_write_time {
            return false;
        }

        self.includes.iter().all(|included| {
            match fs.modified(&included.resolved) {
                Ok(modified) => modified <= included.modified,
                Err(e) => {
                    trace!("Could not probe {:?}: {}", included.resolved, e);
                    false
                }
            }
        })
    }
}
