use crate::errors::{PreprocessError, Result};
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Maps a requested include path to a concrete file.
///
/// Lookup order is fixed: the including file's directory first, then each
/// search root in the order it was added. The first existing candidate wins.
pub struct IncludeResolver {
    fs: Arc<dyn FileSystem>,
    search_paths: Vec<PathBuf>,
}

impl IncludeResolver {
    pub fn new(fs: Arc<dyn FileSystem>, search_paths: Vec<PathBuf>) -> Self {
        Self { fs, search_paths }
    }

    /// Append a search root. Roots are never removed or reordered.
    pub fn add_search_path(&mut self, dir: impl Into<PathBuf>) {
        self.search_paths.push(dir.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve `requested` as seen from a file living in `parent_dir`.
    ///
    /// An empty `parent_dir` means "relative to the working directory", which is
    /// how the root of a parse is looked up.
    pub fn resolve(&self, requested: &Path, parent_dir: &Path) -> Result<PathBuf> {
        let candidate = parent_dir.join(requested);
        if self.fs.exists(&candidate) {
            debug!("Resolved {:?} relative to parent: {:?}", requested, candidate);
            return Ok(candidate);
        }

        for root in &self.search_paths {
            let candidate = root.join(requested);
            if self.fs.exists(&candidate) {
                debug!("Resolved {:?} in search root: {:?}", requested, candidate);
                return Ok(candidate);
            }
        }

        Err(PreprocessError::IncludeNotFound {
            path: requested.to_path_buf(),
        })
    }
}
