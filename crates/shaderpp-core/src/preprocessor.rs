use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEntry, IncludedFile, SourceCache};
use crate::config::PreprocessorConfig;
use crate::directive::{line_marker, parse_include};
use crate::errors::{PreprocessError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolver::IncludeResolver;

/// Output of a top-level parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    /// Flattened source with `#line` markers after every expanded include
    pub source: String,

    /// Requested include path -> resolved file, in the order the parse first
    /// reached them
    pub includes: IndexMap<PathBuf, PathBuf>,
}

/// Per-call state, created fresh for every top-level parse
#[derive(Default)]
struct ParseState {
    /// Requested paths entered so far. Never shrinks during a call, so a file
    /// reached twice anywhere in the tree is reported as circular.
    chain: FxHashSet<PathBuf>,

    includes: IndexMap<PathBuf, PathBuf>,
}

impl ParseState {
    fn enter(&mut self, requested: &Path) -> Result<()> {
        if !self.chain.insert(requested.to_path_buf()) {
            return Err(PreprocessError::CircularInclude {
                path: requested.to_path_buf(),
            });
        }
        Ok(())
    }
}

struct Expansion {
    text: String,
    resolved: PathBuf,
    modified: SystemTime,
    /// Everything included beneath this file, depth-first
    includes: Vec<IncludedFile>,
}

/// Recursive `#include` expander with a per-instance cache.
///
/// One instance is meant to live as long as the host's shader reload loop so
/// unchanged files are served from the cache. The instance is not shared
/// implicitly; callers that use it from several threads must serialize access.
pub struct Preprocessor {
    config: PreprocessorConfig,
    fs: Arc<dyn FileSystem>,
    resolver: IncludeResolver,
    cache: SourceCache,
}

impl Preprocessor {
    /// Create a preprocessor reading from the host file system
    pub fn new(config: PreprocessorConfig) -> Self {
        Self::with_file_system(config, Arc::new(RealFileSystem::new()))
    }

    /// Create a preprocessor with a custom file system (for testing)
    pub fn with_file_system(config: PreprocessorConfig, fs: Arc<dyn FileSystem>) -> Self {
        let resolver = IncludeResolver::new(fs.clone(), config.search_paths.clone());
        let cache = SourceCache::new(config.max_cache_entries);

        Self {
            config,
            fs,
            resolver,
            cache,
        }
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Append a search root after the existing ones
    pub fn add_search_directory(&mut self, dir: impl Into<PathBuf>) {
        self.resolver.add_search_path(dir);
    }

    /// Search roots in resolution order
    pub fn search_directories(&self) -> &[PathBuf] {
        self.resolver.search_paths()
    }

    /// Number of cached expansions
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Flatten the file at `path`, resolved relative to the working directory
    /// first and then the search roots.
    pub fn parse(&mut self, path: impl AsRef<Path>) -> Result<String> {
        self.parse_with_includes(path).map(|output| output.source)
    }

    /// Like [`parse`](Self::parse), also returning the include map.
    pub fn parse_with_includes(&mut self, path: impl AsRef<Path>) -> Result<Preprocessed> {
        let path = path.as_ref();
        let mut state = ParseState::default();

        let expansion = self
            .expand(path, None, &mut state)
            .inspect_err(|e| warn!("Preprocessing {:?} failed: {}", path, e))?;

        debug!(
            "Preprocessed {:?}: {} include(s), {} byte(s)",
            path,
            state.includes.len(),
            expansion.text.len()
        );

        Ok(Preprocessed {
            source: expansion.text,
            includes: state.includes,
        })
    }

    /// Flatten in-memory source whose includes resolve relative to
    /// `current_dir`. The source itself is neither cached nor part of the
    /// inclusion chain.
    pub fn parse_source(
        &mut self,
        source: &str,
        current_dir: impl AsRef<Path>,
    ) -> Result<Preprocessed> {
        let current_dir = current_dir.as_ref();
        let mut state = ParseState::default();

        let (text, _) = self
            .expand_text(source, current_dir, &mut state)
            .inspect_err(|e| warn!("Preprocessing source in {:?} failed: {}", current_dir, e))?;

        Ok(Preprocessed {
            source: text,
            includes: state.includes,
        })
    }

    /// Expand one requested path. `parent_dir` is `None` only for the root of
    /// a parse.
    fn expand(
        &mut self,
        requested: &Path,
        parent_dir: Option<&Path>,
        state: &mut ParseState,
    ) -> Result<Expansion> {
        // Checked before any I/O so a cycle is found even through an
        // unreadable file
        state.enter(requested)?;

        let resolved = self
            .resolver
            .resolve(requested, parent_dir.unwrap_or_else(|| Path::new("")))?;

        if parent_dir.is_some() {
            state
                .includes
                .insert(requested.to_path_buf(), resolved.clone());
        }

        let modified =
            self.fs
                .modified(&resolved)
                .map_err(|source| PreprocessError::UnreadableFile {
                    path: resolved.clone(),
                    source,
                })?;

        if self.config.enable_cache {
            if let Some(entry) = self
                .cache
                .lookup(requested, &resolved, modified, self.fs.as_ref())
            {
                let text = entry.expanded_text.clone();
                let includes = entry.includes.clone();

                // Replay the cached subtree so the chain ends up exactly as an
                // uncached expansion would leave it
                for included in &includes {
                    state.enter(&included.requested)?;
                    state
                        .includes
                        .insert(included.requested.clone(), included.resolved.clone());
                }

                return Ok(Expansion {
                    text,
                    resolved,
                    modified,
                    includes,
                });
            }
        }

        let contents =
            self.fs
                .read_file(&resolved)
                .map_err(|source| PreprocessError::UnreadableFile {
                    path: resolved.clone(),
                    source,
                })?;

        let current_dir = resolved.parent().unwrap_or_else(|| Path::new(""));
        let (text, includes) = self.expand_text(&contents, current_dir, state)?;

        if self.config.enable_cache {
            self.cache.store(CacheEntry::new(
                requested.to_path_buf(),
                resolved.clone(),
                modified,
                text.clone(),
                includes.clone(),
            ));
        }

        Ok(Expansion {
            text,
            resolved,
            modified,
            includes,
        })
    }

    /// Scan `contents` line by line, substituting include directives.
    fn expand_text(
        &mut self,
        contents: &str,
        current_dir: &Path,
        state: &mut ParseState,
    ) -> Result<(String, Vec<IncludedFile>)> {
        let mut output = String::with_capacity(contents.len());
        let mut includes = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let line_number = index + 1;

            match parse_include(line) {
                Some(child) => {
                    trace!("Line {}: include {:?}", line_number, child);
                    let child_path = Path::new(child);
                    let expansion = self.expand(child_path, Some(current_dir), state)?;

                    output.push_str(&expansion.text);
                    output.push_str(&line_marker(line_number + 1));

                    includes.push(IncludedFile {
                        requested: child_path.to_path_buf(),
                        resolved: expansion.resolved,
                        modified: expansion.modified,
                    });
                    includes.extend(expansion.includes);
                }
                None => output.push_str(line),
            }

            output.push('\n');
        }

        Ok((output, includes))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessorConfig::default())
    }
}
