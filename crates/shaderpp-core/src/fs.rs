//! File-system access used by the resolver, the expander and the cache.
//!
//! Everything goes through the [`FileSystem`] trait so tests can swap in
//! [`MockFileSystem`] and count the reads a parse performs.

use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait FileSystem: Send + Sync {
    /// Read the whole file. The handle is released before returning.
    /// Bytes that are not valid UTF-8 are replaced, not rejected.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    /// Last write time of the file.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// The host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

#[derive(Debug, Clone)]
struct MockFile {
    contents: String,
    modified: SystemTime,
    readable: bool,
}

#[derive(Debug, Default)]
struct MockState {
    files: FxHashMap<PathBuf, MockFile>,
    /// Logical clock, bumped on every write.
    clock: u64,
    reads: FxHashMap<PathBuf, usize>,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

/// In-memory file system for tests.
///
/// Paths are matched exactly as given, without normalization. Every write
/// advances a logical clock, so a rewritten file is always strictly newer than
/// before.
#[derive(Debug, Default)]
pub struct MockFileSystem {
    state: Mutex<MockState>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.write_file(path, contents);
    }

    /// Create or overwrite a file, giving it a fresh timestamp.
    pub fn write_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let mut state = self.state();
        let modified = state.tick();
        state.files.insert(
            path.into(),
            MockFile {
                contents: contents.into(),
                modified,
                readable: true,
            },
        );
    }

    /// Overwrite a file's timestamp without touching its contents.
    pub fn set_modified(&self, path: &Path, modified: SystemTime) {
        if let Some(file) = self.state().files.get_mut(path) {
            file.modified = modified;
        }
    }

    /// Replace contents but keep the old timestamp, like an edit the
    /// file system clock could not tell apart.
    pub fn overwrite_keeping_timestamp(&self, path: &Path, contents: impl Into<String>) {
        if let Some(file) = self.state().files.get_mut(path) {
            file.contents = contents.into();
        }
    }

    pub fn remove_file(&self, path: &Path) {
        self.state().files.remove(path);
    }

    /// Keep the file visible to `exists` but make every read fail.
    pub fn deny_read(&self, path: &Path) {
        if let Some(file) = self.state().files.get_mut(path) {
            file.readable = false;
        }
    }

    /// Total number of `read_file` calls, successful or not.
    pub fn read_count(&self) -> usize {
        self.state().reads.values().sum()
    }

    pub fn read_count_for(&self, path: &Path) -> usize {
        self.state().reads.get(path).copied().unwrap_or(0)
    }
}

impl FileSystem for MockFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        let mut state = self.state();
        *state.reads.entry(path.to_path_buf()).or_insert(0) += 1;

        match state.files.get(path) {
            Some(file) if file.readable => Ok(file.contents.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.state()
            .files
            .get(path)
            .map(|file| file.modified)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {}", path.display()),
                )
            })
    }
}
