use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use super::CacheEntry;
use crate::fs::FileSystem;

/// Expansion cache owned by one preprocessor
///
/// Unbounded by default. With a bound, the least recently used entry is
/// evicted once the count exceeds it; hits refresh recency.
#[derive(Debug, Default)]
pub struct SourceCache {
    /// Ordered from least to most recently used
    entries: IndexMap<PathBuf, CacheEntry>,

    max_entries: Option<usize>,
}

impl SourceCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            max_entries,
        }
    }

    /// Look up the entry for a requested path that currently resolves to
    /// `resolved` with timestamp `current`. Returns `None` on a miss or a
    /// stale entry.
    pub fn lookup(
        &mut self,
        path: &Path,
        resolved: &Path,
        current: SystemTime,
        fs: &dyn FileSystem,
    ) -> Option<&CacheEntry> {
        let index = self.entries.get_index_of(path)?;

        if !self.entries[index].is_fresh(resolved, current, fs) {
            debug!("Cache stale: {:?}", path);
            return None;
        }

        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        debug!("Cache hit: {:?}", path);
        self.entries.get_index(last).map(|(_, entry)| entry)
    }

    /// Store an entry, replacing any previous one for the same path.
    pub fn store(&mut self, entry: CacheEntry) {
        self.entries.shift_remove(&entry.path);
        debug!("Cache store: {:?}", entry.path);
        self.entries.insert(entry.path.clone(), entry);

        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                    debug!("Cache evict: {:?}", evicted);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::time::Duration;

    fn stamp(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn entry(path: &str, secs: u64, text: &str) -> CacheEntry {
        CacheEntry::new(
            PathBuf::from(path),
            PathBuf::from(path),
            stamp(secs),
            text.to_string(),
            vec![],
        )
    }

    #[test]
    fn test_lookup_miss() {
        let fs = MockFileSystem::new();
        let mut cache = SourceCache::default();

        assert!(cache.lookup(Path::new("a.glsl"), Path::new("a.glsl"), stamp(1), &fs).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lookup_hit_and_stale() {
        let fs = MockFileSystem::new();
        let mut cache = SourceCache::default();
        cache.store(entry("a.glsl", 5, "float a;\n"));

        let hit = cache.lookup(Path::new("a.glsl"), Path::new("a.glsl"), stamp(5), &fs).unwrap();
        assert_eq!(hit.expanded_text, "float a;\n");

        assert!(cache.lookup(Path::new("a.glsl"), Path::new("a.glsl"), stamp(6), &fs).is_none());
        assert!(cache.contains(Path::new("a.glsl")));
    }

    #[test]
    fn test_store_overwrites() {
        let fs = MockFileSystem::new();
        let mut cache = SourceCache::default();
        cache.store(entry("a.glsl", 5, "old\n"));
        cache.store(entry("a.glsl", 7, "new\n"));

        assert_eq!(cache.len(), 1);
        let hit = cache.lookup(Path::new("a.glsl"), Path::new("a.glsl"), stamp(7), &fs).unwrap();
        assert_eq!(hit.expanded_text, "new\n");
    }

    #[test]
    fn test_requested_spellings_are_distinct_keys() {
        let mut cache = SourceCache::default();
        cache.store(entry("a.glsl", 1, "x\n"));
        cache.store(entry("./a.glsl", 1, "x\n"));

        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_bounded_cache_evicts_least_recently_used() {
        let fs = MockFileSystem::new();
        let mut cache = SourceCache::new(Some(2));
        cache.store(entry("a.glsl", 1, "a\n"));
        cache.store(entry("b.glsl", 1, "b\n"));

        // Touch a so b becomes the eviction candidate
        assert!(cache.lookup(Path::new("a.glsl"), Path::new("a.glsl"), stamp(1), &fs).is_some());
        cache.store(entry("c.glsl", 1, "c\n"));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(Path::new("a.glsl")));
        assert!(!cache.contains(Path::new("b.glsl")));
        assert!(cache.contains(Path::new("c.glsl")));
    }

    #[test]
    fn test_zero_bound_keeps_nothing() {
        let mut cache = SourceCache::new(Some(0));
        cache.store(entry("a.glsl", 1, "a\n"));

        assert!(cache.is_empty());
    }
}
