// 🗃️ Dataset Cache
//
// Cleaned datasets are computed once per source path and shared read-only.
// The cache is an ordinary value owned by whoever runs the pipeline (the CLI,
// the server state), with explicit invalidate/reload instead of a hidden
// process-wide memo.

use crate::dataset::{load_dataset, Dataset, DatasetSpec};
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// One cached dataset plus what it was built from
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset: Arc<Dataset>,
    /// SHA-256 of the source bytes at load time
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
}

/// Memoized cleaned datasets keyed by source file path
///
/// Safe to share across threads. Two racing first loads may both compute;
/// the last one to finish wins and both callers get a complete dataset.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

/// Hex SHA-256 of a file's contents
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| PipelineError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl DatasetCache {
    pub fn new() -> Self {
        DatasetCache::default()
    }

    /// Cached dataset for `spec.path`, loading it on first use
    pub fn get_or_load(&self, spec: &DatasetSpec) -> Result<Arc<Dataset>> {
        if let Some(entry) = self.get(&spec.path) {
            debug!(path = %spec.path.display(), "cache hit");
            return Ok(entry.dataset);
        }
        self.load_into_cache(spec)
    }

    /// Drop any cached entry for `spec.path` and load it again
    pub fn reload(&self, spec: &DatasetSpec) -> Result<Arc<Dataset>> {
        self.invalidate(&spec.path);
        self.load_into_cache(spec)
    }

    /// Current entry for a path, if any
    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.read_entries().get(path).cloned()
    }

    /// Forget one path; true if something was cached
    pub fn invalidate(&self, path: &Path) -> bool {
        let removed = self.write_entries().remove(path).is_some();
        if removed {
            info!(path = %path.display(), "cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// True when the file on disk no longer matches the cached digest
    ///
    /// Paths that are not cached are not stale.
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        match self.get(path) {
            Some(entry) => Ok(file_digest(path)? != entry.digest),
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn load_into_cache(&self, spec: &DatasetSpec) -> Result<Arc<Dataset>> {
        // Digest before parsing so a mid-load edit shows up as stale
        let digest = file_digest(&spec.path)?;
        let dataset = Arc::new(load_dataset(spec)?);

        let entry = CacheEntry {
            dataset: Arc::clone(&dataset),
            digest,
            loaded_at: Utc::now(),
        };
        self.write_entries().insert(spec.path.clone(), entry);
        Ok(dataset)
    }

    // Lock poisoning is ignored: inserts and removes are single calls.
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Layout;
    use std::io::Write;

    fn write_table(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_loads_once() {
        let file = write_table("States,2012-13\nGoa,10\n");
        let spec = DatasetSpec::new("receipts", file.path(), Layout::Simple);
        let cache = DatasetCache::new();

        let first = cache.get_or_load(&spec).unwrap();
        let second = cache.get_or_load(&spec).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_and_reload() {
        let mut file = write_table("States,2012-13\nGoa,10\n");
        let spec = DatasetSpec::new("receipts", file.path(), Layout::Simple);
        let cache = DatasetCache::new();

        let first = cache.get_or_load(&spec).unwrap();
        assert!(!cache.is_stale(&spec.path).unwrap());

        file.write_all(b"Kerala,20\n").unwrap();
        file.flush().unwrap();
        assert!(cache.is_stale(&spec.path).unwrap());

        // still served from cache until reloaded
        assert_eq!(cache.get_or_load(&spec).unwrap().len(), 1);

        let reloaded = cache.reload(&spec).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert!(!cache.is_stale(&spec.path).unwrap());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let file = write_table("States,2012-13\nGoa,10\n");
        let spec = DatasetSpec::new("receipts", file.path(), Layout::Simple);
        let cache = DatasetCache::new();

        cache.get_or_load(&spec).unwrap();
        assert!(cache.invalidate(&spec.path));
        assert!(!cache.invalidate(&spec.path));
        assert!(cache.is_empty());

        cache.get_or_load(&spec).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let file = write_table("Components,2012-13\nGoa (Total),1\n");
        let spec = DatasetSpec::new("debt", file.path(), Layout::Hierarchical);
        let cache = DatasetCache::new();

        let err = cache.get_or_load(&spec).unwrap_err();
        assert!(err.is_empty_result());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let file = write_table("States,2012-13\nGoa,10\nBihar,5\n");
        let spec = DatasetSpec::new("receipts", file.path(), Layout::Simple);
        let cache = Arc::new(DatasetCache::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let spec = spec.clone();
                std::thread::spawn(move || cache.get_or_load(&spec).unwrap().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(cache.len(), 1);
    }
}
