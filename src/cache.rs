//! On-disk artifact cache keyed by URL.
//!
//! Every URL maps to one deterministic path inside the cache directory, so a
//! re-render overwrites the previous artifact in place and no separate
//! garbage collection is needed. Freshness is judged at lookup time from the
//! file's modification timestamp; nothing is evicted in the background.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

/// One cached artifact for a URL.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Canonical identifier derived from the URL
    pub key: String,
    /// Location of the stored artifact on disk
    pub path: PathBuf,
    /// When the artifact was last (re)written
    pub last_modified: SystemTime,
}

/// Derive the cache key for a URL.
///
/// The URL is normalized by parsing it, then hashed with SHA-256 and
/// hex-encoded. The result is deterministic, collision-resistant in
/// practice, and contains only filesystem-safe characters no matter what
/// the URL holds, so hostile input cannot escape the cache directory.
pub fn cache_key(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    let digest = Sha256::digest(parsed.as_str().as_bytes());
    Ok(hex::encode(digest))
}

/// Maps URLs to deterministic on-disk artifact locations and answers
/// freshness queries against a configured retention window.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    retention: Duration,
}

impl CacheStore {
    /// Open (creating if needed) a cache directory with the given retention window.
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Cache(format!("failed to create cache dir {}: {}", dir.display(), e)))?;
        Ok(Self { dir, retention })
    }

    /// The directory artifacts are stored under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configured retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Canonical artifact path for a key.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", key))
    }

    /// Staging path a render writes to before the artifact is published.
    ///
    /// Lives in the cache directory so the final rename stays on one
    /// filesystem and is atomic. At most one render per key is in flight at
    /// a time, so the name cannot collide with itself.
    pub fn staging_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.tmp", key))
    }

    /// Look up the cached entry for a URL, if any artifact exists.
    pub fn lookup(&self, url: &str) -> Result<Option<CacheEntry>> {
        Ok(self.lookup_key(&cache_key(url)?))
    }

    /// Look up the cached entry for an already-derived key.
    pub fn lookup_key(&self, key: &str) -> Option<CacheEntry> {
        let path = self.artifact_path(key);
        let meta = fs::metadata(&path).ok()?;
        let last_modified = meta.modified().ok()?;
        Some(CacheEntry {
            key: key.to_string(),
            path,
            last_modified,
        })
    }

    /// Whether an entry is fresh enough to serve without re-rendering.
    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match entry.last_modified.elapsed() {
            Ok(age) => age < self.retention,
            // A modification time in the future (clock skew) counts as fresh
            Err(_) => true,
        }
    }

    /// Atomically publish a rendered artifact under its canonical path.
    ///
    /// The staging file is renamed into place so a partially written
    /// artifact is never visible under the key. Returns the refreshed entry.
    pub fn publish(&self, key: &str, staging: &Path) -> Result<CacheEntry> {
        let path = self.artifact_path(key);
        fs::rename(staging, &path).map_err(|e| {
            Error::Cache(format!(
                "failed to publish {} -> {}: {}",
                staging.display(),
                path.display(),
                e
            ))
        })?;
        let meta = fs::metadata(&path)
            .map_err(|e| Error::Cache(format!("failed to stat {}: {}", path.display(), e)))?;
        let last_modified = meta.modified().unwrap_or_else(|_| SystemTime::now());
        Ok(CacheEntry {
            key: key.to_string(),
            path,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(retention: Duration) -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), retention).unwrap();
        (dir, store)
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = cache_key("http://example.com/page").unwrap();
        let b = cache_key("http://example.com/page").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_urls() {
        let a = cache_key("http://example.com/a").unwrap();
        let b = cache_key("http://example.com/b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_filesystem_safe() {
        let key = cache_key("http://example.com/../../etc/passwd?q=<>|\\").unwrap();
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.len(), 64);
    }

    #[test]
    fn test_key_rejects_garbage() {
        assert!(matches!(cache_key("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_lookup_miss() {
        let (_dir, store) = store(Duration::from_secs(60));
        assert!(store.lookup("http://example.com/").unwrap().is_none());
    }

    #[test]
    fn test_publish_then_lookup() {
        let (_dir, store) = store(Duration::from_secs(60));
        let key = cache_key("http://example.com/").unwrap();

        let staging = store.staging_path(&key);
        fs::write(&staging, b"fake png bytes").unwrap();
        let published = store.publish(&key, &staging).unwrap();

        let entry = store.lookup("http://example.com/").unwrap().expect("entry");
        assert_eq!(entry.path, published.path);
        assert_eq!(fs::read(&entry.path).unwrap(), b"fake png bytes");
        assert!(store.is_fresh(&entry));
        // Staging file is gone once published
        assert!(!staging.exists());
    }

    #[test]
    fn test_zero_retention_is_always_stale() {
        let (_dir, store) = store(Duration::ZERO);
        let key = cache_key("http://example.com/").unwrap();
        let staging = store.staging_path(&key);
        fs::write(&staging, b"x").unwrap();
        store.publish(&key, &staging).unwrap();

        let entry = store.lookup_key(&key).expect("entry");
        assert!(!store.is_fresh(&entry));
    }

    #[test]
    fn test_publish_overwrites_in_place() {
        let (_dir, store) = store(Duration::from_secs(60));
        let key = cache_key("http://example.com/").unwrap();

        for body in [b"first".as_slice(), b"second".as_slice()] {
            let staging = store.staging_path(&key);
            fs::write(&staging, body).unwrap();
            store.publish(&key, &staging).unwrap();
        }

        let entry = store.lookup_key(&key).expect("entry");
        assert_eq!(fs::read(&entry.path).unwrap(), b"second");
    }

    #[test]
    fn test_publish_without_staging_fails() {
        let (_dir, store) = store(Duration::from_secs(60));
        let key = cache_key("http://example.com/").unwrap();
        let missing = store.staging_path(&key);
        assert!(matches!(store.publish(&key, &missing), Err(Error::Cache(_))));
    }
}
