//! Object-store adapters: listing keys and fetching raw file content.
//!
//! The dashboard only ever talks to the store through [`ObjectLister`] and
//! [`ObjectFetcher`]. [`LocalObjectStore`] serves a bucket that is a plain
//! directory; [`MemoryObjectStore`] keeps everything in a map and counts
//! fetches, which makes cache behaviour observable in tests.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use dash_core::error::{DashError, Result};
use dash_core::models::ObjectKey;
use tracing::{debug, warn};

// ── Traits ────────────────────────────────────────────────────────────────────

/// Produces the keys stored under a prefix.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// All keys starting with `prefix`, sorted ascending.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>>;
}

/// Returns the raw bytes behind a key.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, key: &ObjectKey) -> Result<Vec<u8>>;
}

// ── LocalObjectStore ──────────────────────────────────────────────────────────

/// A bucket laid out as a directory: key `a/b/c` is the file `<bucket>/a/b/c`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    bucket_dir: PathBuf,
}

impl LocalObjectStore {
    /// Serve bucket `bucket` from `<store_root>/<bucket>`.
    pub fn new(store_root: &Path, bucket: &str) -> Self {
        Self {
            bucket_dir: store_root.join(bucket),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    /// Map a key onto a file inside the bucket, refusing anything that would
    /// escape it.
    fn object_path(&self, key: &ObjectKey) -> Result<PathBuf> {
        let relative = Path::new(key.as_str());
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.as_str().is_empty() || !plain {
            return Err(DashError::Transport(format!(
                "key \"{}\" is not a plain object path",
                key
            )));
        }
        Ok(self.bucket_dir.join(relative))
    }
}

/// Walk `bucket_dir` and collect every file as a `/`-joined key.
fn walk_keys(bucket_dir: &Path, prefix: &str) -> Vec<ObjectKey> {
    let mut keys: Vec<ObjectKey> = walkdir::WalkDir::new(bucket_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(bucket_dir).ok()?;
            let parts: Vec<&str> = relative
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<Vec<_>>>()?;
            Some(parts.join("/"))
        })
        .filter(|key| key.starts_with(prefix))
        .map(ObjectKey::from)
        .collect();

    keys.sort();
    keys
}

#[async_trait]
impl ObjectLister for LocalObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>> {
        if !self.bucket_dir.is_dir() {
            warn!("Bucket directory does not exist: {}", self.bucket_dir.display());
            return Err(DashError::Transport(format!(
                "bucket not found at {}",
                self.bucket_dir.display()
            )));
        }

        let bucket_dir = self.bucket_dir.clone();
        let prefix = prefix.to_string();
        let keys = tokio::task::spawn_blocking(move || walk_keys(&bucket_dir, &prefix))
            .await
            .map_err(|e| DashError::Transport(format!("listing task failed: {}", e)))?;

        debug!("Listed {} keys in {}", keys.len(), self.bucket_dir.display());
        Ok(keys)
    }
}

#[async_trait]
impl ObjectFetcher for LocalObjectStore {
    async fn fetch(&self, key: &ObjectKey) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DashError::Transport(format!("reading {}: {}", path.display(), e)))
    }
}

// ── MemoryObjectStore ─────────────────────────────────────────────────────────

/// In-process store keeping objects in a sorted map.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectKey, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) an object.
    pub fn insert(&self, key: impl Into<ObjectKey>, content: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.into(), content.into());
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectLister for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| DashError::Transport("object map poisoned".to_string()))?;
        Ok(objects
            .keys()
            .filter(|k| k.as_str().starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ObjectFetcher for MemoryObjectStore {
    async fn fetch(&self, key: &ObjectKey) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let objects = self
            .objects
            .read()
            .map_err(|_| DashError::Transport("object map poisoned".to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| DashError::Transport(format!("no such object: {}", key)))
    }
}
