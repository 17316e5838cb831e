//! Publishing capture requests to the acquisition queue.
//!
//! [`SpoolPublisher`] is a directory-backed queue: every message becomes one
//! file under `<root>/<project>/<topic>/`, written atomically so a consumer
//! polling the directory never sees a partial payload. The publish call
//! returns once the file is in place, which is the acknowledgement.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dash_core::error::{DashError, Result};
use tracing::info;

// ── Topic ─────────────────────────────────────────────────────────────────────

/// A destination queue, named by project and topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub project: String,
    pub name: String,
}

impl Topic {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }

    /// Fully-qualified form, `projects/<project>/topics/<name>`.
    pub fn path(&self) -> String {
        format!("projects/{}/topics/{}", self.project, self.name)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

// ── QueuePublisher ────────────────────────────────────────────────────────────

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Publish `payload` and wait for the acknowledgement; returns the
    /// message id.
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<String>;
}

// ── SpoolPublisher ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SpoolPublisher {
    root: PathBuf,
    seq: AtomicU64,
}

impl SpoolPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Directory messages for `topic` are spooled into.
    pub fn topic_dir(&self, topic: &Topic) -> PathBuf {
        self.root.join(&topic.project).join(&topic.name)
    }

    fn next_id(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        format!("{}-{:06}", Utc::now().format("%Y%m%dT%H%M%S%.3f"), seq)
    }
}

fn publish_error(topic: &Topic, path: &Path, e: std::io::Error) -> DashError {
    DashError::Publish {
        topic: topic.path(),
        reason: format!("{}: {}", path.display(), e),
    }
}

#[async_trait]
impl QueuePublisher for SpoolPublisher {
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<String> {
        let dir = self.topic_dir(topic);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| publish_error(topic, &dir, e))?;

        let id = self.next_id();
        let path = dir.join(format!("{}.msg", id));

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("msg.tmp");
        tokio::fs::write(&tmp, &payload)
            .await
            .map_err(|e| publish_error(topic, &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| publish_error(topic, &path, e))?;

        info!(topic = %topic, id = %id, bytes = payload.len(), "message published");
        Ok(id)
    }
}

// ── MemoryPublisher ───────────────────────────────────────────────────────────

/// Keeps published messages in memory; can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<(Topic, Vec<u8>)>>,
    failing: AtomicBool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything acknowledged so far, oldest first.
    pub fn published(&self) -> Vec<(Topic, Vec<u8>)> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueuePublisher for MemoryPublisher {
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DashError::Publish {
                topic: topic.path(),
                reason: "publisher unavailable".to_string(),
            });
        }
        let mut messages = self.messages.lock().map_err(|_| DashError::Publish {
            topic: topic.path(),
            reason: "message log poisoned".to_string(),
        })?;
        messages.push((topic.clone(), payload));
        Ok(format!("mem-{}", messages.len()))
    }
}
