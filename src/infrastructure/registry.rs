//! Model registry cache
//!
//! A TTL-bounded snapshot of the aggregated model list. The snapshot is
//! replaced whole, never edited in place, so readers never observe a partial
//! aggregation. When every backend is down, the previous snapshot is served
//! stale rather than returning a spuriously empty list.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::domain::{InferenceBackend, ModelEntry};

#[derive(Debug, Clone)]
struct Snapshot {
    entries: Vec<ModelEntry>,
    captured_at: Instant,
}

/// Process-wide cache of the aggregated model list.
#[derive(Debug)]
pub struct ModelRegistry {
    backends: Vec<Arc<dyn InferenceBackend>>,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl ModelRegistry {
    pub fn new(backends: Vec<Arc<dyn InferenceBackend>>, ttl: Duration) -> Self {
        Self {
            backends,
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// Return the model list, refreshing from the backends when the snapshot
    /// is missing or older than the TTL.
    ///
    /// Concurrent callers may each trigger a refresh; that is duplicate work,
    /// not a correctness issue.
    pub async fn list(&self) -> Vec<ModelEntry> {
        if let Some(entries) = self.fresh_entries() {
            debug!(count = entries.len(), "serving model list from cache");
            return entries;
        }

        let mut aggregated = Vec::new();
        for backend in &self.backends {
            match backend.list_models().await {
                Ok(mut entries) => aggregated.append(&mut entries),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "model list fetch failed");
                }
            }
        }

        if !aggregated.is_empty() {
            *self.snapshot.write().unwrap() = Some(Snapshot {
                entries: aggregated.clone(),
                captured_at: Instant::now(),
            });
            return aggregated;
        }

        // every backend failed or returned nothing: serve the stale snapshot
        // if one exists
        if let Some(snapshot) = &*self.snapshot.read().unwrap() {
            warn!(
                count = snapshot.entries.len(),
                "all backends unavailable, serving stale model list"
            );
            return snapshot.entries.clone();
        }

        Vec::new()
    }

    /// Drop the snapshot; the next `list` call fetches fresh.
    pub fn invalidate(&self) {
        *self.snapshot.write().unwrap() = None;
        debug!("model list cache invalidated");
    }

    fn fresh_entries(&self) -> Option<Vec<ModelEntry>> {
        let guard = self.snapshot.read().unwrap();
        let snapshot = guard.as_ref()?;
        if snapshot.captured_at.elapsed() < self.ttl {
            Some(snapshot.entries.clone())
        } else {
            None
        }
    }
}
