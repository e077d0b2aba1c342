//! Shared keyed store for process entities.
//!
//! Keyed two ways, matching how views read it: the "all processes" list and
//! per-id detail entries. Multiple views share one cache through cheap
//! clones; locks are held only for the duration of a single read or write,
//! never across an await point.
//!
//! Every write carries the entity's `updated_at` and a write strictly older
//! than the cached timestamp is rejected, so a slow background poll response
//! cannot overwrite a newer user edit that resolved first.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jewelai_core::process::{DesignProcess, DesignProcessDetails, ProcessStatus};
use jewelai_core::types::EntityId;

#[derive(Default)]
struct CacheInner {
    list: Vec<DesignProcess>,
    details: HashMap<EntityId, DesignProcessDetails>,
}

/// Shared process cache. Clone freely; all clones see the same data.
#[derive(Clone, Default)]
pub struct ProcessCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl ProcessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full list with a fresh server fetch.
    pub fn replace_list(&self, list: Vec<DesignProcess>) {
        self.inner.write().expect("cache lock poisoned").list = list;
    }

    /// Snapshot of the list in display order.
    pub fn list(&self) -> Vec<DesignProcess> {
        self.inner.read().expect("cache lock poisoned").list.clone()
    }

    /// Whether a process id is present in the cached list.
    pub fn contains(&self, id: EntityId) -> bool {
        self.inner
            .read()
            .expect("cache lock poisoned")
            .list
            .iter()
            .any(|p| p.id == id)
    }

    /// Detail entry for a process, if cached.
    pub fn detail(&self, id: EntityId) -> Option<DesignProcessDetails> {
        self.inner
            .read()
            .expect("cache lock poisoned")
            .details
            .get(&id)
            .cloned()
    }

    /// Insert-or-replace a list entry by id; new entries go to the front.
    ///
    /// Returns `false` when the write was rejected as stale.
    pub fn upsert_list_entry(&self, process: DesignProcess) -> bool {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        match inner.list.iter_mut().find(|p| p.id == process.id) {
            Some(existing) => {
                if process.updated_at < existing.updated_at {
                    return false;
                }
                *existing = process;
            }
            None => inner.list.insert(0, process),
        }
        true
    }

    /// Full-detail write; also syncs the matching list entry.
    ///
    /// Returns `false` when the write was rejected as stale.
    pub fn upsert_detail(&self, details: DesignProcessDetails) -> bool {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        if let Some(existing) = inner.details.get(&details.process.id) {
            if details.process.updated_at < existing.process.updated_at {
                return false;
            }
        }
        if let Some(entry) = inner
            .list
            .iter_mut()
            .find(|p| p.id == details.process.id)
        {
            if details.process.updated_at >= entry.updated_at {
                *entry = details.process.clone();
            }
        }
        inner.details.insert(details.process.id, details);
        true
    }

    /// Cheap partial update from the status endpoint: only `status` and
    /// `updated_at` are merged, into both the detail entry and the list.
    ///
    /// Returns `false` when the write was rejected as stale everywhere.
    pub fn merge_status(&self, status: &ProcessStatus) -> bool {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        let mut applied = false;

        if let Some(details) = inner.details.get_mut(&status.id) {
            if status.updated_at >= details.process.updated_at {
                details.process.status = status.status;
                details.process.updated_at = status.updated_at;
                applied = true;
            }
        }
        if let Some(entry) = inner.list.iter_mut().find(|p| p.id == status.id) {
            if status.updated_at >= entry.updated_at {
                entry.status = status.status;
                entry.updated_at = status.updated_at;
                applied = true;
            }
        }
        applied
    }

    /// Drop a process from both keys, e.g. after deletion.
    pub fn remove(&self, id: EntityId) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.list.retain(|p| p.id != id);
        inner.details.remove(&id);
    }
}
