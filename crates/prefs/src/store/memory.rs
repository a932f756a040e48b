// In-process backing store
//
// Keeps every node in memory. Used for headless runs that must not touch
// the user's preference directory, and by tests, which read the flush and
// write counters to check batching behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{normalize_path, BackingStore, StoreNode};
use crate::error::StoreError;

pub struct MemoryNode {
    path: String,
    entries: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
    flushes: AtomicUsize,
    fail_flushes: Arc<AtomicBool>,
}

impl StoreNode for MemoryNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put_raw(&self, key: &str, value: String) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    fn flush(&self) -> Result<(), StoreError> {
        if self.fail_flushes.load(Ordering::Relaxed) {
            return Err(StoreError::Injected(format!("flush of '{}' refused", self.path)));
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<BTreeMap<String, Arc<MemoryNode>>>,
    fail_flushes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn memory_node(&self, path: &str) -> Arc<MemoryNode> {
        let path = normalize_path(path);
        let mut nodes = self.nodes.lock();
        nodes
            .entry(path.clone())
            .or_insert_with(|| {
                Arc::new(MemoryNode {
                    path,
                    entries: Mutex::new(BTreeMap::new()),
                    writes: AtomicUsize::new(0),
                    flushes: AtomicUsize::new(0),
                    fail_flushes: self.fail_flushes.clone(),
                })
            })
            .clone()
    }

    /// Make every subsequent flush fail (or succeed again).
    pub fn set_fail_flushes(&self, fail: bool) {
        self.fail_flushes.store(fail, Ordering::Relaxed);
    }

    /// Successful flushes of the node at `path`.
    pub fn flush_count(&self, path: &str) -> usize {
        self.nodes
            .lock()
            .get(&normalize_path(path))
            .map(|n| n.flushes.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Puts and removes applied to the node at `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.nodes
            .lock()
            .get(&normalize_path(path))
            .map(|n| n.writes.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Raw stored string, without creating the node.
    pub fn raw(&self, path: &str, key: &str) -> Option<String> {
        let node = self.nodes.lock().get(&normalize_path(path)).cloned()?;
        node.get_raw(key)
    }
}

impl BackingStore for MemoryStore {
    fn node(&self, path: &str) -> Arc<dyn StoreNode> {
        self.memory_node(path)
    }

    fn node_paths(&self) -> Vec<String> {
        self.nodes.lock().keys().cloned().collect()
    }
}
