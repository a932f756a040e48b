//! Flush scheduling.
//!
//! In immediate mode every group write is followed by a flush of that
//! group's node. In deferred mode the node path is queued instead, and
//! `resume` flushes each queued node once. Flush failures are reported and
//! counted but never returned to the writer; the in-memory cache stays
//! authoritative.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{BackingStore, StoreNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    Immediate,
    Deferred,
}

pub struct FlushScheduler {
    store: Arc<dyn BackingStore>,
    /// `Some` while deferred; holds the paths awaiting a flush.
    pending: Mutex<Option<BTreeSet<String>>>,
    batch_mode: bool,
    failures: AtomicUsize,
}

impl FlushScheduler {
    pub fn new(store: Arc<dyn BackingStore>, batch_mode: bool) -> Self {
        Self {
            store,
            pending: Mutex::new(None),
            batch_mode,
            failures: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> FlushMode {
        if self.pending.lock().is_some() {
            FlushMode::Deferred
        } else {
            FlushMode::Immediate
        }
    }

    /// Switch to deferred mode. Paths already queued stay queued.
    pub fn delay(&self) {
        let mut pending = self.pending.lock();
        if pending.is_none() {
            *pending = Some(BTreeSet::new());
        }
    }

    /// Switch to immediate mode and flush every queued node once.
    /// Returns the number of nodes flushed successfully.
    pub fn resume(&self) -> usize {
        let Some(queued) = self.pending.lock().take() else {
            return 0;
        };
        let mut flushed = 0;
        for path in queued {
            let node = self.store.node(&path);
            if self.flush_node(&*node) {
                flushed += 1;
            }
        }
        log::debug!("Resumed flushing, {} node(s) flushed", flushed);
        flushed
    }

    /// Called after a write or removal on `node`.
    pub fn node_changed(&self, node: &dyn StoreNode) {
        {
            let mut pending = self.pending.lock();
            if let Some(queued) = pending.as_mut() {
                queued.insert(node.path().to_string());
                return;
            }
        }
        self.flush_node(node);
    }

    /// Number of queued node paths.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().as_ref().map_or(0, |q| q.len())
    }

    /// Number of flushes that failed so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn flush_node(&self, node: &dyn StoreNode) -> bool {
        match node.flush() {
            Ok(()) => true,
            Err(e) => {
                self.report_failure(node.path(), &e);
                false
            }
        }
    }

    fn report_failure(&self, path: &str, err: &StoreError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if self.batch_mode {
            log::debug!("Flush of preferences '{}' failed: {}", path, err);
        } else {
            log::warn!("Unable to save preferences '{}': {}", path, err);
        }
    }
}

/// Keeps flushing deferred until dropped.
pub struct FlushGuard<'a> {
    scheduler: &'a FlushScheduler,
}

impl<'a> FlushGuard<'a> {
    pub fn new(scheduler: &'a FlushScheduler) -> Self {
        scheduler.delay();
        Self { scheduler }
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn scheduler() -> (Arc<MemoryStore>, FlushScheduler) {
        let store = Arc::new(MemoryStore::new());
        let sched = FlushScheduler::new(store.clone(), false);
        (store, sched)
    }

    #[test]
    fn test_immediate_mode_flushes_each_change() {
        let (store, sched) = scheduler();
        let node = store.node("g");
        sched.node_changed(&*node);
        sched.node_changed(&*node);
        assert_eq!(sched.mode(), FlushMode::Immediate);
        assert_eq!(store.flush_count("g"), 2);
    }

    #[test]
    fn test_deferred_mode_flushes_each_node_once() {
        let (store, sched) = scheduler();
        sched.delay();
        let a = store.node("a");
        let b = store.node("b");
        sched.node_changed(&*a);
        sched.node_changed(&*b);
        sched.node_changed(&*a);
        assert_eq!(sched.pending_count(), 2);
        assert_eq!(store.flush_count("a"), 0);

        assert_eq!(sched.resume(), 2);
        assert_eq!(store.flush_count("a"), 1);
        assert_eq!(store.flush_count("b"), 1);
        assert_eq!(sched.mode(), FlushMode::Immediate);
    }

    #[test]
    fn test_resume_without_delay_is_noop() {
        let (_store, sched) = scheduler();
        assert_eq!(sched.resume(), 0);
    }

    #[test]
    fn test_nested_delay_keeps_queue() {
        let (store, sched) = scheduler();
        sched.delay();
        sched.node_changed(&*store.node("a"));
        sched.delay();
        assert_eq!(sched.pending_count(), 1);
        sched.resume();
        assert_eq!(store.flush_count("a"), 1);
    }

    #[test]
    fn test_failures_are_counted_not_raised() {
        let (store, sched) = scheduler();
        store.set_fail_flushes(true);
        sched.node_changed(&*store.node("a"));
        sched.delay();
        sched.node_changed(&*store.node("b"));
        assert_eq!(sched.resume(), 0);
        assert_eq!(sched.failures(), 2);
    }

    #[test]
    fn test_guard_resumes_on_drop() {
        let (store, sched) = scheduler();
        {
            let _guard = FlushGuard::new(&sched);
            sched.node_changed(&*store.node("a"));
            assert_eq!(sched.mode(), FlushMode::Deferred);
        }
        assert_eq!(sched.mode(), FlushMode::Immediate);
        assert_eq!(store.flush_count("a"), 1);
    }
}
