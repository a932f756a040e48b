//! Setting groups.
//!
//! A group owns the settings stored under one backing-store node and is the
//! only thing that writes to that node. Settings keep a handle to the
//! group's shared state (`GroupState`), never to the `Group` itself, so the
//! group's map of settings does not form a reference cycle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{PrefError, Result};
use crate::pref::Pref;
use crate::registry::Context;
use crate::store::{normalize_path, read_value, write_value, StoreNode};
use crate::value::PrefValue;

pub(crate) struct GroupState {
    relative_path: String,
    tech: bool,
    locked: AtomicBool,
    node: OnceCell<Arc<dyn StoreNode>>,
    pub(crate) ctx: Arc<Context>,
}

impl GroupState {
    pub(crate) fn path(&self) -> &str {
        &self.relative_path
    }

    pub(crate) fn is_tech(&self) -> bool {
        self.tech
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn node(&self) -> &Arc<dyn StoreNode> {
        self.node
            .get_or_init(|| self.ctx.store.node(&self.relative_path))
    }

    /// Technology groups may only be used once their settings are locked in.
    pub(crate) fn check_usable(&self) -> Result<()> {
        if self.tech && !self.is_locked() {
            return Err(PrefError::TechGroupUnlocked {
                group: self.relative_path.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn put_value(&self, key: &str, value: &PrefValue) {
        let node = self.node();
        write_value(&**node, key, value);
        self.ctx.flush.node_changed(&**node);
    }

    pub(crate) fn remove(&self, key: &str) {
        let node = self.node();
        node.remove(key);
        self.ctx.flush.node_changed(&**node);
    }

    pub(crate) fn get_value(&self, key: &str, default: &PrefValue) -> PrefValue {
        read_value(&**self.node(), key, default)
    }
}

/// A named collection of settings sharing one backing-store node.
pub struct Group {
    state: Arc<GroupState>,
    prefs: Mutex<BTreeMap<String, Arc<Pref>>>,
}

impl Group {
    pub(crate) fn new(ctx: Arc<Context>, relative_path: &str, tech: bool) -> Self {
        Self {
            state: Arc::new(GroupState {
                relative_path: normalize_path(relative_path),
                tech,
                locked: AtomicBool::new(false),
                node: OnceCell::new(),
                ctx,
            }),
            prefs: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn state(&self) -> &Arc<GroupState> {
        &self.state
    }

    pub fn path(&self) -> &str {
        self.state.path()
    }

    pub fn is_tech_group(&self) -> bool {
        self.state.is_tech()
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Lock a technology group: its settings may be created and used from
    /// now on. Has no effect on the rules for ordinary groups.
    pub fn lock_creation(&self) {
        self.state.locked.store(true, Ordering::Release);
        log::debug!("Locked preference group '{}'", self.path());
    }

    /// Register a freshly built setting under its name.
    pub(crate) fn register(&self, pref: Arc<Pref>) -> Result<()> {
        let mut prefs = self.prefs.lock();
        if prefs.contains_key(pref.name()) {
            return Err(PrefError::DuplicateName {
                group: self.path().to_string(),
                name: pref.name().to_string(),
            });
        }
        prefs.insert(pref.name().to_string(), pref);
        Ok(())
    }

    /// Settings in name order.
    pub fn prefs(&self) -> Vec<Arc<Pref>> {
        self.prefs.lock().values().cloned().collect()
    }

    pub fn pref(&self, name: &str) -> Option<Arc<Pref>> {
        self.prefs.lock().get(name).cloned()
    }

    /// Write `value` under `key` and flush (or queue) the node.
    pub fn put_value(&self, key: &str, value: &PrefValue) {
        self.state.put_value(key, value);
    }

    /// Delete `key` and flush (or queue) the node.
    pub fn remove(&self, key: &str) {
        self.state.remove(key);
    }

    /// Stored value for `key`, or `default` if absent. `default` also
    /// selects which typed read is used.
    pub fn get_value(&self, key: &str, default: &PrefValue) -> PrefValue {
        self.state.get_value(key, default)
    }

    /// Reload every setting's cached value from the backing store.
    pub fn set_cached_objs_from_preferences(&self) {
        for pref in self.prefs() {
            pref.reload();
        }
    }

    /// Reset every setting in the group to its factory value.
    pub fn factory_reset_all(&self) {
        for pref in self.prefs() {
            pref.factory_reset();
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("path", &self.path())
            .field("tech", &self.is_tech_group())
            .field("locked", &self.is_locked())
            .field("prefs", &self.prefs.lock().len())
            .finish()
    }
}
