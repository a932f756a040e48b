//! The preference registry.
//!
//! One `PrefRegistry` holds everything that is process-wide in a running
//! application: the backing store, the flush scheduler, the access monitor,
//! the creation lock and the list of ordinary groups. Nothing is static, so
//! independent registries can coexist (tests create one per case).

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub use crate::config::RegistryConfig;

use crate::access::AccessMonitor;
use crate::error::{PrefError, Result};
use crate::flush::{FlushGuard, FlushMode, FlushScheduler};
use crate::group::Group;
use crate::pref::Pref;
use crate::store::{normalize_path, BackingStore, JsonFileStore};
use crate::value::PrefValue;

/// State shared by every group and setting of one registry.
pub(crate) struct Context {
    pub(crate) store: Arc<dyn BackingStore>,
    pub(crate) flush: FlushScheduler,
    pub(crate) access: AccessMonitor,
    creation_locked: AtomicBool,
}

impl Context {
    pub(crate) fn is_creation_locked(&self) -> bool {
        self.creation_locked.load(Ordering::Acquire)
    }
}

pub struct PrefRegistry {
    ctx: Arc<Context>,
    groups: Mutex<BTreeMap<String, Arc<Group>>>,
}

impl PrefRegistry {
    pub fn new(store: Arc<dyn BackingStore>, config: RegistryConfig) -> Self {
        let ctx = Context {
            flush: FlushScheduler::new(store.clone(), config.batch_mode),
            access: AccessMonitor::new(config.read_diagnostics, config.write_diagnostics),
            store,
            creation_locked: AtomicBool::new(false),
        };
        Self {
            ctx: Arc::new(ctx),
            groups: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registry over the JSON file store named by `config`.
    pub fn open(config: RegistryConfig) -> Self {
        let root = config
            .store_root
            .clone()
            .unwrap_or_else(JsonFileStore::default_root);
        log::info!("Opening preferences at {}", root.display());
        Self::new(Arc::new(JsonFileStore::open(root)), config)
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.ctx.store
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// The ordinary group at `path`, created on first use.
    pub fn group(&self, path: &str) -> Arc<Group> {
        let path = normalize_path(path);
        let mut groups = self.groups.lock();
        groups
            .entry(path.clone())
            .or_insert_with(|| {
                log::debug!("Created preference group '{}'", path);
                Arc::new(Group::new(self.ctx.clone(), &path, false))
            })
            .clone()
    }

    /// A new technology group. Technology groups are not tracked by the
    /// registry and are not deduplicated; the caller owns them.
    pub fn tech_group(&self, path: &str) -> Arc<Group> {
        Arc::new(Group::new(self.ctx.clone(), path, true))
    }

    /// Ordinary groups in path order.
    pub fn groups(&self) -> Vec<Arc<Group>> {
        self.groups.lock().values().cloned().collect()
    }

    /// End the initialization phase: no more server-accessible settings may
    /// be created in ordinary groups.
    pub fn lock_creation(&self) {
        self.ctx.creation_locked.store(true, Ordering::Release);
        log::debug!("Preference creation locked");
    }

    pub fn is_creation_locked(&self) -> bool {
        self.ctx.is_creation_locked()
    }

    // -----------------------------------------------------------------------
    // Setting factories
    // -----------------------------------------------------------------------

    pub fn make_boolean_pref(&self, name: &str, group: &Group, factory: bool) -> Result<Arc<Pref>> {
        self.make_pref(group, name, false, PrefValue::Bool(factory))
    }

    pub fn make_int_pref(&self, name: &str, group: &Group, factory: i32) -> Result<Arc<Pref>> {
        self.make_pref(group, name, false, PrefValue::Int(factory))
    }

    pub fn make_long_pref(&self, name: &str, group: &Group, factory: i64) -> Result<Arc<Pref>> {
        self.make_pref(group, name, false, PrefValue::Long(factory))
    }

    pub fn make_double_pref(&self, name: &str, group: &Group, factory: f64) -> Result<Arc<Pref>> {
        self.make_pref(group, name, false, PrefValue::Double(factory))
    }

    pub fn make_string_pref(&self, name: &str, group: &Group, factory: &str) -> Result<Arc<Pref>> {
        self.make_pref(group, name, false, PrefValue::Str(factory.to_string()))
    }

    pub fn make_boolean_server_pref(
        &self,
        name: &str,
        group: &Group,
        factory: bool,
    ) -> Result<Arc<Pref>> {
        self.make_pref(group, name, true, PrefValue::Bool(factory))
    }

    pub fn make_int_server_pref(&self, name: &str, group: &Group, factory: i32) -> Result<Arc<Pref>> {
        self.make_pref(group, name, true, PrefValue::Int(factory))
    }

    pub fn make_long_server_pref(
        &self,
        name: &str,
        group: &Group,
        factory: i64,
    ) -> Result<Arc<Pref>> {
        self.make_pref(group, name, true, PrefValue::Long(factory))
    }

    pub fn make_double_server_pref(
        &self,
        name: &str,
        group: &Group,
        factory: f64,
    ) -> Result<Arc<Pref>> {
        self.make_pref(group, name, true, PrefValue::Double(factory))
    }

    pub fn make_string_server_pref(
        &self,
        name: &str,
        group: &Group,
        factory: &str,
    ) -> Result<Arc<Pref>> {
        self.make_pref(group, name, true, PrefValue::Str(factory.to_string()))
    }

    /// Create a setting in `group`, which must belong to this registry.
    pub(crate) fn make_pref(
        &self,
        group: &Group,
        name: &str,
        server_accessible: bool,
        factory: PrefValue,
    ) -> Result<Arc<Pref>> {
        if !Arc::ptr_eq(&group.state().ctx, &self.ctx) {
            return Err(PrefError::ForeignGroup {
                group: group.path().to_string(),
            });
        }
        Pref::create(group, name, server_accessible, factory)
    }

    // -----------------------------------------------------------------------
    // Flushing
    // -----------------------------------------------------------------------

    /// Queue node flushes until `resume_flushing`.
    pub fn delay_flushing(&self) {
        self.ctx.flush.delay();
    }

    /// Flush every node touched since `delay_flushing`, once each.
    pub fn resume_flushing(&self) -> usize {
        self.ctx.flush.resume()
    }

    /// Delay flushing until the returned guard is dropped.
    pub fn delay_flushing_guard(&self) -> FlushGuard<'_> {
        FlushGuard::new(&self.ctx.flush)
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.ctx.flush.mode()
    }

    pub fn flush_failures(&self) -> usize {
        self.ctx.flush.failures()
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Out-of-scope access diagnostics emitted so far.
    pub fn diagnostics_reported(&self) -> usize {
        self.ctx.access.reported()
    }

    pub fn reset_diagnostics(&self) {
        self.ctx.access.reset();
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Every setting of every ordinary group, by group path then name.
    pub fn all_prefs(&self) -> Vec<Arc<Pref>> {
        self.groups().iter().flat_map(|g| g.prefs()).collect()
    }

    /// Settings whose value differs from the factory value.
    pub fn changed_prefs(&self) -> Vec<Arc<Pref>> {
        self.all_prefs()
            .into_iter()
            .filter(|p| !p.is_factory_default())
            .collect()
    }

    /// Reload every ordinary group's settings from the backing store.
    pub fn reload_all(&self) {
        for group in self.groups() {
            group.set_cached_objs_from_preferences();
        }
        log::debug!("Reloaded all preference groups");
    }

    /// Export the whole backing store.
    pub fn export_prefs(&self, out: &mut dyn Write) -> Result<()> {
        self.ctx.store.export_subtree("", out)?;
        Ok(())
    }

    /// Import an export document, then reload cached values.
    /// Returns the number of nodes imported.
    ///
    /// Touched nodes are flushed through the scheduler, so a failed flush
    /// is counted like any other and the caches are still reloaded.
    pub fn import_prefs(&self, input: &mut dyn Read) -> Result<usize> {
        let touched = self.ctx.store.import_subtree(input)?;
        for path in &touched {
            self.ctx.flush.node_changed(&*self.ctx.store.node(path));
        }
        log::info!("Imported {} preference node(s)", touched.len());
        self.reload_all();
        Ok(touched.len())
    }
}

impl std::fmt::Debug for PrefRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefRegistry")
            .field("groups", &self.groups.lock().len())
            .field("creation_locked", &self.is_creation_locked())
            .field("flush_mode", &self.flush_mode())
            .finish()
    }
}
