//! Individual settings.
//!
//! A `Pref` caches its value in memory. The cache is filled from the backing
//! store once, when the setting is created (or later in bulk for technology
//! groups), and is authoritative afterwards: reads never go to the store.
//! Writes update the cache first and then hand the new value to the owning
//! group for persistence.
//!
//! A value equal to the factory value is never persisted; the absence of a
//! key is what "at factory default" looks like in the store.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::access::{AccessContext, AccessKind};
use crate::error::{PrefError, Result};
use crate::group::{Group, GroupState};
use crate::value::{PrefType, PrefValue};

struct Values {
    cached: PrefValue,
    factory: PrefValue,
}

/// A named, typed, cached setting with a factory default.
pub struct Pref {
    name: String,
    group: Arc<GroupState>,
    server_accessible: bool,
    values: RwLock<Values>,
}

impl Pref {
    /// Create a setting in `group` and register it there.
    ///
    /// Technology groups must already be locked. Once the registry's
    /// creation lock is set, server-accessible settings can no longer be
    /// added to ordinary groups.
    pub(crate) fn create(
        group: &Group,
        name: &str,
        server_accessible: bool,
        factory: PrefValue,
    ) -> Result<Arc<Pref>> {
        let state = group.state();
        if state.is_tech() {
            state.check_usable()?;
        } else if server_accessible && state.ctx.is_creation_locked() {
            return Err(PrefError::CreationLocked {
                group: state.path().to_string(),
                name: name.to_string(),
            });
        }

        // Technology settings are loaded in bulk once the technology is read.
        let cached = if state.is_tech() {
            factory.clone()
        } else {
            collapse(state.get_value(name, &factory), &factory)
        };

        let pref = Arc::new(Pref {
            name: name.to_string(),
            group: state.clone(),
            server_accessible,
            values: RwLock::new(Values { cached, factory }),
        });
        group.register(pref.clone())?;
        Ok(pref)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_path(&self) -> &str {
        self.group.path()
    }

    /// `group/name`, used in diagnostics.
    pub fn path(&self) -> String {
        if self.group.path().is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.group.path(), self.name)
        }
    }

    pub fn is_server_accessible(&self) -> bool {
        self.server_accessible
    }

    pub fn pref_type(&self) -> PrefType {
        self.values.read().factory.pref_type()
    }

    pub fn factory_value(&self) -> PrefValue {
        self.values.read().factory.clone()
    }

    /// Cached value without scope checks, for listings and diagnostics.
    pub fn cached_value(&self) -> PrefValue {
        self.values.read().cached.clone()
    }

    pub fn is_factory_default(&self) -> bool {
        let v = self.values.read();
        v.cached == v.factory
    }

    pub fn get_value(&self, ctx: AccessContext) -> Result<PrefValue> {
        self.check_access(ctx, AccessKind::Read)?;
        Ok(self.values.read().cached.clone())
    }

    pub fn get_boolean(&self, ctx: AccessContext) -> Result<bool> {
        let v = self.get_value(ctx)?;
        v.as_bool().ok_or_else(|| self.mismatch(v.pref_type(), PrefType::Bool))
    }

    pub fn get_int(&self, ctx: AccessContext) -> Result<i32> {
        let v = self.get_value(ctx)?;
        v.as_int().ok_or_else(|| self.mismatch(v.pref_type(), PrefType::Int))
    }

    pub fn get_long(&self, ctx: AccessContext) -> Result<i64> {
        let v = self.get_value(ctx)?;
        v.as_long().ok_or_else(|| self.mismatch(v.pref_type(), PrefType::Long))
    }

    pub fn get_double(&self, ctx: AccessContext) -> Result<f64> {
        let v = self.get_value(ctx)?;
        v.as_double().ok_or_else(|| self.mismatch(v.pref_type(), PrefType::Double))
    }

    pub fn get_string(&self, ctx: AccessContext) -> Result<String> {
        match self.get_value(ctx)? {
            PrefValue::Str(s) => Ok(s),
            other => Err(self.mismatch(other.pref_type(), PrefType::String)),
        }
    }

    /// Set the value. Returns `Ok(false)` if it was already `value`.
    pub fn set_value(&self, ctx: AccessContext, value: PrefValue) -> Result<bool> {
        self.check_access(ctx, AccessKind::Write)?;

        let persisted = {
            let mut guard = self.values.write();
            let v = &mut *guard;
            if !value.same_type(&v.factory) {
                return Err(self.mismatch(v.factory.pref_type(), value.pref_type()));
            }
            if value == v.cached {
                return Ok(false);
            }
            v.cached = collapse(value, &v.factory);
            if v.cached == v.factory {
                None
            } else {
                Some(v.cached.clone())
            }
        };

        match persisted {
            Some(value) => self.group.put_value(&self.name, &value),
            None => self.group.remove(&self.name),
        }
        Ok(true)
    }

    pub fn set_boolean(&self, ctx: AccessContext, value: bool) -> Result<()> {
        self.set_value(ctx, PrefValue::Bool(value)).map(|_| ())
    }

    pub fn set_int(&self, ctx: AccessContext, value: i32) -> Result<()> {
        self.set_value(ctx, PrefValue::Int(value)).map(|_| ())
    }

    pub fn set_long(&self, ctx: AccessContext, value: i64) -> Result<()> {
        self.set_value(ctx, PrefValue::Long(value)).map(|_| ())
    }

    pub fn set_double(&self, ctx: AccessContext, value: f64) -> Result<()> {
        self.set_value(ctx, PrefValue::Double(value)).map(|_| ())
    }

    pub fn set_string(&self, ctx: AccessContext, value: &str) -> Result<()> {
        self.set_value(ctx, PrefValue::Str(value.to_string())).map(|_| ())
    }

    /// Return to the factory value and drop any stored override.
    pub fn factory_reset(&self) {
        {
            let mut guard = self.values.write();
            let v = &mut *guard;
            v.cached = v.factory.clone();
        }
        self.group.remove(&self.name);
    }

    /// Change the factory value after creation.
    ///
    /// A setting still at its old default follows the new one; an explicit
    /// override is left alone.
    pub fn patch_factory_value(&self, factory: PrefValue) -> Result<()> {
        let mut guard = self.values.write();
        let v = &mut *guard;
        if !factory.same_type(&v.factory) {
            return Err(self.mismatch(v.factory.pref_type(), factory.pref_type()));
        }
        if factory == v.factory {
            return Ok(());
        }
        if v.cached == v.factory {
            v.cached = factory.clone();
        }
        v.factory = factory;
        Ok(())
    }

    pub fn patch_factory_double(&self, factory: f64) -> Result<()> {
        self.patch_factory_value(PrefValue::Double(factory))
    }

    /// Refill the cache from the backing store.
    pub(crate) fn reload(&self) {
        let factory = self.factory_value();
        let stored = self.group.get_value(&self.name, &factory);
        let mut guard = self.values.write();
        let v = &mut *guard;
        v.cached = collapse(stored, &v.factory);
    }

    fn check_access(&self, ctx: AccessContext, kind: AccessKind) -> Result<()> {
        self.group.check_usable()?;
        self.group
            .ctx
            .access
            .check(ctx, kind, &self.path(), self.server_accessible);
        Ok(())
    }

    fn mismatch(&self, expected: PrefType, got: PrefType) -> PrefError {
        PrefError::TypeMismatch {
            pref: self.path(),
            expected,
            got,
        }
    }
}

impl std::fmt::Debug for Pref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.values.read();
        f.debug_struct("Pref")
            .field("path", &self.path())
            .field("value", &v.cached)
            .field("factory", &v.factory)
            .field("server_accessible", &self.server_accessible)
            .finish()
    }
}

/// Values equal to the factory value are replaced by a copy of it.
fn collapse(value: PrefValue, factory: &PrefValue) -> PrefValue {
    if &value == factory {
        factory.clone()
    } else {
        value
    }
}
