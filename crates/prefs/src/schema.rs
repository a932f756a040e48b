//! Declarative setting catalogues.
//!
//! Lets a tool build a registry from a TOML file instead of code:
//!
//! ```toml
//! [[group]]
//! path = "tool/user"
//!
//! [[group.pref]]
//! name = "gridSpacing"
//! type = "double"
//! default = 1.0
//!
//! [[group]]
//! path = "technology/mocmos"
//! tech = true
//!
//! [[group.pref]]
//! name = "lambda"
//! type = "double"
//! default = 200.0
//! server = true
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{PrefError, Result};
use crate::group::Group;
use crate::pref::Pref;
use crate::registry::PrefRegistry;
use crate::store::normalize_path;
use crate::value::{PrefType, PrefValue};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSchema {
    pub path: String,
    #[serde(default)]
    pub tech: bool,
    #[serde(default, rename = "pref")]
    pub prefs: Vec<PrefSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrefType,
    pub default: toml::Value,
    #[serde(default)]
    pub server: bool,
}

impl PrefSchema {
    /// The declared default as a value of the declared kind.
    pub fn factory_value(&self) -> Result<PrefValue> {
        let value = match (self.ty, &self.default) {
            (PrefType::Bool, toml::Value::Boolean(b)) => Some(PrefValue::Bool(*b)),
            (PrefType::Int, toml::Value::Integer(i)) => {
                i32::try_from(*i).ok().map(PrefValue::Int)
            }
            (PrefType::Long, toml::Value::Integer(i)) => Some(PrefValue::Long(*i)),
            (PrefType::Double, toml::Value::Float(f)) => Some(PrefValue::Double(*f)),
            (PrefType::Double, toml::Value::Integer(i)) => Some(PrefValue::Double(*i as f64)),
            (PrefType::String, toml::Value::String(s)) => Some(PrefValue::Str(s.clone())),
            _ => None,
        };
        value.ok_or_else(|| {
            PrefError::Schema(format!(
                "default {} of '{}' is not a valid {}",
                self.default, self.name, self.ty
            ))
        })
    }
}

/// Groups and settings created by `Schema::install`.
#[derive(Debug, Default)]
pub struct Installed {
    groups: BTreeMap<String, Arc<Group>>,
}

impl Installed {
    pub fn group(&self, path: &str) -> Option<&Arc<Group>> {
        self.groups.get(&normalize_path(path))
    }

    pub fn groups(&self) -> impl Iterator<Item = &Arc<Group>> {
        self.groups.values()
    }

    pub fn pref(&self, group: &str, name: &str) -> Option<Arc<Pref>> {
        self.group(group)?.pref(name)
    }

    /// Every installed setting, including technology settings.
    pub fn prefs(&self) -> Vec<Arc<Pref>> {
        self.groups.values().flat_map(|g| g.prefs()).collect()
    }
}

impl Schema {
    pub fn from_toml(text: &str) -> Result<Self> {
        let schema: Schema =
            toml::from_str(text).map_err(|e| PrefError::Schema(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| PrefError::Schema(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        let mut paths = BTreeSet::new();
        for group in &self.groups {
            let path = normalize_path(&group.path);
            if !paths.insert(path.clone()) {
                return Err(PrefError::Schema(format!("group '{}' declared twice", path)));
            }
            for pref in &group.prefs {
                if pref.name.is_empty() || pref.name.contains('/') {
                    return Err(PrefError::Schema(format!(
                        "invalid setting name '{}' in group '{}'",
                        pref.name, path
                    )));
                }
                pref.factory_value()?;
            }
        }
        Ok(())
    }

    /// Create every declared group and setting in `registry`.
    ///
    /// Technology groups are locked before their settings are created and
    /// then loaded from the store in one pass.
    pub fn install(&self, registry: &PrefRegistry) -> Result<Installed> {
        let mut installed = Installed::default();
        for decl in &self.groups {
            let group = if decl.tech {
                let group = registry.tech_group(&decl.path);
                group.lock_creation();
                group
            } else {
                registry.group(&decl.path)
            };
            for pref in &decl.prefs {
                registry.make_pref(&group, &pref.name, pref.server, pref.factory_value()?)?;
            }
            if decl.tech {
                group.set_cached_objs_from_preferences();
            }
            installed.groups.insert(group.path().to_string(), group);
        }
        Ok(installed)
    }
}
