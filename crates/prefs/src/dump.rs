// Diagnostic listings of settings

use std::io::{self, Write};
use std::sync::Arc;

use serde::Serialize;

use crate::pref::Pref;
use crate::registry::PrefRegistry;
use crate::value::{PrefType, PrefValue};

/// Point-in-time view of one setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefSnapshot {
    pub group: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrefType,
    pub value: PrefValue,
    pub factory: PrefValue,
    pub server: bool,
    pub is_default: bool,
}

impl PrefSnapshot {
    pub fn of(pref: &Pref) -> Self {
        let value = pref.cached_value();
        let factory = pref.factory_value();
        Self {
            group: pref.group_path().to_string(),
            name: pref.name().to_string(),
            ty: factory.pref_type(),
            is_default: value == factory,
            value,
            factory,
            server: pref.is_server_accessible(),
        }
    }
}

pub fn snapshot(prefs: &[Arc<Pref>]) -> Vec<PrefSnapshot> {
    prefs.iter().map(|p| PrefSnapshot::of(p)).collect()
}

/// One line per setting: `group/name = value`, with the factory value
/// appended in brackets when the setting is overridden.
pub fn write_prefs(prefs: &[Arc<Pref>], out: &mut dyn Write) -> io::Result<()> {
    for pref in prefs {
        let value = pref.cached_value();
        let factory = pref.factory_value();
        if value == factory {
            writeln!(out, "{} = {}", pref.path(), value)?;
        } else {
            writeln!(out, "{} = {} [factory {}]", pref.path(), value, factory)?;
        }
    }
    Ok(())
}

impl PrefRegistry {
    /// Write every setting of every ordinary group.
    pub fn print_prefs(&self, out: &mut dyn Write) -> io::Result<()> {
        write_prefs(&self.all_prefs(), out)
    }

    pub fn snapshot(&self) -> Vec<PrefSnapshot> {
        snapshot(&self.all_prefs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;
    use crate::store::MemoryStore;
    use crate::AccessContext;

    #[test]
    fn test_print_marks_overrides() {
        let reg = PrefRegistry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
        let g = reg.group("tool/user");
        reg.make_boolean_pref("snap", &g, true).unwrap();
        let spacing = reg.make_double_pref("gridSpacing", &g, 1.0).unwrap();
        spacing.set_double(AccessContext::client(), 2.5).unwrap();

        let mut out = Vec::new();
        reg.print_prefs(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "tool/user/gridSpacing = 2.5 [factory 1]\ntool/user/snap = true\n"
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let reg = PrefRegistry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
        let g = reg.group("g");
        reg.make_string_server_pref("layer", &g, "poly").unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].is_default);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json[0]["type"], "string");
        assert_eq!(json[0]["value"]["value"], "poly");
        assert_eq!(json[0]["server"], true);
    }
}
