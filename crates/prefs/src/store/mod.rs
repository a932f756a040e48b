//! Backing stores for preference values.
//!
//! A store is a tree of nodes addressed by slash-separated paths. Each node
//! is a flat string map, the same shape the platform preference services
//! expose, and typed access is layered on top by parsing. Nothing here
//! caches values on behalf of settings; the registry owns the cache.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::value::{PrefType, PrefValue};

/// Version written into export documents.
pub const EXPORT_VERSION: u32 = 1;

/// One node of a backing store.
pub trait StoreNode: Send + Sync {
    /// Normalized path of this node.
    fn path(&self) -> &str;

    fn get_raw(&self, key: &str) -> Option<String>;

    fn put_raw(&self, key: &str, value: String);

    fn remove(&self, key: &str);

    /// Keys present in this node, sorted.
    fn keys(&self) -> Vec<String>;

    /// Push pending changes to durable storage.
    fn flush(&self) -> Result<(), StoreError>;

    fn entries(&self) -> BTreeMap<String, String> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get_raw(&k).map(|v| (k, v)))
            .collect()
    }

    fn get_boolean(&self, key: &str, default: bool) -> bool {
        self.get_typed(key, PrefType::Bool)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get_typed(key, PrefType::Int)
            .and_then(|v| v.as_int())
            .unwrap_or(default)
    }

    fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get_typed(key, PrefType::Long)
            .and_then(|v| v.as_long())
            .unwrap_or(default)
    }

    fn get_double(&self, key: &str, default: f64) -> f64 {
        self.get_typed(key, PrefType::Double)
            .and_then(|v| v.as_double())
            .unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.get_raw(key).unwrap_or_else(|| default.to_string())
    }

    fn put_boolean(&self, key: &str, value: bool) {
        self.put_raw(key, value.to_string());
    }

    fn put_int(&self, key: &str, value: i32) {
        self.put_raw(key, value.to_string());
    }

    fn put_long(&self, key: &str, value: i64) {
        self.put_raw(key, value.to_string());
    }

    fn put_double(&self, key: &str, value: f64) {
        self.put_raw(key, PrefValue::Double(value).to_stored());
    }

    fn put(&self, key: &str, value: &str) {
        self.put_raw(key, value.to_string());
    }

    /// Raw value parsed as `ty`; `None` if absent or unparsable.
    fn get_typed(&self, key: &str, ty: PrefType) -> Option<PrefValue> {
        self.get_raw(key).and_then(|raw| PrefValue::parse_as(ty, &raw))
    }
}

/// Read `key` using `default` as both fallback and type selector.
pub fn read_value(node: &dyn StoreNode, key: &str, default: &PrefValue) -> PrefValue {
    match default {
        PrefValue::Bool(d) => PrefValue::Bool(node.get_boolean(key, *d)),
        PrefValue::Int(d) => PrefValue::Int(node.get_int(key, *d)),
        PrefValue::Long(d) => PrefValue::Long(node.get_long(key, *d)),
        PrefValue::Double(d) => PrefValue::Double(node.get_double(key, *d)),
        PrefValue::Str(d) => PrefValue::Str(node.get_string(key, d)),
    }
}

/// Write `value` under `key` with the store call matching its kind.
pub fn write_value(node: &dyn StoreNode, key: &str, value: &PrefValue) {
    match value {
        PrefValue::Bool(v) => node.put_boolean(key, *v),
        PrefValue::Int(v) => node.put_int(key, *v),
        PrefValue::Long(v) => node.put_long(key, *v),
        PrefValue::Double(v) => node.put_double(key, *v),
        PrefValue::Str(v) => node.put(key, v),
    }
}

/// Serialized form of a store subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    pub nodes: BTreeMap<String, BTreeMap<String, String>>,
}

/// A hierarchical key-value store that settings persist into.
pub trait BackingStore: Send + Sync {
    /// Resolve (creating if needed) the node at `path`.
    fn node(&self, path: &str) -> Arc<dyn StoreNode>;

    /// Paths of every node the store knows about, sorted.
    fn node_paths(&self) -> Vec<String>;

    /// Write every node at or below `prefix` as an export document.
    /// An empty prefix exports the whole store.
    fn export_subtree(&self, prefix: &str, out: &mut dyn Write) -> Result<(), StoreError> {
        let prefix = normalize_path(prefix);
        let mut doc = ExportDocument {
            version: EXPORT_VERSION,
            nodes: BTreeMap::new(),
        };
        for path in self.node_paths() {
            if !is_within(&path, &prefix) {
                continue;
            }
            let entries = self.node(&path).entries();
            if !entries.is_empty() {
                doc.nodes.insert(path, entries);
            }
        }
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    /// Merge an export document into the store. Touched nodes are not
    /// flushed here; returns their paths so the caller can flush them.
    fn import_subtree(&self, input: &mut dyn Read) -> Result<Vec<String>, StoreError> {
        let doc: ExportDocument = serde_json::from_reader(input)?;
        if doc.version != EXPORT_VERSION {
            return Err(StoreError::Format(format!(
                "unsupported export version {} (expected {})",
                doc.version, EXPORT_VERSION
            )));
        }
        let mut touched = Vec::with_capacity(doc.nodes.len());
        for (path, entries) in doc.nodes {
            let node = self.node(&path);
            for (key, value) in entries {
                node.put_raw(&key, value);
            }
            touched.push(node.path().to_string());
        }
        Ok(touched)
    }
}

/// Strip leading/trailing slashes and collapse empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_within(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'))
}
