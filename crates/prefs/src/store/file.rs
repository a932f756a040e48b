// File-backed store
// One prefs.json per node, laid out under a root directory:
//   <root>/tool/user/prefs.json  holds node "tool/user"

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{normalize_path, BackingStore, StoreNode};
use crate::error::StoreError;

const NODE_FILE: &str = "prefs.json";

pub struct FileNode {
    path: String,
    file: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    /// Set when an existing file could not be read; the node then refuses
    /// to flush so the file on disk is left alone.
    load_error: Option<String>,
}

impl FileNode {
    fn load(path: String, file: PathBuf) -> Self {
        let (entries, load_error) = match fs::read_to_string(&file) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => (map, None),
                Err(e) => {
                    log::warn!("Ignoring unreadable preferences {}: {}", file.display(), e);
                    (BTreeMap::new(), None)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (BTreeMap::new(), None),
            Err(e) => {
                log::warn!("Cannot read preferences {}: {}", file.display(), e);
                (BTreeMap::new(), Some(e.to_string()))
            }
        };
        Self {
            path,
            file,
            entries: Mutex::new(entries),
            load_error,
        }
    }
}

impl StoreNode for FileNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put_raw(&self, key: &str, value: String) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(err) = &self.load_error {
            return Err(StoreError::Io(format!(
                "{} was not readable ({}), refusing to overwrite it",
                self.file.display(),
                err
            )));
        }
        let json = {
            let entries = self.entries.lock();
            serde_json::to_string_pretty(&*entries)?
        };
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file, json)?;
        Ok(())
    }
}

/// Store that persists each node as a JSON file.
pub struct JsonFileStore {
    root: PathBuf,
    nodes: Mutex<HashMap<String, Arc<FileNode>>>,
}

impl JsonFileStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Default location: ~/.config/electric/prefs
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("electric")
            .join("prefs")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node_file(&self, path: &str) -> PathBuf {
        let mut file = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            // Keep every node inside the root.
            if segment == "." || segment == ".." {
                file.push("_");
            } else {
                file.push(segment);
            }
        }
        file.join(NODE_FILE)
    }

    fn collect_paths(dir: &Path, prefix: &str, out: &mut BTreeSet<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let child = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", prefix, name)
                };
                Self::collect_paths(&path, &child, out);
            } else if path.file_name().and_then(|n| n.to_str()) == Some(NODE_FILE) {
                out.insert(prefix.to_string());
            }
        }
    }
}

impl BackingStore for JsonFileStore {
    fn node(&self, path: &str) -> Arc<dyn StoreNode> {
        let path = normalize_path(path);
        let mut nodes = self.nodes.lock();
        if let Some(node) = nodes.get(&path) {
            return node.clone();
        }
        let node = Arc::new(FileNode::load(path.clone(), self.node_file(&path)));
        nodes.insert(path, node.clone());
        node
    }

    fn node_paths(&self) -> Vec<String> {
        let mut paths = BTreeSet::new();
        Self::collect_paths(&self.root, "", &mut paths);
        paths.extend(self.nodes.lock().keys().cloned());
        paths.into_iter().collect()
    }
}
