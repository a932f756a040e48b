// Registry configuration
// Loaded from TOML, e.g. ~/.config/electric/registry.toml:
//
//   batch_mode = true
//   read_diagnostics = "log_once"
//   write_diagnostics = "log_always"
//   store_root = "/var/lib/electric/prefs"

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::access::DiagnosticPolicy;
use crate::error::PrefError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Headless operation: failed flushes are not reported as warnings.
    pub batch_mode: bool,

    /// Reporting of out-of-scope reads.
    pub read_diagnostics: DiagnosticPolicy,

    /// Reporting of out-of-scope writes.
    pub write_diagnostics: DiagnosticPolicy,

    /// Root of the file store, None = platform config directory
    pub store_root: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            batch_mode: false,
            read_diagnostics: DiagnosticPolicy::LogOnce,
            write_diagnostics: DiagnosticPolicy::LogAlways,
            store_root: None,
        }
    }
}

impl RegistryConfig {
    pub fn from_toml(text: &str) -> Result<Self, PrefError> {
        toml::from_str(text).map_err(|e| PrefError::Schema(format!("registry config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, PrefError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PrefError::Schema(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Default config file location: ~/.config/electric/registry.toml
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("electric")
            .join("registry.toml")
    }

    /// Load the default config file, falling back to defaults.
    pub fn load_default() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default registry config: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(RegistryConfig::from_toml("").unwrap(), RegistryConfig::default());
    }

    #[test]
    fn test_parse_all_fields() {
        let config = RegistryConfig::from_toml(
            r#"
batch_mode = true
read_diagnostics = "log_always"
write_diagnostics = "silent"
store_root = "/srv/prefs"
"#,
        )
        .unwrap();
        assert!(config.batch_mode);
        assert_eq!(config.read_diagnostics, DiagnosticPolicy::LogAlways);
        assert_eq!(config.write_diagnostics, DiagnosticPolicy::Silent);
        assert_eq!(config.store_root, Some(PathBuf::from("/srv/prefs")));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(matches!(
            RegistryConfig::from_toml("batch = true"),
            Err(PrefError::Schema(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        fs::write(&path, "batch_mode = true\n").unwrap();
        assert!(RegistryConfig::load(&path).unwrap().batch_mode);
        assert!(RegistryConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
