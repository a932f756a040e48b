use std::fmt;

use crate::value::PrefType;

/// Failure reported by a backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Filesystem or other I/O failure.
    Io(String),
    /// Stored or imported data could not be decoded.
    Format(String),
    /// Simulated failure from an in-memory store.
    Injected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Injected(msg) => write!(f, "store failure: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

/// Errors raised by the preference registry.
///
/// Everything except `Store` and `Schema` is a programming error on the
/// caller's side and is returned immediately without touching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefError {
    /// A setting with this name already exists in the group.
    DuplicateName { group: String, name: String },
    /// A value of the wrong kind was read from or written to a setting.
    TypeMismatch {
        pref: String,
        expected: PrefType,
        got: PrefType,
    },
    /// A technology group was used before its settings were locked in.
    TechGroupUnlocked { group: String },
    /// A server-accessible setting was created after initialization ended.
    CreationLocked { group: String, name: String },
    /// The group belongs to a different registry.
    ForeignGroup { group: String },
    /// Export or import against the backing store failed.
    Store(StoreError),
    /// A setting catalogue could not be parsed or validated.
    Schema(String),
}

impl fmt::Display for PrefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { group, name } => {
                write!(f, "setting '{name}' already exists in group '{group}'")
            }
            Self::TypeMismatch { pref, expected, got } => {
                write!(f, "setting '{pref}' holds {expected} values, got {got}")
            }
            Self::TechGroupUnlocked { group } => {
                write!(f, "technology group '{group}' used before it was locked")
            }
            Self::CreationLocked { group, name } => {
                write!(f, "cannot create server setting '{group}/{name}' after creation was locked")
            }
            Self::ForeignGroup { group } => {
                write!(f, "group '{group}' belongs to another preference registry")
            }
            Self::Store(e) => write!(f, "{e}"),
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
        }
    }
}

impl std::error::Error for PrefError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PrefError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub type Result<T, E = PrefError> = std::result::Result<T, E>;
