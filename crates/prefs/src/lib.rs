//! `electric-prefs`: typed, cached preference registry.
//!
//! Settings live in groups, groups live in a backing store. Reads are served
//! from an in-memory cache; writes go through the owning group to the store,
//! flushed immediately or batched between `delay_flushing` and
//! `resume_flushing`.

pub mod access;
pub mod config;
pub mod dump;
pub mod error;
pub mod flush;
pub mod group;
pub mod pref;
pub mod registry;
pub mod schema;
pub mod store;
pub mod value;

pub use access::{AccessContext, DiagnosticPolicy};
pub use config::RegistryConfig;
pub use dump::PrefSnapshot;
pub use error::{PrefError, StoreError};
pub use flush::{FlushGuard, FlushMode};
pub use group::Group;
pub use pref::Pref;
pub use registry::PrefRegistry;
pub use schema::{Installed, Schema};
pub use store::{BackingStore, JsonFileStore, MemoryStore, StoreNode};
pub use value::{PrefType, PrefValue};
