//! Layered configuration: defaults, raw store, view, persistence
//!
//! - `DefaultsTree`: merged plugin defaults, built once
//! - `ConfigView`: read/write projection of the raw store over the defaults
//! - `ConfigPersistence`: where the raw store's YAML text lives
//!   (`MemoryPersistence`, `FilePersistence`)

mod traits;
mod fragment;
mod defaults;
mod view;
mod memory;
mod file;

pub use traits::{ConfigPersistence, ConfigError, ConfigResult};
pub use fragment::{
    ConfigFragment, NON_STRUCTURAL_KEY,
    non_structural, is_non_structural, is_structural, strip_markers,
    deep_merge, merge_fragments, parse_yaml, to_yaml,
};
pub use defaults::{DefaultsProvider, StaticDefaultsProvider, DefaultsTree};
pub use view::{ConfigView, SharedStore};
pub use memory::MemoryPersistence;
pub use file::FilePersistence;
