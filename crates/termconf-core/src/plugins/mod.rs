//! Plugin ownership of services and block-list filtering

mod registry;

pub use registry::{PluginRegistry, NamedService, StaticPluginRegistry, filter_enabled};
