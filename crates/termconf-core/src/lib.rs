//! termconf Core
//!
//! Layered configuration engine for a plugin-based terminal application.
//! Plugins contribute default fragments (generic and per platform), the user's
//! persisted YAML sits on top, and consumers read and write through a view
//! shaped by the defaults.
//!
//! ## Layers
//!
//! ```text
//! provider defaults ─┐
//! platform defaults ─┼─► DefaultsTree (immutable) ─┐
//!                    │                             ├─► ConfigView ─► consumers
//! persisted YAML ────┴─────────► raw store ────────┘
//! ```
//!
//! ```rust,ignore
//! use termconf_core::{ConfigService, FilePersistence, HostPlatform};
//!
//! let service = Arc::new(ConfigService::new(&providers, HostPlatform::native(),
//!     Arc::new(FilePersistence::user("termconf")), logger));
//! let _listener = service.init().await?;
//!
//! let store = service.store()?;
//! store.set("terminal.fontSize", json!(13))?;
//! service.save().await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod broadcast;
pub mod plugins;
pub mod service;

// Re-export commonly used types
pub use types::{Platform, HostPlatform, ConfigChange};

pub use logging::{Logger, NoOpLogger, ConsoleLogger, LogLevel, SharedLogger};

pub use config::{
    ConfigFragment, ConfigError, ConfigResult, ConfigPersistence, ConfigView,
    DefaultsProvider, StaticDefaultsProvider, DefaultsTree,
    MemoryPersistence, FilePersistence,
};

pub use broadcast::{HostBroadcast, NoBroadcast, LocalBroadcastHub, LocalBroadcast};

pub use plugins::{PluginRegistry, NamedService, StaticPluginRegistry};

pub use service::{ConfigService, PLUGIN_BLOCKLIST_KEY};
