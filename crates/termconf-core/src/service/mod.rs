//! Configuration service: lifecycle, notifications, plugin filtering

mod config_service;

pub use config_service::{ConfigService, PLUGIN_BLOCKLIST_KEY};
