//! Resolve which plugin provided a service, and filter out blocked plugins

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Answers "which plugin provided this service instance?"
pub trait PluginRegistry<T: ?Sized>: Send + Sync {
    /// The owning plugin's name, or `None` if the owner is unknown
    fn owner_of(&self, service: &T) -> Option<String>;
}

/// A service that can identify its own implementation by name
pub trait NamedService {
    fn service_name(&self) -> &str;
}

/// Registry built from a fixed plugin → service-name table
///
/// # Example
///
/// ```
/// use termconf_core::plugins::StaticPluginRegistry;
///
/// let registry = StaticPluginRegistry::new()
///     .with_plugin("ssh", ["SshTabProvider", "SshProfileProvider"])
///     .with_plugin("serial", ["SerialTabProvider"]);
/// assert_eq!(registry.plugin_of("SerialTabProvider"), Some("serial"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticPluginRegistry {
    owners: HashMap<String, String>,
}

impl StaticPluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `plugin` provides the named services
    ///
    /// A service name registered twice belongs to the last plugin.
    pub fn with_plugin<I, S>(mut self, plugin: &str, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for service in services {
            self.owners.insert(service.into(), plugin.to_string());
        }
        self
    }

    /// The plugin that provides the named service
    pub fn plugin_of(&self, service_name: &str) -> Option<&str> {
        self.owners.get(service_name).map(String::as_str)
    }
}

impl<T: NamedService + ?Sized> PluginRegistry<T> for StaticPluginRegistry {
    fn owner_of(&self, service: &T) -> Option<String> {
        self.plugin_of(service.service_name()).map(str::to_string)
    }
}

/// Keep services whose owning plugin is not blocked
///
/// Services with no known owner are always kept. Order is preserved.
pub fn filter_enabled<T: ?Sized>(
    services: Vec<Arc<T>>,
    blocked: &HashSet<String>,
    registry: &dyn PluginRegistry<T>,
) -> Vec<Arc<T>> {
    if blocked.is_empty() {
        return services;
    }

    services
        .into_iter()
        .filter(|service| match registry.owner_of(service.as_ref()) {
            Some(plugin) => !blocked.contains(&plugin),
            None => true,
        })
        .collect()
}
