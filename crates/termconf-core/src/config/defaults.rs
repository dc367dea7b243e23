//! Default aggregation across plugin providers
//!
//! Each provider contributes an optional generic fragment plus fragments
//! keyed by platform. Per provider, the config-platform fragment is the
//! base, the runtime-platform fragment is merged over it, and the result is
//! merged over the generic fragment. Providers are then folded left to
//! right, so later providers win on conflicts.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::fragment::{merge_fragments, parse_yaml, strip_markers, ConfigFragment};
use super::traits::{ConfigError, ConfigResult};
use crate::types::{HostPlatform, Platform};

/// A source of default configuration, typically one per plugin
///
/// Both methods default to "nothing", so a provider only implements what it
/// actually contributes.
pub trait DefaultsProvider: Send + Sync {
    /// Defaults that apply on every platform
    fn defaults(&self) -> Option<ConfigFragment> {
        None
    }

    /// Defaults keyed by platform
    fn platform_defaults(&self) -> HashMap<Platform, ConfigFragment> {
        HashMap::new()
    }
}

/// A provider declared from fixed fragments
///
/// # Example
///
/// ```
/// use termconf_core::config::StaticDefaultsProvider;
/// use termconf_core::types::Platform;
///
/// let provider = StaticDefaultsProvider::from_yaml("terminal:\n  font: Monospace\n")
///     .unwrap()
///     .with_platform_yaml(Platform::MacOS, "terminal:\n  font: Menlo\n")
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDefaultsProvider {
    defaults: Option<ConfigFragment>,
    platform_defaults: HashMap<Platform, ConfigFragment>,
}

impl StaticDefaultsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generic fragment
    pub fn with_defaults(mut self, defaults: ConfigFragment) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Set the fragment for one platform
    pub fn with_platform(mut self, platform: Platform, fragment: ConfigFragment) -> Self {
        self.platform_defaults.insert(platform, fragment);
        self
    }

    /// Create a provider whose generic fragment is parsed from YAML
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        Ok(Self::new().with_defaults(parse_yaml(text)?))
    }

    /// Set the fragment for one platform from YAML
    pub fn with_platform_yaml(self, platform: Platform, text: &str) -> ConfigResult<Self> {
        Ok(self.with_platform(platform, parse_yaml(text)?))
    }

    /// Set platform fragments from a YAML mapping of platform name to fragment
    ///
    /// Names go through [`Platform::parse`], so unknown platforms are kept
    /// under their own name.
    pub fn with_platforms_yaml(mut self, text: &str) -> ConfigResult<Self> {
        for (name, fragment) in parse_yaml(text)? {
            let fragment = match fragment {
                Value::Object(map) => map,
                Value::Null => ConfigFragment::new(),
                _ => {
                    return Err(ConfigError::Deserialization(format!(
                        "platform defaults for {} must be a mapping",
                        name
                    )))
                }
            };
            self.platform_defaults.insert(Platform::parse(&name), fragment);
        }
        Ok(self)
    }
}

impl DefaultsProvider for StaticDefaultsProvider {
    fn defaults(&self) -> Option<ConfigFragment> {
        self.defaults.clone()
    }

    fn platform_defaults(&self) -> HashMap<Platform, ConfigFragment> {
        self.platform_defaults.clone()
    }
}

/// The merged, immutable union of every provider's defaults
///
/// Cloning is cheap; all clones share one tree.
#[derive(Debug, Clone, Default)]
pub struct DefaultsTree {
    root: Arc<ConfigFragment>,
}

impl DefaultsTree {
    /// Aggregate the given providers for a host platform
    ///
    /// An empty provider list gives an empty tree.
    pub fn aggregate(providers: &[Arc<dyn DefaultsProvider>], host: &HostPlatform) -> Self {
        let root = providers
            .iter()
            .map(|provider| provider_contribution(provider.as_ref(), host))
            .fold(ConfigFragment::new(), merge_fragments);
        Self::from_fragment(root)
    }

    /// Wrap an already merged fragment
    pub fn from_fragment(root: ConfigFragment) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Borrow the tree, markers included
    pub fn root(&self) -> &ConfigFragment {
        &self.root
    }

    /// Deep copy with the non-structural marker stripped at every level
    pub fn for_display(&self) -> ConfigFragment {
        match strip_markers(&Value::Object((*self.root).clone())) {
            Value::Object(map) => map,
            _ => ConfigFragment::new(),
        }
    }
}

fn provider_contribution(provider: &dyn DefaultsProvider, host: &HostPlatform) -> ConfigFragment {
    let mut by_platform = provider.platform_defaults();
    let base = by_platform.remove(&host.config).unwrap_or_default();
    let runtime = if host.runtime == host.config {
        ConfigFragment::new()
    } else {
        by_platform.remove(&host.runtime).unwrap_or_default()
    };
    let platform_specific = merge_fragments(base, runtime);

    match provider.defaults() {
        Some(generic) => merge_fragments(generic, platform_specific),
        None => platform_specific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fragment::non_structural;
    use serde_json::json;

    fn obj(value: Value) -> ConfigFragment {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn provider(defaults: Value) -> Arc<dyn DefaultsProvider> {
        Arc::new(StaticDefaultsProvider::new().with_defaults(obj(defaults)))
    }

    #[test]
    fn test_two_providers_merge_sections() {
        let providers = vec![
            provider(json!({"a": 1, "b": {"x": 1}})),
            provider(json!({"b": {"y": 2}})),
        ];
        let tree = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::Linux));
        assert_eq!(Value::Object(tree.root().clone()), json!({"a": 1, "b": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_later_provider_wins() {
        let providers = vec![
            provider(json!({"k": 1, "only1": true})),
            provider(json!({"k": 2})),
            provider(json!({"k": 3, "list": ["z"]})),
        ];
        let tree = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::Linux));

        let folded = [json!({"k": 1, "only1": true}), json!({"k": 2}), json!({"k": 3, "list": ["z"]})]
            .into_iter()
            .map(obj)
            .fold(ConfigFragment::new(), merge_fragments);

        assert_eq!(tree.root(), &folded);
        assert_eq!(tree.root()["k"], json!(3));
    }

    #[test]
    fn test_platform_overrides_generic() {
        let p: Arc<dyn DefaultsProvider> = Arc::new(
            StaticDefaultsProvider::new()
                .with_defaults(obj(json!({"font": "Monospace", "shells": ["sh"]})))
                .with_platform(Platform::MacOS, obj(json!({"font": "Menlo", "shells": ["zsh"]})))
                .with_platform(Platform::Windows, obj(json!({"font": "Consolas"}))),
        );

        let mac = DefaultsTree::aggregate(&[p.clone()], &HostPlatform::new(Platform::MacOS));
        assert_eq!(Value::Object(mac.root().clone()), json!({"font": "Menlo", "shells": ["zsh"]}));

        let linux = DefaultsTree::aggregate(&[p], &HostPlatform::new(Platform::Linux));
        assert_eq!(Value::Object(linux.root().clone()), json!({"font": "Monospace", "shells": ["sh"]}));
    }

    #[test]
    fn test_runtime_platform_layered_over_config_platform() {
        let p: Arc<dyn DefaultsProvider> = Arc::new(
            StaticDefaultsProvider::new()
                .with_platform(Platform::Linux, obj(json!({"font": "DejaVu", "bell": "audible"})))
                .with_platform(Platform::Web, obj(json!({"bell": "visual"}))),
        );
        let host = HostPlatform::new(Platform::Web).with_config_platform(Platform::Linux);
        let tree = DefaultsTree::aggregate(&[p], &host);
        assert_eq!(Value::Object(tree.root().clone()), json!({"font": "DejaVu", "bell": "visual"}));
    }

    #[test]
    fn test_missing_pieces_are_empty() {
        let providers: Vec<Arc<dyn DefaultsProvider>> = vec![Arc::new(StaticDefaultsProvider::new())];
        let tree = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::Linux));
        assert!(tree.root().is_empty());

        let none = DefaultsTree::aggregate(&[], &HostPlatform::new(Platform::Linux));
        assert!(none.root().is_empty());
    }

    #[test]
    fn test_for_display_strips_markers_and_copies() {
        let tree = DefaultsTree::from_fragment(obj(json!({
            "templates": non_structural(json!({"foo": "bar"})),
            "terminal": {"font": "Mono"},
        })));

        let mut shown = tree.for_display();
        assert_eq!(Value::Object(shown.clone()), json!({"templates": {"foo": "bar"}, "terminal": {"font": "Mono"}}));

        shown.insert("terminal".to_string(), json!("changed"));
        assert_eq!(tree.root()["terminal"], json!({"font": "Mono"}));
        assert!(crate::config::fragment::is_non_structural(&tree.root()["templates"]));
    }

    #[test]
    fn test_yaml_provider() {
        let p = StaticDefaultsProvider::from_yaml("pluginBlacklist: []\nterminal:\n  fontSize: 14\n")
            .unwrap()
            .with_platform_yaml(Platform::Windows, "terminal:\n  fontSize: 12\n")
            .unwrap();
        let providers: Vec<Arc<dyn DefaultsProvider>> = vec![Arc::new(p)];
        let tree = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::Windows));
        assert_eq!(tree.root()["terminal"]["fontSize"], json!(12));
        assert_eq!(tree.root()["pluginBlacklist"], json!([]));
    }

    #[test]
    fn test_platforms_yaml_with_custom_platform() {
        let p = StaticDefaultsProvider::from_yaml("terminal:\n  font: Monospace\n")
            .unwrap()
            .with_platforms_yaml("darwin:\n  terminal:\n    font: Menlo\nFreeBSD:\n  terminal:\n    font: Spleen\n")
            .unwrap();
        let providers: Vec<Arc<dyn DefaultsProvider>> = vec![Arc::new(p)];

        let bsd = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::parse("FreeBSD")));
        assert_eq!(bsd.root()["terminal"]["font"], json!("Spleen"));

        let mac = DefaultsTree::aggregate(&providers, &HostPlatform::new(Platform::MacOS));
        assert_eq!(mac.root()["terminal"]["font"], json!("Menlo"));

        let err = StaticDefaultsProvider::new().with_platforms_yaml("Linux: 3\n").unwrap_err();
        assert!(err.is_deserialization());
    }
}
