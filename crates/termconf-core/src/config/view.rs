//! Schema-shaped read/write view over the raw store and the defaults
//!
//! The shape of a view is fixed by the defaults tree when it is built:
//! every non-empty, structural mapping becomes a section and everything else
//! becomes a value slot. The view itself holds no values. Reads go to the
//! raw store and fall back to the defaults; writes only ever touch the raw
//! store.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::defaults::DefaultsTree;
use super::fragment::{is_non_structural, is_structural, strip_markers, ConfigFragment};
use super::traits::{ConfigError, ConfigResult};
use crate::logging::Logger;

/// The raw store, shared between the owning service and its views
pub type SharedStore = Arc<RwLock<ConfigFragment>>;

#[derive(Debug)]
enum ViewNode {
    Section(Arc<Sections>),
    Value,
}

type Sections = BTreeMap<String, ViewNode>;

/// A read/write projection of (raw store, defaults) at one section
///
/// Cloning a view is cheap and the clone refers to the same raw store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::RwLock;
/// use serde_json::json;
/// use termconf_core::config::{ConfigView, DefaultsTree};
/// use termconf_core::logging::NoOpLogger;
///
/// let defaults = match json!({"terminal": {"fontSize": 14}}) {
///     serde_json::Value::Object(map) => DefaultsTree::from_fragment(map),
///     _ => unreachable!(),
/// };
/// let store = Arc::new(RwLock::new(serde_json::Map::new()));
/// let view = ConfigView::new(store, defaults, &NoOpLogger);
///
/// assert_eq!(view.get("terminal.fontSize").unwrap(), json!(14));
/// view.set("terminal.fontSize", json!(12)).unwrap();
/// assert_eq!(view.get("terminal.fontSize").unwrap(), json!(12));
/// ```
#[derive(Clone)]
pub struct ConfigView {
    store: SharedStore,
    defaults: DefaultsTree,
    /// Location of this section from the root
    path: Vec<String>,
    children: Arc<Sections>,
}

impl ConfigView {
    /// Build the root view
    ///
    /// Every structural section declared by the defaults is created in the
    /// raw store as an empty mapping if it is missing. A raw value sitting
    /// where a section belongs is replaced by an empty mapping.
    pub fn new(store: SharedStore, defaults: DefaultsTree, logger: &dyn Logger) -> Self {
        let children = {
            let mut real = store.write();
            let mut path = Vec::new();
            build_sections(&mut real, defaults.root(), &mut path, logger)
        };

        Self {
            store,
            defaults,
            path: Vec::new(),
            children: Arc::new(children),
        }
    }

    /// Read the value at a dotted path relative to this section
    pub fn get(&self, path: &str) -> ConfigResult<Value> {
        self.get_at(&split_path(path))
    }

    /// Read the value at a key path relative to this section
    ///
    /// A raw value wins whenever it is present, null included. Otherwise a
    /// non-structural default is copied into the raw store and that copy is
    /// returned; later reads see the stored copy. Any other default is
    /// returned as-is without touching the raw store.
    pub fn get_at<S: AsRef<str>>(&self, keys: &[S]) -> ConfigResult<Value> {
        let (parent, key) = self.locate_value(keys)?;

        if let Some(value) = lookup(&self.store.read(), &parent).and_then(|m| m.get(&key)) {
            return Ok(value.clone());
        }

        let default = self.default_at(&parent, &key)?;
        if is_non_structural(default) {
            let mut real = self.store.write();
            let slot = ensure_path(&mut real, &parent)
                .entry(key)
                .or_insert_with(|| strip_markers(default));
            return Ok(slot.clone());
        }

        Ok(default.clone())
    }

    /// Write the value at a dotted path relative to this section
    pub fn set(&self, path: &str, value: Value) -> ConfigResult<()> {
        self.set_at(&split_path(path), value)
    }

    /// Write the value at a key path relative to this section
    ///
    /// Only keys declared by the defaults can be written, and sections
    /// cannot be replaced wholesale.
    pub fn set_at<S: AsRef<str>>(&self, keys: &[S], value: Value) -> ConfigResult<()> {
        let (parent, key) = self.locate_value(keys)?;
        let mut real = self.store.write();
        ensure_path(&mut real, &parent).insert(key, value);
        Ok(())
    }

    /// Mutate the value at a dotted path in place
    ///
    /// If the raw store has no value yet, the default (markers removed) is
    /// copied in first and the closure mutates that copy. Defaults are never
    /// mutated.
    pub fn update<R>(&self, path: &str, f: impl FnOnce(&mut Value) -> R) -> ConfigResult<R> {
        let (parent, key) = self.locate_value(&split_path(path))?;
        let default = self.default_at(&parent, &key)?;

        let mut real = self.store.write();
        let slot = ensure_path(&mut real, &parent)
            .entry(key)
            .or_insert_with(|| strip_markers(default));
        Ok(f(slot))
    }

    /// The nested view for a section at a dotted path
    pub fn section(&self, path: &str) -> ConfigResult<ConfigView> {
        self.section_at(&split_path(path))
    }

    /// The nested view for a section at a key path
    ///
    /// Keys are taken verbatim, so section names containing `.` are
    /// reachable here.
    pub fn section_at<S: AsRef<str>>(&self, keys: &[S]) -> ConfigResult<ConfigView> {
        let mut view = self.clone();

        for key in keys {
            let key = key.as_ref();
            let next = match view.children.get(key) {
                Some(ViewNode::Section(next)) => Arc::clone(next),
                Some(ViewNode::Value) => return Err(ConfigError::NotAValue(join(&view.path, key))),
                None => return Err(ConfigError::UnknownKey(join(&view.path, key))),
            };
            view = view.child(key, next);
        }

        Ok(view)
    }

    /// Keys of this section, in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    /// Whether the dotted path names a key declared by the defaults
    pub fn contains(&self, path: &str) -> bool {
        let mut children = &self.children;
        let keys = split_path(path);
        for (i, key) in keys.iter().enumerate() {
            match children.get(key.as_str()) {
                Some(ViewNode::Section(next)) => children = next,
                Some(ViewNode::Value) => return i + 1 == keys.len(),
                None => return false,
            }
        }
        !keys.is_empty()
    }

    /// Whether the dotted path names a section
    pub fn is_section(&self, path: &str) -> bool {
        self.section(path).is_ok()
    }

    /// Resolved tree of this section: raw values over defaults
    ///
    /// Only keys the defaults declare appear. Reading follows the same
    /// rules as [`ConfigView::get`], so unread records are promoted.
    pub fn resolve(&self) -> Value {
        let mut out = Map::new();
        for (key, node) in self.children.iter() {
            let value = match node {
                ViewNode::Section(next) => self.child(key, Arc::clone(next)).resolve(),
                ViewNode::Value => self
                    .get_at(&[key.as_str()])
                    .map(|v| strip_markers(&v))
                    .unwrap_or(Value::Null),
            };
            out.insert(key.clone(), value);
        }
        Value::Object(out)
    }

    /// View of the direct child section `key`
    fn child(&self, key: &str, children: Arc<Sections>) -> ConfigView {
        let mut path = self.path.clone();
        path.push(key.to_string());
        Self {
            store: Arc::clone(&self.store),
            defaults: self.defaults.clone(),
            path,
            children,
        }
    }

    /// Walk `keys` through the section tree down to a value slot
    ///
    /// Returns the slot's parent path from the root and its key.
    fn locate_value<S: AsRef<str>>(&self, keys: &[S]) -> ConfigResult<(Vec<String>, String)> {
        let (last, init) = keys
            .split_last()
            .ok_or_else(|| ConfigError::UnknownKey(self.path.join(".")))?;

        let mut children = &self.children;
        let mut parent = self.path.clone();
        for key in init {
            let key = key.as_ref();
            match children.get(key) {
                Some(ViewNode::Section(next)) => {
                    children = next;
                    parent.push(key.to_string());
                }
                Some(ViewNode::Value) => return Err(ConfigError::UnknownKey(join(&parent, key))),
                None => return Err(ConfigError::UnknownKey(join(&parent, key))),
            }
        }

        let last = last.as_ref();
        match children.get(last) {
            Some(ViewNode::Value) => Ok((parent, last.to_string())),
            Some(ViewNode::Section(_)) => Err(ConfigError::NotAValue(join(&parent, last))),
            None => Err(ConfigError::UnknownKey(join(&parent, last))),
        }
    }

    fn default_at(&self, parent: &[String], key: &str) -> ConfigResult<&Value> {
        lookup(self.defaults.root(), parent)
            .and_then(|m| m.get(key))
            .ok_or_else(|| ConfigError::UnknownKey(join(parent, key)))
    }
}

impl std::fmt::Debug for ConfigView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigView")
            .field("path", &self.path.join("."))
            .field("keys", &self.keys())
            .finish()
    }
}

fn build_sections(
    real: &mut ConfigFragment,
    defaults: &ConfigFragment,
    path: &mut Vec<String>,
    logger: &dyn Logger,
) -> Sections {
    let mut sections = Sections::new();

    for (key, default) in defaults {
        let default_map = match default {
            Value::Object(map) if is_structural(default) => map,
            _ => {
                sections.insert(key.clone(), ViewNode::Value);
                continue;
            }
        };

        let slot = real.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            if !slot.is_null() {
                crate::log_warn!(
                    logger,
                    "Replacing stored value at '{}' with an empty section",
                    join(path, key)
                );
            }
            *slot = Value::Object(Map::new());
        }

        if let Value::Object(child_real) = slot {
            path.push(key.clone());
            let children = build_sections(child_real, default_map, path, logger);
            path.pop();
            sections.insert(key.clone(), ViewNode::Section(Arc::new(children)));
        }
    }

    sections
}

/// Follow `path` through nested mappings; `None` if any step is missing or
/// not a mapping
fn lookup<'a>(root: &'a ConfigFragment, path: &[String]) -> Option<&'a ConfigFragment> {
    let mut current = root;
    for key in path {
        current = current.get(key)?.as_object()?;
    }
    Some(current)
}

/// Follow `path`, creating (or replacing with) empty mappings as needed
fn ensure_path<'a>(root: &'a mut ConfigFragment, path: &[String]) -> &'a mut ConfigFragment {
    let mut current = root;
    for key in path {
        let slot = current.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made a mapping"),
        };
    }
    current
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn join(parent: &[String], key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent.join("."), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fragment::non_structural;
    use crate::logging::NoOpLogger;
    use serde_json::json;

    fn obj(value: Value) -> ConfigFragment {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn view_over(raw: Value, defaults: Value) -> (SharedStore, ConfigView) {
        let store: SharedStore = Arc::new(RwLock::new(obj(raw)));
        let view = ConfigView::new(
            Arc::clone(&store),
            DefaultsTree::from_fragment(obj(defaults)),
            &NoOpLogger,
        );
        (store, view)
    }

    fn schema() -> Value {
        json!({
            "a": 1,
            "terminal": {
                "font": "Mono",
                "size": 14,
                "colors": {"fg": "#fff", "bg": "#000"},
                "profiles": ["bash"],
                "env": {},
            },
            "templates": non_structural(json!({"foo": "bar"})),
        })
    }

    #[test]
    fn test_read_write_scenario() {
        let (store, view) = view_over(json!({}), json!({"a": 1}));
        assert_eq!(view.get("a").unwrap(), json!(1));
        assert!(store.read().is_empty());

        view.set("a", json!(2)).unwrap();
        assert_eq!(view.get("a").unwrap(), json!(2));
        assert_eq!(Value::Object(store.read().clone()), json!({"a": 2}));
    }

    #[test]
    fn test_sections_created_eagerly() {
        let (store, _view) = view_over(json!({}), schema());
        assert_eq!(
            Value::Object(store.read().clone()),
            json!({"terminal": {"colors": {}}})
        );
    }

    #[test]
    fn test_every_default_key_readable() {
        let (_store, view) = view_over(json!({}), schema());
        assert_eq!(view.get("a").unwrap(), json!(1));
        assert_eq!(view.get("terminal.font").unwrap(), json!("Mono"));
        assert_eq!(view.get("terminal.colors.bg").unwrap(), json!("#000"));
        assert_eq!(view.get("terminal.profiles").unwrap(), json!(["bash"]));
        assert_eq!(view.get("terminal.env").unwrap(), json!({}));
        assert_eq!(view.get("templates").unwrap(), json!({"foo": "bar"}));
    }

    #[test]
    fn test_falsy_writes_visible() {
        let (_store, view) = view_over(json!({}), schema());
        for value in [json!(0), json!(false), json!(""), Value::Null] {
            view.set("terminal.size", value.clone()).unwrap();
            assert_eq!(view.get("terminal.size").unwrap(), value);
        }
    }

    #[test]
    fn test_raw_null_wins_over_default() {
        let (_store, view) = view_over(json!({"a": null}), schema());
        assert_eq!(view.get("a").unwrap(), Value::Null);
    }

    #[test]
    fn test_write_never_touches_defaults() {
        let defaults = DefaultsTree::from_fragment(obj(schema()));
        let store: SharedStore = Arc::new(RwLock::new(ConfigFragment::new()));
        let view = ConfigView::new(Arc::clone(&store), defaults.clone(), &NoOpLogger);

        view.set("terminal.font", json!("Fira")).unwrap();
        view.update("terminal.profiles", |v| {
            if let Value::Array(items) = v {
                items.push(json!("zsh"));
            }
        })
        .unwrap();

        assert_eq!(defaults.root()["terminal"]["font"], json!("Mono"));
        assert_eq!(defaults.root()["terminal"]["profiles"], json!(["bash"]));
        assert_eq!(view.get("terminal.profiles").unwrap(), json!(["bash", "zsh"]));
    }

    #[test]
    fn test_non_structural_promotion() {
        let (store, view) = view_over(json!({}), schema());

        let first = view.get("templates").unwrap();
        assert_eq!(first, json!({"foo": "bar"}));
        assert_eq!(store.read()["templates"], json!({"foo": "bar"}));

        let second = view.get("templates").unwrap();
        assert_eq!(first, second);

        view.update("templates", |v| v["foo"] = json!("baz")).unwrap();
        assert_eq!(view.get("templates").unwrap(), json!({"foo": "baz"}));
    }

    #[test]
    fn test_plain_defaults_not_promoted() {
        let (store, view) = view_over(json!({}), schema());
        view.get("a").unwrap();
        view.get("terminal.profiles").unwrap();
        view.get("terminal.env").unwrap();
        assert!(!store.read().contains_key("a"));
        assert!(!store.read()["terminal"].as_object().unwrap().contains_key("profiles"));
    }

    #[test]
    fn test_unknown_and_section_keys() {
        let (_store, view) = view_over(json!({}), schema());
        assert!(matches!(view.get("nope"), Err(ConfigError::UnknownKey(k)) if k == "nope"));
        assert!(matches!(view.get("terminal.nope"), Err(ConfigError::UnknownKey(k)) if k == "terminal.nope"));
        assert!(matches!(view.get("a.b"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(view.get("terminal"), Err(ConfigError::NotAValue(_))));
        assert!(matches!(view.set("terminal", json!(1)), Err(ConfigError::NotAValue(_))));
        assert!(view.set("nope", json!(1)).is_err());
    }

    #[test]
    fn test_sections_share_store() {
        let (store, view) = view_over(json!({}), schema());
        let colors = view.section("terminal.colors").unwrap();
        assert_eq!(colors.keys(), vec!["bg".to_string(), "fg".to_string()]);

        colors.set("fg", json!("#abc")).unwrap();
        assert_eq!(view.get("terminal.colors.fg").unwrap(), json!("#abc"));
        assert_eq!(store.read()["terminal"]["colors"]["fg"], json!("#abc"));

        assert!(matches!(view.section("a"), Err(ConfigError::NotAValue(_))));
        assert!(view.is_section("terminal"));
        assert!(!view.is_section("templates"));
    }

    #[test]
    fn test_contains() {
        let (_store, view) = view_over(json!({}), schema());
        assert!(view.contains("terminal.colors.fg"));
        assert!(view.contains("terminal"));
        assert!(view.contains("templates"));
        assert!(!view.contains("templates.foo"));
        assert!(!view.contains("missing"));
        assert!(!view.contains(""));
    }

    #[test]
    fn test_stale_raw_keys_tolerated() {
        let (store, view) = view_over(
            json!({"old": 5, "terminal": {"removed": true, "font": "Hack"}}),
            schema(),
        );
        assert_eq!(view.get("terminal.font").unwrap(), json!("Hack"));
        assert!(!view.contains("old"));
        assert_eq!(store.read()["old"], json!(5));

        let resolved = view.resolve();
        assert!(resolved.get("old").is_none());
        assert!(resolved["terminal"].get("removed").is_none());
    }

    #[test]
    fn test_scalar_where_section_expected_is_replaced() {
        let (store, view) = view_over(json!({"terminal": 3}), schema());
        assert_eq!(store.read()["terminal"], json!({"colors": {}}));
        assert_eq!(view.get("terminal.size").unwrap(), json!(14));
    }

    #[test]
    fn test_write_after_section_removed_from_store() {
        let (store, view) = view_over(json!({}), schema());
        store.write().clear();
        assert_eq!(view.get("terminal.colors.fg").unwrap(), json!("#fff"));
        view.set("terminal.colors.fg", json!("#111")).unwrap();
        assert_eq!(store.read()["terminal"]["colors"]["fg"], json!("#111"));
    }

    #[test]
    fn test_dotted_keys_resolve_and_sections() {
        let (_store, view) = view_over(
            json!({"hosts": {"example.com": {"port": 2222}}}),
            json!({"hosts": {"example.com": {"port": 22, "user": "root"}}, "a.b": 1}),
        );

        assert_eq!(view.get_at(&["hosts", "example.com", "port"]).unwrap(), json!(2222));
        assert_eq!(
            view.resolve(),
            json!({"a.b": 1, "hosts": {"example.com": {"port": 2222, "user": "root"}}})
        );

        let host = view.section_at(&["hosts", "example.com"]).unwrap();
        assert_eq!(host.get("user").unwrap(), json!("root"));
        host.set("user", json!("admin")).unwrap();
        assert_eq!(view.get_at(&["hosts", "example.com", "user"]).unwrap(), json!("admin"));
        assert_eq!(host.resolve(), json!({"port": 2222, "user": "admin"}));
    }

    #[test]
    fn test_resolve() {
        let (_store, view) = view_over(json!({"terminal": {"size": 10}}), schema());
        assert_eq!(
            view.resolve(),
            json!({
                "a": 1,
                "terminal": {
                    "font": "Mono",
                    "size": 10,
                    "colors": {"fg": "#fff", "bg": "#000"},
                    "profiles": ["bash"],
                    "env": {},
                },
                "templates": {"foo": "bar"},
            })
        );
    }
}
