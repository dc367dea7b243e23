//! The configuration service
//!
//! Owns the defaults tree, the raw store and the view, and drives the
//! load/save lifecycle:
//!
//! ```text
//! new() ──► load() ──► ready (once) ──► get/set through store()
//!             ▲                              │
//!             │ external broadcast           ▼
//!             └──────────────────────── save() ──► persistence + siblings
//! ```
//!
//! Lifecycle operations (`load`, `save`, `write_raw`, external reloads) run
//! one at a time. The raw store and its view are swapped together under a
//! lock only after the awaited I/O has finished, so readers never see a
//! half-built view.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::broadcast::{HostBroadcast, NoBroadcast};
use crate::config::{
    parse_yaml, to_yaml, ConfigError, ConfigFragment, ConfigPersistence, ConfigResult,
    ConfigView, DefaultsProvider, DefaultsTree, SharedStore,
};
use crate::logging::SharedLogger;
use crate::plugins::{filter_enabled, PluginRegistry};
use crate::types::{ConfigChange, HostPlatform};
use crate::{log_debug, log_error, log_info};

/// Root key holding the names of disabled plugins
pub const PLUGIN_BLOCKLIST_KEY: &str = "pluginBlacklist";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

struct Loaded {
    store: SharedStore,
    view: ConfigView,
}

/// Process-wide configuration service
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use termconf_core::config::{DefaultsProvider, MemoryPersistence, StaticDefaultsProvider};
/// use termconf_core::logging::NoOpLogger;
/// use termconf_core::service::ConfigService;
/// use termconf_core::types::HostPlatform;
///
/// # block_on(async {
/// let providers: Vec<Arc<dyn DefaultsProvider>> = vec![Arc::new(
///     StaticDefaultsProvider::from_yaml("terminal:\n  fontSize: 14\n").unwrap(),
/// )];
/// let service = ConfigService::new(
///     &providers,
///     HostPlatform::native(),
///     Arc::new(MemoryPersistence::new()),
///     Arc::new(NoOpLogger),
/// );
///
/// service.load().await.unwrap();
/// let store = service.store().unwrap();
/// store.set("terminal.fontSize", json!(12)).unwrap();
/// service.save().await.unwrap();
/// assert_eq!(service.read_raw().unwrap(), "terminal:\n  fontSize: 12\n");
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     futures::executor::block_on(f)
/// # }
/// ```
pub struct ConfigService {
    defaults: DefaultsTree,
    persistence: Arc<dyn ConfigPersistence>,
    broadcast: Arc<dyn HostBroadcast>,
    logger: SharedLogger,
    loaded: RwLock<Option<Loaded>>,
    lifecycle: Mutex<()>,
    ready: watch::Sender<bool>,
    changes: broadcast::Sender<ConfigChange>,
    restart_requested: AtomicBool,
}

impl ConfigService {
    /// Aggregate the providers' defaults and create an unloaded service
    pub fn new(
        providers: &[Arc<dyn DefaultsProvider>],
        host: HostPlatform,
        persistence: Arc<dyn ConfigPersistence>,
        logger: SharedLogger,
    ) -> Self {
        let defaults = DefaultsTree::aggregate(providers, &host);
        log_debug!(
            logger,
            "Aggregated defaults from {} providers for {} (config platform {})",
            providers.len(),
            host.runtime,
            host.config
        );

        let (ready, _) = watch::channel(false);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            defaults,
            persistence,
            broadcast: Arc::new(NoBroadcast),
            logger,
            loaded: RwLock::new(None),
            lifecycle: Mutex::new(()),
            ready,
            changes,
            restart_requested: AtomicBool::new(false),
        }
    }

    /// Use a channel to sibling windows
    pub fn with_broadcast(mut self, broadcast: Arc<dyn HostBroadcast>) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Load, then start reloading on sibling notifications
    pub async fn init(self: &Arc<Self>) -> ConfigResult<JoinHandle<()>> {
        self.load().await?;
        Ok(self.listen_for_external_changes())
    }

    /// The merged defaults, markers included
    pub fn defaults(&self) -> &DefaultsTree {
        &self.defaults
    }

    /// Deep copy of the defaults with the non-structural marker stripped
    pub fn defaults_for_display(&self) -> ConfigFragment {
        self.defaults.for_display()
    }

    /// View over the current raw store
    ///
    /// The view stays bound to the raw store that was current when it was
    /// obtained; fetch it again after a reload.
    pub fn store(&self) -> ConfigResult<ConfigView> {
        self.loaded
            .read()
            .as_ref()
            .map(|loaded| loaded.view.clone())
            .ok_or(ConfigError::NotLoaded)
    }

    /// Resolved tree: raw values over defaults, shaped by the defaults
    pub fn resolved(&self) -> ConfigResult<Value> {
        Ok(self.store()?.resolve())
    }

    /// Replace the raw store with the persisted content
    ///
    /// Missing or empty content gives an empty store. Malformed content is
    /// an error and leaves the previous store in place.
    pub async fn load(&self) -> ConfigResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.load_locked(ConfigChange::Loaded).await
    }

    /// Persist the raw store, notify local listeners and sibling windows
    pub async fn save(&self) -> ConfigResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.save_locked().await
    }

    /// The raw store as YAML text
    pub fn read_raw(&self) -> ConfigResult<String> {
        let loaded = self.loaded.read();
        let loaded = loaded.as_ref().ok_or(ConfigError::NotLoaded)?;
        let text = to_yaml(&loaded.store.read())?;
        Ok(text)
    }

    /// Replace the raw store with YAML text, persist it and reload
    ///
    /// The text is parsed before anything is replaced, so malformed input
    /// leaves the store untouched.
    pub async fn write_raw(&self, text: &str) -> ConfigResult<()> {
        let fragment = parse_yaml(text)?;

        let _guard = self.lifecycle.lock().await;
        self.install(fragment);
        self.save_locked().await?;
        self.load_locked(ConfigChange::RawWritten).await
    }

    /// Note that a change needs an application restart to take effect
    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }

    /// Whether the first load has completed
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the first load has completed
    pub async fn wait_ready(&self) {
        let mut receiver = self.ready.subscribe();
        // The sender lives as long as `self`, so this can't observe a close
        let _ = receiver.wait_for(|ready| *ready).await;
    }

    /// Readiness as a watch channel; flips to `true` exactly once
    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Change notifications
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }

    /// Keep only services whose plugin is not on the configured block-list
    ///
    /// Unloaded config, a schema without the block-list key or a malformed
    /// block-list all mean nothing is blocked.
    pub fn enabled_services<T: ?Sized>(
        &self,
        services: Vec<Arc<T>>,
        registry: &dyn PluginRegistry<T>,
    ) -> Vec<Arc<T>> {
        let blocked = self.blocked_plugins();
        let before = services.len();
        let kept = filter_enabled(services, &blocked, registry);
        if kept.len() != before {
            log_debug!(
                self.logger,
                "Filtered out {} services from blocked plugins",
                before - kept.len()
            );
        }
        kept
    }

    /// Reload every time a sibling window reports a change
    ///
    /// The task ends when the channel closes or the service is dropped.
    pub fn listen_for_external_changes(self: &Arc<Self>) -> JoinHandle<()> {
        let mut inbound = self.broadcast.subscribe();
        let service: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while inbound.next().await.is_some() {
                let Some(service) = service.upgrade() else {
                    break;
                };
                let _guard = service.lifecycle.lock().await;
                if let Err(e) = service.load_locked(ConfigChange::External).await {
                    log_error!(service.logger, "Failed to reload config after external change: {}", e);
                }
            }
        })
    }

    fn blocked_plugins(&self) -> HashSet<String> {
        let Ok(view) = self.store() else {
            return HashSet::new();
        };
        if !view.contains(PLUGIN_BLOCKLIST_KEY) {
            return HashSet::new();
        }

        match view.get(PLUGIN_BLOCKLIST_KEY) {
            Ok(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => HashSet::new(),
        }
    }

    async fn load_locked(&self, change: ConfigChange) -> ConfigResult<()> {
        let content = self.persistence.load_config().await?;
        let fragment = match content.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                log_debug!(self.logger, "Loaded {} bytes of config", text.len());
                parse_yaml(text)?
            }
            _ => {
                log_debug!(self.logger, "No persisted config, starting from defaults");
                ConfigFragment::new()
            }
        };

        self.install(fragment);
        self.mark_ready();
        self.emit(change);
        Ok(())
    }

    async fn save_locked(&self) -> ConfigResult<()> {
        let (text, resolved) = {
            let loaded = self.loaded.read();
            let loaded = loaded.as_ref().ok_or(ConfigError::NotLoaded)?;
            let snapshot = loaded.store.read().clone();
            (to_yaml(&snapshot)?, loaded.view.clone())
        };

        self.persistence.save_config(&text).await?;
        log_debug!(self.logger, "Saved {} bytes of config", text.len());
        self.emit(ConfigChange::Saved);

        self.broadcast.broadcast_config_change(resolved.resolve()).await;
        Ok(())
    }

    /// Swap in a new raw store and a view over it
    fn install(&self, fragment: ConfigFragment) {
        let store: SharedStore = Arc::new(RwLock::new(fragment));
        let view = ConfigView::new(Arc::clone(&store), self.defaults.clone(), self.logger.as_ref());
        *self.loaded.write() = Some(Loaded { store, view });
    }

    fn mark_ready(&self) {
        let fired = self.ready.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
        if fired {
            log_info!(self.logger, "Config ready");
        }
    }

    fn emit(&self, change: ConfigChange) {
        log_debug!(self.logger, "Config changed ({})", change);
        // Nobody listening is fine
        let _ = self.changes.send(change);
    }
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("ready", &self.is_ready())
            .field("restart_requested", &self.restart_requested())
            .finish()
    }
}
