//! In-memory persistence

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{ConfigError, ConfigPersistence, ConfigResult};

/// In-memory persistence for tests and hosts that hand config in directly
///
/// Keeps the last saved text. Failures can be injected to exercise error
/// paths in callers, and `with_yielding` makes every call suspend once
/// before touching the content, the way real I/O would.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    content: RwLock<Option<String>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    yielding: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    /// Create an empty store (nothing persisted yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `content`
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: RwLock::new(Some(content.into())),
            ..Self::default()
        }
    }

    /// Suspend once inside every load and save
    pub fn with_yielding(self) -> Self {
        self.yielding.store(true, Ordering::SeqCst);
        self
    }

    /// The currently persisted text
    pub fn content(&self) -> Option<String> {
        self.content.read().clone()
    }

    /// Replace the persisted text, as another process would
    pub fn set_content(&self, content: Option<String>) {
        *self.content.write() = content;
    }

    /// Make subsequent loads fail with an I/O error
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent saves fail with an I/O error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

fn injected(kind: std::io::ErrorKind, message: &str) -> ConfigError {
    ConfigError::Io(std::io::Error::new(kind, message.to_string()))
}

#[async_trait]
impl ConfigPersistence for MemoryPersistence {
    async fn load_config(&self) -> ConfigResult<Option<String>> {
        self.pause().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(injected(std::io::ErrorKind::NotFound, "memory store is unavailable"));
        }
        Ok(self.content.read().clone())
    }

    async fn save_config(&self, content: &str) -> ConfigResult<()> {
        self.pause().await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(injected(std::io::ErrorKind::PermissionDenied, "memory store is read-only"));
        }
        *self.content.write() = Some(content.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
