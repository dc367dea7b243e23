//! Persistence boundary and error types

use async_trait::async_trait;

/// Persistence adapter for the raw configuration text
///
/// Implementations:
/// - `MemoryPersistence`: In-memory for tests and embedded hosts
/// - `FilePersistence`: YAML file on disk (~/.config/<app>/config.yaml)
/// - Host adapters: browser storage, a parent process, etc.
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// Load the persisted text, or `None` if nothing has been persisted yet
    async fn load_config(&self) -> ConfigResult<Option<String>>;

    /// Persist the given text, replacing whatever was stored before
    async fn save_config(&self, content: &str) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Deserialization(String),

    #[error("Failed to serialize config: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Config key is a section, not a value: {0}")]
    NotAValue(String),

    #[error("Config has not been loaded yet")]
    NotLoaded,

    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    /// Whether this error came from malformed text rather than I/O
    pub fn is_deserialization(&self) -> bool {
        matches!(self, ConfigError::Deserialization(_))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
