//! File-based persistence (YAML)
//!
//! The default location is the user config directory:
//! `~/.config/<app>/config.yaml` on Linux, `~/Library/Application Support/<app>/config.yaml`
//! on macOS, `%APPDATA%\<app>\config.yaml` on Windows.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::traits::{ConfigPersistence, ConfigResult};

/// Persists the raw config text in a single file
///
/// # Example
///
/// ```no_run
/// use termconf_core::config::FilePersistence;
///
/// let user = FilePersistence::user("termconf");
/// let custom = FilePersistence::new("/tmp/termconf/config.yaml");
/// ```
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Persist to a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist to `<config dir>/<app>/config.yaml`
    pub fn user(app: &str) -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join(app).join("config.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Copy the current file next to itself with a `.backup` suffix
    ///
    /// Returns `None` if there is nothing to back up.
    pub async fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let mut name = self.path.as_os_str().to_owned();
        name.push(".backup");
        let backup_path = PathBuf::from(name);
        tokio::fs::copy(&self.path, &backup_path).await?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FilePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePersistence")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigPersistence for FilePersistence {
    async fn load_config(&self) -> ConfigResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_config(&self, content: &str) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
