//! Platform identifiers used to select platform-specific defaults

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A platform identifier
///
/// Providers key their platform-specific fragments by this value. The known
/// platforms serialize to the names host applications write in YAML
/// defaults; any other name is carried through as [`Platform::Other`] so a
/// host can define platforms of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    Web,
    Other(String),
}

impl Platform {
    /// Platform of the compile target
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_arch = "wasm32") {
            Platform::Web
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOS => "macOS",
            Platform::Windows => "Windows",
            Platform::Web => "Web",
            Platform::Other(name) => name,
        }
    }

    /// Parse a platform name
    ///
    /// Known names match case-insensitively, along with the usual target
    /// aliases (`darwin`, `win32`). Anything else becomes `Other` with the
    /// name kept verbatim.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "linux" => Platform::Linux,
            "macos" | "darwin" | "mac" => Platform::MacOS,
            "windows" | "win32" | "win" => Platform::Windows,
            "web" => Platform::Web,
            _ => Platform::Other(name.to_string()),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Platform {
    fn from(name: &str) -> Self {
        Platform::parse(name)
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Platform::parse(&name))
    }
}

/// The pair of platforms the default aggregator consults
///
/// `runtime` is where the process actually runs. `config` is the logical
/// platform used for config lookup; it usually equals `runtime` but a host
/// can point it elsewhere (a web build reusing desktop defaults, for one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub runtime: Platform,
    pub config: Platform,
}

impl HostPlatform {
    pub fn new(runtime: Platform) -> Self {
        Self {
            config: runtime.clone(),
            runtime,
        }
    }

    /// Both platforms set to the compile target
    pub fn native() -> Self {
        Self::new(Platform::current())
    }

    /// Override the config-lookup platform
    pub fn with_config_platform(mut self, config: Platform) -> Self {
        self.config = config;
        self
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::native()
    }
}
