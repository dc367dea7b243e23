//! Change notification payload

/// Why a change notification was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// The raw store was (re)loaded from persistence
    Loaded,
    /// The raw store was written to persistence
    Saved,
    /// The raw store was replaced from user-supplied text
    RawWritten,
    /// Another window broadcast a change and this one reloaded
    External,
}

impl ConfigChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigChange::Loaded => "loaded",
            ConfigChange::Saved => "saved",
            ConfigChange::RawWritten => "raw-written",
            ConfigChange::External => "external",
        }
    }
}

impl std::fmt::Display for ConfigChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
