//! Shared types for the configuration engine

mod platform;
mod change;

pub use platform::{Platform, HostPlatform};
pub use change::ConfigChange;
