//! Cross-window change broadcast
//!
//! A window that saves its configuration publishes the resolved tree to its
//! siblings. Each sibling receives the notification and reloads from
//! persistence; the payload is informational.
//!
//! ```text
//! window A: save() ──► persistence ──┐
//!      │                             │ load()
//!      └─► broadcast_config_change ──► window B, window C
//! ```

mod traits;
mod local;

pub use traits::{HostBroadcast, NoBroadcast};
pub use local::{LocalBroadcastHub, LocalBroadcast};
