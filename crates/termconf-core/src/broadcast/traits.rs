//! Host broadcast channel abstraction

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// Channel between sibling windows of one application instance
///
/// Implementations:
/// - `NoBroadcast`: Single-window hosts
/// - `LocalBroadcastHub` endpoints: Windows living in one process
/// - Host adapters: IPC to other processes
#[async_trait]
pub trait HostBroadcast: Send + Sync {
    /// Tell every sibling (but not the sender) that configuration changed
    ///
    /// Fire-and-forget: delivery failures are the channel's business.
    async fn broadcast_config_change(&self, resolved: Value);

    /// Notifications published by siblings
    ///
    /// Delivery is at-least-once. A channel that lost messages yields
    /// `Value::Null` so the subscriber still reloads.
    fn subscribe(&self) -> BoxStream<'static, Value>;
}

/// A channel with no siblings
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBroadcast;

#[async_trait]
impl HostBroadcast for NoBroadcast {
    async fn broadcast_config_change(&self, _resolved: Value) {}

    fn subscribe(&self) -> BoxStream<'static, Value> {
        Box::pin(futures::stream::empty())
    }
}
