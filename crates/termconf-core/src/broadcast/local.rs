//! In-process broadcast between windows sharing one process

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use super::traits::HostBroadcast;

#[derive(Debug, Clone)]
struct Envelope {
    from: u64,
    resolved: Arc<Value>,
}

/// Fan-out hub; hand one endpoint to each window
///
/// # Example
///
/// ```
/// use termconf_core::broadcast::LocalBroadcastHub;
///
/// let hub = LocalBroadcastHub::new(16);
/// let first_window = hub.endpoint();
/// let second_window = hub.endpoint();
/// assert_ne!(first_window.id(), second_window.id());
/// ```
#[derive(Debug)]
pub struct LocalBroadcastHub {
    sender: broadcast::Sender<Envelope>,
    next_id: AtomicU64,
}

impl LocalBroadcastHub {
    /// Create a hub buffering up to `capacity` undelivered notifications
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            sender,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create an endpoint for a new window
    pub fn endpoint(&self) -> LocalBroadcast {
        LocalBroadcast {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            sender: self.sender.clone(),
        }
    }
}

/// One window's view of a [`LocalBroadcastHub`]
#[derive(Debug, Clone)]
pub struct LocalBroadcast {
    id: u64,
    sender: broadcast::Sender<Envelope>,
}

impl LocalBroadcast {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl HostBroadcast for LocalBroadcast {
    async fn broadcast_config_change(&self, resolved: Value) {
        // No subscribers is not an error for fire-and-forget
        let _ = self.sender.send(Envelope {
            from: self.id,
            resolved: Arc::new(resolved),
        });
    }

    fn subscribe(&self) -> BoxStream<'static, Value> {
        let own_id = self.id;
        let receiver = self.sender.subscribe();

        futures::stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) if envelope.from == own_id => continue,
                    Ok(envelope) => return Some(((*envelope.resolved).clone(), receiver)),
                    Err(RecvError::Lagged(_)) => return Some((Value::Null, receiver)),
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
