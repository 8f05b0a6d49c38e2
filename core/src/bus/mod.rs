// Distributed event/RPC bus abstraction.
//
// Instances notify one another over an external publish/subscribe
// transport; the dispatcher bridges transport subscriptions onto the
// bounded local queues each module declares. Delivery is best-effort and
// at-most-once; nothing at this layer retries or reorders.

mod dispatcher;
mod local;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

pub use dispatcher::Dispatcher;
pub use local::{ChannelStats, LocalTransport};

/// Channel namespace shared by all cooperating instances.
pub const NAMESPACE: &str = "cluegetter";

/// One message received from the transport.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// External publish/subscribe transport.
///
/// `publish` must be safe for concurrent use by many workers. Subscribe
/// yields a stream of deliveries for one channel pattern; ordering holds
/// within a subscription only, and nothing is guaranteed across reconnects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()>;
    async fn subscribe(&self, pattern: &str) -> Result<mpsc::Receiver<Delivery>>;
}

/// Channel name broadcast to all instances: `cluegetter!!module!operation`.
pub fn broadcast_channel(operation: &str) -> String {
    format!("{NAMESPACE}!!{operation}")
}

/// Channel name directed at one instance: `cluegetter!N!module!operation`.
pub fn instance_channel(instance: u64, operation: &str) -> String {
    format!("{NAMESPACE}!{instance}!{operation}")
}
