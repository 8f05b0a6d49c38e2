// Transport-to-module-queue bridge.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use super::{broadcast_channel, instance_channel, Transport};
use crate::module::ModuleRegistry;
use crate::supervisor::spawn_supervised;
use crate::Result;

/// Bridges the external transport onto per-module local queues.
///
/// For every RPC operation a module declares, the dispatcher subscribes the
/// broadcast channel and this instance's directed channel, then pumps
/// arriving payloads into the module's bounded queue. A full queue blocks
/// the pump for that channel only; unrelated channels keep flowing.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    instance: u64,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, instance: u64) -> Self {
        Self { transport, instance }
    }

    /// Subscribes every currently-enabled module's declared operations and
    /// starts one pump task per subscription.
    pub async fn start(&self, registry: &ModuleRegistry) -> Result<()> {
        for module in registry.modules() {
            for (operation, queue) in module.rpc_queues() {
                self.bind(&operation, queue).await?;
                info!("Subscribed operation {} for module {}", operation, module.name());
            }
        }
        Ok(())
    }

    async fn bind(&self, operation: &str, queue: mpsc::Sender<Vec<u8>>) -> Result<()> {
        let channels = [
            broadcast_channel(operation),
            instance_channel(self.instance, operation),
        ];
        for channel in channels {
            let mut deliveries = self.transport.subscribe(&channel).await?;
            let queue = queue.clone();
            spawn_supervised(format!("dispatch.{channel}"), async move {
                while let Some(delivery) = deliveries.recv().await {
                    // Blocks when the module queue is full: backpressure,
                    // never a drop. A closed queue ends the pump.
                    if queue.send(delivery.payload).await.is_err() {
                        break;
                    }
                }
                Ok(())
            });
        }
        Ok(())
    }
}
