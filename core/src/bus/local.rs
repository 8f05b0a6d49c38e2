// In-process transport implementation.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use async_trait::async_trait;

use super::{Delivery, Transport};
use crate::Result;

/// Per-channel delivery counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    pub published: u64,
    pub delivered: u64,
    pub no_subscriber: u64,
}

/// Loopback transport for single-instance deployments and tests.
///
/// Patterns are matched as exact channel names. Each subscription gets its
/// own bounded queue; a publish awaits room in every subscriber's queue, so
/// a slow consumer exerts backpressure on that channel without dropping.
pub struct LocalTransport {
    subscriptions: DashMap<String, Vec<mpsc::Sender<Delivery>>>,
    stats: DashMap<String, ChannelStats>,
    capacity: usize,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscriptions: DashMap::new(),
            stats: DashMap::new(),
            capacity,
        }
    }

    pub fn stats(&self, channel: &str) -> Option<ChannelStats> {
        self.stats.get(channel).map(|s| s.clone())
    }

    fn update_stats<F>(&self, channel: &str, f: F)
    where
        F: FnOnce(&mut ChannelStats),
    {
        f(self.stats.entry(channel.to_string()).or_default().value_mut());
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()> {
        self.update_stats(channel, |stats| stats.published += 1);

        // Snapshot the sender list so no map shard stays locked across await.
        let senders = match self.subscriptions.get(channel) {
            Some(subs) => subs.clone(),
            None => {
                debug!("No subscriptions for channel: {}", channel);
                self.update_stats(channel, |stats| stats.no_subscriber += 1);
                return Ok(());
            }
        };

        let mut delivered = 0;
        for sender in senders {
            let delivery = Delivery {
                channel: channel.to_string(),
                payload: payload.clone(),
            };
            if sender.send(delivery).await.is_ok() {
                delivered += 1;
            }
        }
        self.update_stats(channel, |stats| stats.delivered += delivered);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<mpsc::Receiver<Delivery>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscriptions
            .entry(pattern.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
