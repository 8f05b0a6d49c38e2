// Message content cache boundary.

use async_trait::async_trait;
use dashmap::DashMap;

/// Lookup of previously persisted message content by message id.
///
/// The storage engine behind this lives outside the core; the reporting
/// instance is assumed to hold the content it reports, so a miss on another
/// instance is an expected, non-fatal outcome.
#[async_trait]
pub trait MessageCache: Send + Sync {
    async fn get_by_message_id(&self, message_id: &str) -> Option<Vec<u8>>;
}

/// In-process cache used by tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryMessageCache {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, message_id: impl Into<String>, content: Vec<u8>) {
        self.entries.insert(message_id.into(), content);
    }
}

#[async_trait]
impl MessageCache for InMemoryMessageCache {
    async fn get_by_message_id(&self, message_id: &str) -> Option<Vec<u8>> {
        self.entries.get(message_id).map(|entry| entry.clone())
    }
}
