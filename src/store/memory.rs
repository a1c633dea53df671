/*!
 * In-process correlation store.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::{CorrelationStore, Subscription};
use crate::errors::StoreError;

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<String>)>>;

/// Correlation store living in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
    channels: Arc<Mutex<Subscribers>>,
    next_subscriber_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check if the store holds no values
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Number of active subscribers on a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.lock().get(channel).map_or(0, Vec::len)
    }
}

#[async_trait]
impl CorrelationStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.values.write().clear();
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.channels
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push((id, sender));
        debug!("Subscribed to channel '{}' (subscriber {})", channel, id);

        let channels = Arc::clone(&self.channels);
        let channel_name = channel.to_string();
        Ok(Subscription::new(channel, receiver, move || {
            let mut channels = channels.lock();
            if let Some(subscribers) = channels.get_mut(&channel_name) {
                subscribers.retain(|(subscriber, _)| *subscriber != id);
                if subscribers.is_empty() {
                    channels.remove(&channel_name);
                }
            }
            debug!("Unsubscribed from channel '{}' (subscriber {})", channel_name, id);
        }))
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError> {
        let mut channels = self.channels.lock();
        let Some(subscribers) = channels.get_mut(channel) else {
            debug!("No subscriber on channel '{}', message dropped", channel);
            return Ok(0);
        };

        subscribers.retain(|(_, sender)| !sender.is_closed());
        let delivered = subscribers
            .iter()
            .filter(|(_, sender)| sender.send(message.to_string()).is_ok())
            .count();
        Ok(delivered)
    }
}
