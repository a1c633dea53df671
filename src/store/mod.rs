/*!
 * Correlation store: shared key/value cache plus pub/sub channels.
 *
 * The same store backs two concerns:
 * - the translation cache (`get` / `set` / `delete_all`)
 * - the rendezvous between an asynchronous backend submission and the webhook
 *   callback that later delivers its result (`subscribe` / `publish`)
 *
 * Implementations:
 * - `memory`: in-process store, used by tests and single-instance setups
 * - `redis_store`: Redis-backed store shared by several gateway instances
 */

use async_trait::async_trait;
use std::fmt::{self, Debug};
use tokio::sync::mpsc;

use crate::errors::StoreError;

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryStore;
pub use redis_store::RedisStore;

/// Key/value store with pub/sub delivery
///
/// Implementations must support many concurrent subscriptions and deliver a
/// published message only to subscribers of the exact channel.
#[async_trait]
pub trait CorrelationStore: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value without expiry
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove every stored value
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Subscribe to a channel. The subscription is active once this returns.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;

    /// Publish a message, returning the number of subscribers reached
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Active subscription to one channel
///
/// Releasing the subscription unsubscribes from the channel. Release happens
/// on `unsubscribe()` or, at the latest, when the value is dropped, so every
/// exit path of the owner (including a cancelled future) cleans up.
pub struct Subscription {
    channel: String,
    receiver: mpsc::UnboundedReceiver<String>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Create a subscription from a message receiver and its release hook
    pub fn new(
        channel: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<String>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            channel: channel.into(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message. `None` means the channel was closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Take a message that is already buffered, without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Whether the subscription is still registered with the store
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Unsubscribe now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            self.receiver.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}
