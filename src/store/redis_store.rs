/*!
 * Redis-backed correlation store.
 *
 * Values are plain strings without expiry; any eviction policy is left to the
 * Redis server configuration. Every subscription uses its own pub/sub
 * connection, forwarded into the subscription's channel by a background task.
 * Releasing the subscription aborts the task, which drops the connection and
 * with it the server-side subscription.
 */

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::fmt;
use tokio::sync::mpsc;

use super::{CorrelationStore, Subscription};
use crate::errors::StoreError;

/// Correlation store on a Redis server
pub struct RedisStore {
    client: redis::Client,
    connection: MultiplexedConnection,
    url: String,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (`redis://` or `rediss://`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis correlation store at {}", redacted(url));
        Ok(Self {
            client,
            connection,
            url: url.to_string(),
        })
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").field("url", &redacted(&self.url)).finish()
    }
}

#[async_trait]
impl CorrelationStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut connection).await?;
        info!("Redis correlation store flushed");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let channel_name = channel.to_string();
        let forwarder = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                match message.get_payload::<String>() {
                    Ok(payload) => {
                        if sender.send(payload).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping undecodable message on channel '{}': {}", channel_name, e),
                }
            }
        });
        debug!("Subscribed to Redis channel '{}'", channel);

        Ok(Subscription::new(channel, receiver, move || forwarder.abort()))
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError> {
        let mut connection = self.connection.clone();
        let receivers: i64 = connection.publish(channel, message).await?;
        Ok(usize::try_from(receivers).unwrap_or(0))
    }
}

/// Hide credentials embedded in a connection url
fn redacted(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
