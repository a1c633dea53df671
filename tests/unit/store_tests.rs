/*!
 * Tests for the in-memory correlation store
 */

use std::sync::Arc;
use std::time::Duration;

use babelgate::store::{CorrelationStore, InMemoryStore};

#[tokio::test]
async fn test_subscribe_withTwoChannels_shouldDeliverOnlyToExactChannel() {
    let store = InMemoryStore::new();
    let mut dog = store.subscribe("et:deenAAAAYQ").await.unwrap();
    let mut tree = store.subscribe("et:deenBekY0g").await.unwrap();

    assert_eq!(store.publish("et:deenAAAAYQ", "dog").await.unwrap(), 1);

    assert_eq!(dog.recv().await.as_deref(), Some("dog"));
    assert_eq!(tree.try_recv(), None);
}

#[tokio::test]
async fn test_subscribe_withManySubscribers_shouldDeliverToAll() {
    let store = InMemoryStore::new();
    let mut first = store.subscribe("channel").await.unwrap();
    let mut second = store.subscribe("channel").await.unwrap();

    assert_eq!(store.publish("channel", "payload").await.unwrap(), 2);
    assert_eq!(first.recv().await.as_deref(), Some("payload"));
    assert_eq!(second.recv().await.as_deref(), Some("payload"));
}

#[tokio::test]
async fn test_unsubscribe_shouldReleaseChannel() {
    let store = InMemoryStore::new();
    let subscription = store.subscribe("channel").await.unwrap();
    assert_eq!(store.subscriber_count("channel"), 1);

    subscription.unsubscribe();
    assert_eq!(store.subscriber_count("channel"), 0);
    assert_eq!(store.publish("channel", "late").await.unwrap(), 0);
}

#[tokio::test]
async fn test_drop_shouldReleaseChannel() {
    let store = InMemoryStore::new();
    {
        let _subscription = store.subscribe("channel").await.unwrap();
        assert_eq!(store.subscriber_count("channel"), 1);
    }
    assert_eq!(store.subscriber_count("channel"), 0);
}

#[tokio::test]
async fn test_cancelledWait_shouldReleaseChannel() {
    let store = Arc::new(InMemoryStore::new());
    let waiting_store = Arc::clone(&store);

    let waiter = tokio::spawn(async move {
        let mut subscription = waiting_store.subscribe("channel").await.unwrap();
        subscription.recv().await
    });
    while store.subscriber_count("channel") == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    waiter.abort();
    let _ = waiter.await;
    assert_eq!(store.subscriber_count("channel"), 0);
}

#[tokio::test]
async fn test_values_shouldBeIndependentFromChannels() {
    let store = InMemoryStore::new();
    store.set("channel", "value").await.unwrap();

    assert_eq!(store.publish("channel", "message").await.unwrap(), 0);
    assert_eq!(store.get("channel").await.unwrap().as_deref(), Some("value"));
}
