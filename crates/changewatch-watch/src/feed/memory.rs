//! In-process change feed, used by tests and local runs.

use super::{ChangeFeed, SubscribeOptions, Subscription};
use crate::{reshape, FeedError};
use async_trait::async_trait;
use changewatch_types::Document;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

type Notification = Result<Document, FeedError>;

/// Feed fed through a [`MemoryFeedHandle`].
///
/// Notifications are pushed in the raw, nested shape a real feed emits and
/// reshaped on delivery. Only one subscription can be opened.
pub struct MemoryChangeFeed {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
    opened_with: watch::Sender<Option<SubscribeOptions>>,
    closed: Arc<AtomicBool>,
    subscribe_error: Option<String>,
}

/// Producer side of a [`MemoryChangeFeed`].
pub struct MemoryFeedHandle {
    sender: Option<mpsc::UnboundedSender<Notification>>,
    opened_with: watch::Receiver<Option<SubscribeOptions>>,
    closed: Arc<AtomicBool>,
}

impl MemoryChangeFeed {
    pub fn new() -> (Self, MemoryFeedHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = watch::channel(None);
        let closed = Arc::new(AtomicBool::new(false));

        let feed = Self {
            receiver: Mutex::new(Some(receiver)),
            opened_with: opened_tx,
            closed: Arc::clone(&closed),
            subscribe_error: None,
        };
        let handle = MemoryFeedHandle {
            sender: Some(sender),
            opened_with: opened_rx,
            closed,
        };
        (feed, handle)
    }

    /// A feed whose subscribe call always fails.
    pub fn unavailable(reason: impl Into<String>) -> (Self, MemoryFeedHandle) {
        let (mut feed, handle) = Self::new();
        feed.subscribe_error = Some(reason.into());
        (feed, handle)
    }
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn subscribe(&self, options: SubscribeOptions) -> Result<Box<dyn Subscription>, FeedError> {
        self.opened_with.send_replace(Some(options));

        if let Some(reason) = &self.subscribe_error {
            return Err(FeedError::Unavailable(reason.clone()));
        }

        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(FeedError::AlreadySubscribed)?;

        Ok(Box::new(MemorySubscription {
            receiver,
            closed: Arc::clone(&self.closed),
        }))
    }
}

impl MemoryFeedHandle {
    /// Queue a raw notification. Returns `false` once the feed has ended.
    pub fn push(&self, raw: Document) -> bool {
        self.send(Ok(raw))
    }

    /// Queue a stream failure.
    pub fn push_error(&self, error: FeedError) -> bool {
        self.send(Err(error))
    }

    /// End the feed after the queued notifications.
    pub fn finish(&mut self) {
        self.sender = None;
    }

    /// Options of the last subscribe attempt.
    pub fn opened_with(&self) -> Option<SubscribeOptions> {
        self.opened_with.borrow().clone()
    }

    /// Whether the subscription has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn send(&self, notification: Notification) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(notification).is_ok())
    }
}

struct MemorySubscription {
    receiver: mpsc::UnboundedReceiver<Notification>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_change(&mut self) -> Result<Option<Document>, FeedError> {
        match self.receiver.recv().await {
            Some(Ok(raw)) => Ok(Some(reshape::apply(&raw))),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    async fn close(self: Box<Self>) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changewatch_types::{doc, Namespace, Timestamp};

    fn options() -> SubscribeOptions {
        SubscribeOptions::new(Namespace::new("shop", "orders"))
    }

    #[tokio::test]
    async fn test_delivers_reshaped_notifications_in_order() {
        let (feed, mut handle) = MemoryChangeFeed::new();
        for n in 1..=3 {
            assert!(handle.push(doc! {
                "_id": { "_data": format!("T{n}") },
                "operationType": "insert",
                "clusterTime": Timestamp { time: 10, increment: n },
                "ns": { "db": "shop", "coll": "orders" },
                "documentKey": { "_id": n },
            }));
        }
        handle.finish();

        let mut subscription = feed.subscribe(options()).await.unwrap();
        for n in 1..=3 {
            let shaped = subscription.next_change().await.unwrap().unwrap();
            assert_eq!(shaped.get_document("_id").unwrap(), &doc! { "_data": format!("T{n}") });
            assert_eq!(shaped.get_str("database").unwrap(), "shop");
        }
        assert!(subscription.next_change().await.unwrap().is_none());

        assert!(!handle.is_closed());
        subscription.close().await;
        assert!(handle.is_closed());
        assert!(!handle.push(doc! {}));
    }

    #[tokio::test]
    async fn test_single_subscription() {
        let (feed, _handle) = MemoryChangeFeed::new();
        assert!(feed.subscribe(options()).await.is_ok());
        assert!(matches!(
            feed.subscribe(options()).await,
            Err(FeedError::AlreadySubscribed)
        ));
    }

    #[tokio::test]
    async fn test_unavailable_records_attempt() {
        let (feed, handle) = MemoryChangeFeed::unavailable("no replica set");
        let err = feed.subscribe(options()).await.err().unwrap();

        assert!(matches!(err, FeedError::Unavailable(reason) if reason == "no replica set"));
        assert_eq!(handle.opened_with(), Some(options()));
    }

    #[tokio::test]
    async fn test_stream_error_passes_through() {
        let (feed, handle) = MemoryChangeFeed::new();
        handle.push_error(FeedError::Unavailable("connection reset".into()));

        let mut subscription = feed.subscribe(options()).await.unwrap();
        assert!(matches!(
            subscription.next_change().await,
            Err(FeedError::Unavailable(_))
        ));
    }
}
