//! Change feed sources.
//!
//! A [`ChangeFeed`] opens resumable, ordered subscriptions over a
//! namespace. Notifications come back already reshaped into the
//! [`ChangeEvent`](changewatch_types::ChangeEvent) wire shape.

mod memory;
mod mongo;

pub use memory::{MemoryChangeFeed, MemoryFeedHandle};
pub use mongo::MongoChangeFeed;

use crate::FeedError;
use async_trait::async_trait;
use changewatch_types::{Document, Namespace, ResumeToken};

/// What a notification carries as `fullDocument`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FullDocument {
    /// Whatever the feed sends by default (nothing for updates).
    #[default]
    Default,
    /// Look up the current document for updates as well.
    UpdateLookup,
}

/// Parameters of one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeOptions {
    pub namespace: Namespace,
    /// Aggregation stages applied to every notification.
    pub pipeline: Vec<Document>,
    /// Start strictly after this token. `None` means "from now".
    pub resume_after: Option<ResumeToken>,
    pub full_document: FullDocument,
}

impl SubscribeOptions {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            pipeline: Vec::new(),
            resume_after: None,
            full_document: FullDocument::Default,
        }
    }
}

/// Source of change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, options: SubscribeOptions) -> Result<Box<dyn Subscription>, FeedError>;
}

/// An open, ordered subscription.
#[async_trait]
pub trait Subscription: Send {
    /// Next notification, or `None` once the feed has ended.
    async fn next_change(&mut self) -> Result<Option<Document>, FeedError>;

    /// Release the subscription's server-side resources.
    async fn close(self: Box<Self>);
}
