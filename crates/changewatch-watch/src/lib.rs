//! Resumable change stream watching for changewatch.
//!
//! A [`ChangeStreamWatcher`] opens one subscription on a [`ChangeFeed`],
//! pulls raw notifications strictly in order, normalizes each into a
//! [`ChangeEvent`](changewatch_types::ChangeEvent) with an
//! [`EventExtractor`], and fans it out to every registered handler as
//! independent tasks.

mod dispatch;
mod error;
mod extract;
pub mod feed;
pub mod reshape;
mod watcher;

pub use dispatch::dispatch;
pub use error::{FeedError, WatchError};
pub use extract::{CapturePolicy, EventExtractor};
pub use feed::{ChangeFeed, FullDocument, MemoryChangeFeed, MemoryFeedHandle, MongoChangeFeed, SubscribeOptions, Subscription};
pub use watcher::{ChangeStreamWatcher, WatchState};
