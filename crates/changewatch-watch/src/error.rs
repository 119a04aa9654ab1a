//! Watcher errors.

use thiserror::Error;

/// Errors raised by a change feed backend.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("invalid resume token: {0}")]
    InvalidResumeToken(String),

    #[error("change feed unavailable: {0}")]
    Unavailable(String),

    #[error("change feed already has a subscriber")]
    AlreadySubscribed,
}

/// Errors that terminate a watch session. None of them are retried here.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to open change stream on {namespace}: {source}")]
    Subscribe {
        namespace: String,
        #[source]
        source: FeedError,
    },

    #[error("change stream failed: {0}")]
    Stream(#[source] FeedError),

    #[error("failed to decode change notification: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("watcher has already been started")]
    AlreadyStarted,
}
