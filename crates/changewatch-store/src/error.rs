//! Audit store errors.

use crate::pool::PoolError;
use thiserror::Error;

/// Errors raised by audit store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported audit store url scheme: {scheme}")]
    UnsupportedUrl { scheme: String },

    #[error("invalid audit table name: {0}")]
    InvalidTable(String),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to encode change event: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode audit record: {0}")]
    Decode(String),

    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}
