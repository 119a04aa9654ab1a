//! The audit store capability.

use crate::StoreError;
use async_trait::async_trait;
use changewatch_types::{ChangeEvent, ResumeToken};

/// Read and write access to the audit collection.
///
/// Implementations are bound to one namespace at construction time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Identity of the record with the greatest `timestamp`, or `None` when
    /// the store is empty.
    async fn find_most_recent(&self) -> Result<Option<ResumeToken>, StoreError>;

    /// Insert `event`, or replace the record sharing its `_id`.
    async fn upsert(&self, event: &ChangeEvent) -> Result<(), StoreError>;

    /// Backend name for log lines.
    fn backend(&self) -> &'static str;
}
