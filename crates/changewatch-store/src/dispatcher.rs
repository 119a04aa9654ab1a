//! Audit writer dispatch target.

use crate::{AuditStore, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use changewatch_types::{ChangeEvent, ChangeEventHandler};
use std::sync::Arc;
use tracing::debug;

/// Writes change events to the audit store.
///
/// Writes are upserts keyed by the event's resume token, so a notification
/// redelivered after a restart replaces its earlier record instead of
/// duplicating it.
pub struct AuditDispatcher<S: ?Sized> {
    store: Arc<S>,
}

impl<S: AuditStore + ?Sized> AuditDispatcher<S> {
    /// Create a dispatcher bound to `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist one event. Errors are returned, never retried.
    pub async fn save_change_event(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        debug!(
            op = %event.operation_type,
            database = %event.database,
            collection = %event.collection,
            document_key = ?event.document_key,
            "saving change event"
        );
        self.store.upsert(event).await
    }
}

#[async_trait]
impl<S: AuditStore + ?Sized + 'static> ChangeEventHandler for AuditDispatcher<S> {
    fn name(&self) -> &str {
        "audit"
    }

    async fn handle(&self, event: ChangeEvent) -> anyhow::Result<()> {
        self.save_change_event(&event).await.with_context(|| {
            format!(
                "failed to save change event {} to {} audit store",
                event.id,
                self.store.backend()
            )
        })
    }
}
