//! Resume position lookup.

use crate::{AuditStore, StoreError};
use changewatch_types::ResumeToken;
use std::sync::Arc;
use tracing::{info, instrument};

/// Derives the change feed resume position from the audit store.
pub struct ResumeTokenTracker<S: ?Sized> {
    store: Arc<S>,
}

impl<S: AuditStore + ?Sized> ResumeTokenTracker<S> {
    /// Create a tracker over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Token of the most recently recorded event.
    ///
    /// An empty store yields the empty token, meaning "start at the feed's
    /// current position". Lookup failures are returned unchanged; callers
    /// must not start watching without a known position.
    #[instrument(skip(self), fields(backend = self.store.backend()))]
    pub async fn resume_token(&self) -> Result<ResumeToken, StoreError> {
        match self.store.find_most_recent().await? {
            Some(token) if !token.is_empty() => {
                info!(token = %token, "resuming after last recorded change event");
                Ok(token)
            }
            _ => {
                info!("audit store has no change events, starting from the current feed position");
                Ok(ResumeToken::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAuditStore;

    fn mock() -> MockAuditStore {
        let mut store = MockAuditStore::new();
        store.expect_backend().return_const("mock");
        store
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_token() {
        let mut store = mock();
        store.expect_find_most_recent().times(1).returning(|| Ok(None));

        let tracker = ResumeTokenTracker::new(Arc::new(store));
        let token = tracker.resume_token().await.unwrap();
        assert!(token.is_empty());
    }

    #[tokio::test]
    async fn test_latest_record_token_is_returned() {
        let mut store = mock();
        store
            .expect_find_most_recent()
            .times(1)
            .returning(|| Ok(Some(ResumeToken::new("T1"))));

        let tracker = ResumeTokenTracker::new(Arc::new(store));
        assert_eq!(tracker.resume_token().await.unwrap(), ResumeToken::new("T1"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_propagated() {
        let mut store = mock();
        store
            .expect_find_most_recent()
            .times(1)
            .returning(|| Err(StoreError::Decode("truncated record".to_string())));

        let tracker = ResumeTokenTracker::new(Arc::new(store));
        let err = tracker.resume_token().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_tracker_never_writes() {
        let mut store = mock();
        store.expect_find_most_recent().returning(|| Ok(None));
        store.expect_upsert().never();

        let tracker = ResumeTokenTracker::new(Arc::new(store));
        tracker.resume_token().await.unwrap();
    }
}
