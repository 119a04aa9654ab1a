//! In-process audit store.

use crate::{AuditStore, StoreError};
use async_trait::async_trait;
use changewatch_types::{ChangeEvent, ResumeToken};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Audit store kept in memory, keyed by resume token.
///
/// Used by tests and by `memory:` URLs for dry runs. Reads and writes can be
/// made to fail on demand.
#[derive(Default)]
pub struct MemoryAuditStore {
    records: RwLock<HashMap<String, ChangeEvent>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryAuditStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `find_most_recent` calls fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `upsert` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Record stored under `token`.
    pub async fn get(&self, token: &ResumeToken) -> Option<ChangeEvent> {
        self.records.read().await.get(&token.key()).cloned()
    }

    /// All records, oldest first.
    pub async fn records(&self) -> Vec<ChangeEvent> {
        let mut records: Vec<ChangeEvent> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(ChangeEvent::ordering_key);
        records
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn find_most_recent(&self) -> Result<Option<ResumeToken>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }

        let records = self.records.read().await;
        Ok(records
            .values()
            .max_by_key(|event| event.ordering_key())
            .map(|event| event.id.clone()))
    }

    async fn upsert(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        self.records.write().await.insert(event.id.key(), event.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changewatch_types::Timestamp;

    fn event(token: &str, time: u32, increment: u32) -> ChangeEvent {
        ChangeEvent {
            id: ResumeToken::new(token),
            user: String::new(),
            timestamp: Timestamp { time, increment },
            operation_type: "update".to_string(),
            database: "shop".to_string(),
            collection: "orders".to_string(),
            document_key: None,
            full_document: None,
            update_description: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store_has_no_recent_record() {
        let store = MemoryAuditStore::new();
        assert!(store.find_most_recent().await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_most_recent_orders_by_timestamp_not_insertion() {
        let store = MemoryAuditStore::new();
        store.upsert(&event("T3", 30, 1)).await.unwrap();
        store.upsert(&event("T1", 10, 1)).await.unwrap();
        store.upsert(&event("T2", 30, 0)).await.unwrap();

        assert_eq!(store.find_most_recent().await.unwrap(), Some(ResumeToken::new("T3")));
        let order: Vec<String> = store.records().await.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(order, vec!["T1", "T2", "T3"]);
    }

    #[tokio::test]
    async fn test_upsert_same_id_keeps_one_record() {
        let store = MemoryAuditStore::new();
        let mut first = event("T1", 10, 1);
        first.user = "alice".to_string();
        let mut second = first.clone();
        second.user = "bob".to_string();

        store.upsert(&first).await.unwrap();
        store.upsert(&second).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&ResumeToken::new("T1")).await.unwrap().user, "bob");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryAuditStore::new();
        store.set_fail_reads(true);
        store.set_fail_writes(true);

        assert!(matches!(store.find_most_recent().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.upsert(&event("T1", 1, 1)).await, Err(StoreError::Unavailable(_))));

        store.set_fail_writes(false);
        store.upsert(&event("T1", 1, 1)).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
