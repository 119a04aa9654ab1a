//! SQLite audit store.

use crate::pool::{AuditPool, PoolConfig};
use crate::{AuditStore, StoreError};
use async_trait::async_trait;
use changewatch_types::{Bson, ChangeEvent, Namespace, ResumeToken};
use tracing::{debug, info};

/// Audit store backed by a SQLite table.
///
/// Each row keeps the resume token key, the cluster time split into its two
/// components for ordering, and the full record as canonical Extended JSON.
pub struct SqliteAuditStore {
    pool: AuditPool,
    table: String,
}

impl SqliteAuditStore {
    /// Open a `sqlite:` url (see [`PoolConfig::from_url`]) and make sure the
    /// audit table named after the namespace's collection exists.
    pub async fn connect(url: &str, namespace: &Namespace) -> Result<Self, StoreError> {
        let pool = AuditPool::open(PoolConfig::from_url(url)?).await?;
        Self::with_pool(pool, &namespace.collection).await
    }

    /// Use an existing pool.
    pub async fn with_pool(pool: AuditPool, table: &str) -> Result<Self, StoreError> {
        if !is_identifier(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.migrate().await?;
        info!(table = %store.table, "sqlite audit store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                id TEXT PRIMARY KEY NOT NULL,
                ts_time INTEGER NOT NULL,
                ts_increment INTEGER NOT NULL,
                operation_type TEXT NOT NULL,
                record TEXT NOT NULL
            )",
            t = self.table
        ))
        .execute(self.pool.sqlite())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_timestamp ON {t} (ts_time DESC, ts_increment DESC)",
            t = self.table
        ))
        .execute(self.pool.sqlite())
        .await?;

        Ok(())
    }

    /// Record stored under `token`.
    pub async fn find(&self, token: &ResumeToken) -> Result<Option<ChangeEvent>, StoreError> {
        let record: Option<String> =
            sqlx::query_scalar(&format!("SELECT record FROM {} WHERE id = ?1", self.table))
                .bind(token.key())
                .fetch_optional(self.pool.sqlite())
                .await?;

        record.map(|json| decode_record(&json)).transpose()
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(self.pool.sqlite())
            .await?;
        Ok(count)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn find_most_recent(&self) -> Result<Option<ResumeToken>, StoreError> {
        let key: Option<String> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} ORDER BY ts_time DESC, ts_increment DESC LIMIT 1",
            self.table
        ))
        .fetch_optional(self.pool.sqlite())
        .await?;

        key.map(|key| decode_key(&key)).transpose()
    }

    async fn upsert(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        let record = Bson::Document(event.to_document()?)
            .into_canonical_extjson()
            .to_string();

        sqlx::query(&format!(
            "INSERT INTO {} (id, ts_time, ts_increment, operation_type, record)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                ts_time = excluded.ts_time,
                ts_increment = excluded.ts_increment,
                operation_type = excluded.operation_type,
                record = excluded.record",
            self.table
        ))
        .bind(event.id.key())
        .bind(i64::from(event.timestamp.time))
        .bind(i64::from(event.timestamp.increment))
        .bind(event.operation_type.as_str())
        .bind(record)
        .execute(self.pool.sqlite())
        .await?;

        debug!(id = %event.id, "upserted audit row");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_extjson(json: &str) -> Result<Bson, StoreError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(StoreError::decode)?;
    Bson::try_from(value).map_err(StoreError::decode)
}

fn decode_key(key: &str) -> Result<ResumeToken, StoreError> {
    Ok(ResumeToken::new(parse_extjson(key)?))
}

fn decode_record(json: &str) -> Result<ChangeEvent, StoreError> {
    match parse_extjson(json)? {
        Bson::Document(document) => ChangeEvent::from_document(document).map_err(StoreError::decode),
        other => Err(StoreError::Decode(format!("expected a document, found {:?}", other.element_type()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changewatch_types::{doc, Timestamp, UpdateDescription};

    async fn store() -> SqliteAuditStore {
        SqliteAuditStore::connect("sqlite::memory:", &Namespace::new("audit", "changes"))
            .await
            .unwrap()
    }

    fn event(token: &str, time: u32, user: &str) -> ChangeEvent {
        ChangeEvent {
            id: ResumeToken::new(token),
            user: user.to_string(),
            timestamp: Timestamp { time, increment: 1 },
            operation_type: "update".to_string(),
            database: "shop".to_string(),
            collection: "orders".to_string(),
            document_key: Some(Bson::Int64(42)),
            full_document: None,
            update_description: Some(UpdateDescription {
                updated_fields: doc! { "status": "shipped" },
                removed_fields: vec!["draft".to_string()],
                truncated_arrays: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_empty_table_has_no_recent_record() {
        let store = store().await;
        assert!(store.find_most_recent().await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_round_trips_with_types() {
        let store = store().await;
        let original = event("T1", 10, "alice");
        store.upsert(&original).await.unwrap();

        let stored = store.find(&ResumeToken::new("T1")).await.unwrap().unwrap();
        assert_eq!(stored, original);
        assert_eq!(stored.document_key, Some(Bson::Int64(42)));
    }

    #[tokio::test]
    async fn test_most_recent_by_timestamp() {
        let store = store().await;
        store.upsert(&event("T2", 20, "bob")).await.unwrap();
        store.upsert(&event("T3", 30, "carol")).await.unwrap();
        store.upsert(&event("T1", 10, "alice")).await.unwrap();

        assert_eq!(store.find_most_recent().await.unwrap(), Some(ResumeToken::new("T3")));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = store().await;
        store.upsert(&event("T1", 10, "alice")).await.unwrap();
        store.upsert(&event("T1", 10, "mallory")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.find(&ResumeToken::new("T1")).await.unwrap().unwrap();
        assert_eq!(stored.user, "mallory");
    }

    #[tokio::test]
    async fn test_rejects_unsafe_table_name() {
        let result = SqliteAuditStore::connect("sqlite::memory:", &Namespace::new("audit", "changes; DROP")).await;
        assert!(matches!(result, Err(StoreError::InvalidTable(_))));
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("changes"));
        assert!(is_identifier("_audit_2024"));
        assert!(!is_identifier("2024_audit"));
        assert!(!is_identifier("audit-log"));
        assert!(!is_identifier(""));
    }
}
