//! Backend selection by URL scheme.

use crate::{AuditStore, MemoryAuditStore, MongoAuditStore, SqliteAuditStore, StoreError};
use changewatch_types::Namespace;
use std::sync::Arc;

/// Supported audit store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `mongodb://` and `mongodb+srv://`.
    Mongo,
    /// `sqlite:<path>` and `sqlite::memory:`.
    Sqlite,
    /// `memory:`, nothing survives a restart.
    Memory,
}

impl StoreBackend {
    /// Pick a backend from the URL scheme.
    pub fn from_url(url: &str) -> Result<Self, StoreError> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "mongodb" | "mongodb+srv" => Ok(Self::Mongo),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            _ => Err(StoreError::UnsupportedUrl {
                scheme: scheme.to_string(),
            }),
        }
    }
}

/// Connect to the audit store at `url`, bound to `namespace`.
pub async fn connect(url: &str, namespace: &Namespace) -> Result<Arc<dyn AuditStore>, StoreError> {
    let store: Arc<dyn AuditStore> = match StoreBackend::from_url(url)? {
        StoreBackend::Mongo => Arc::new(MongoAuditStore::connect(url, namespace).await?),
        StoreBackend::Sqlite => Arc::new(SqliteAuditStore::connect(url, namespace).await?),
        StoreBackend::Memory => Arc::new(MemoryAuditStore::new()),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(StoreBackend::from_url("mongodb://localhost:27017").unwrap(), StoreBackend::Mongo);
        assert_eq!(StoreBackend::from_url("mongodb+srv://cluster0.example.net").unwrap(), StoreBackend::Mongo);
        assert_eq!(StoreBackend::from_url("sqlite:/var/lib/audit.db").unwrap(), StoreBackend::Sqlite);
        assert_eq!(StoreBackend::from_url("sqlite::memory:").unwrap(), StoreBackend::Sqlite);
        assert_eq!(StoreBackend::from_url("memory:").unwrap(), StoreBackend::Memory);
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        match StoreBackend::from_url("postgres://user:secret@db/audit").unwrap_err() {
            StoreError::UnsupportedUrl { scheme } => assert_eq!(scheme, "postgres"),
            other => panic!("Expected UnsupportedUrl, got {other:?}"),
        }
        assert!(StoreBackend::from_url("no-scheme").is_err());
    }

    #[tokio::test]
    async fn test_connect_memory_and_sqlite() {
        let ns = Namespace::new("audit", "changes");
        assert_eq!(connect("memory:", &ns).await.unwrap().backend(), "memory");
        assert_eq!(connect("sqlite::memory:", &ns).await.unwrap().backend(), "sqlite");
    }
}
