//! MongoDB audit store.

use crate::{AuditStore, StoreError};
use async_trait::async_trait;
use changewatch_types::{doc, ChangeEvent, Document, Namespace, ResumeToken};
use mongodb::options::{FindOneOptions, ReplaceOptions};
use mongodb::{Client, Collection};
use tracing::{debug, info};

/// Connect to a MongoDB deployment and verify it answers a `ping`.
///
/// The driver connects lazily, so without the ping an unreachable server
/// would only surface on the first query.
pub async fn connect_client(url: &str) -> Result<Client, StoreError> {
    let client = Client::with_uri_str(url).await?;
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await?;
    debug!("mongodb deployment reachable");
    Ok(client)
}

/// Audit store backed by a MongoDB collection.
pub struct MongoAuditStore {
    collection: Collection<Document>,
}

impl MongoAuditStore {
    /// Connect and bind to `namespace`.
    pub async fn connect(url: &str, namespace: &Namespace) -> Result<Self, StoreError> {
        let client = connect_client(url).await?;
        info!(ns = %namespace, "connected to mongodb audit store");
        Ok(Self::new(
            client
                .database(&namespace.database)
                .collection(&namespace.collection),
        ))
    }

    /// Wrap an existing collection handle.
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl AuditStore for MongoAuditStore {
    async fn find_most_recent(&self) -> Result<Option<ResumeToken>, StoreError> {
        let mut options = FindOneOptions::default();
        options.sort = Some(doc! { "timestamp": -1 });
        options.projection = Some(doc! { "_id": 1 });

        let Some(record) = self.collection.find_one(None, options).await? else {
            return Ok(None);
        };

        let id = record
            .get("_id")
            .cloned()
            .ok_or_else(|| StoreError::Decode("audit record has no _id".to_string()))?;
        let token: ResumeToken = bson::from_bson(id).map_err(StoreError::decode)?;
        Ok(Some(token))
    }

    async fn upsert(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        let record = event.to_document()?;
        let mut options = ReplaceOptions::default();
        options.upsert = Some(true);

        self.collection
            .replace_one(doc! { "_id": event.id.to_bson() }, record, options)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
