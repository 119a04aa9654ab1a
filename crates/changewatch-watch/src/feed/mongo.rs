//! MongoDB change streams.

use super::{ChangeFeed, FullDocument, SubscribeOptions, Subscription};
use crate::FeedError;
use async_trait::async_trait;
use changewatch_types::{doc, Document, ResumeToken};
use futures_util::StreamExt;
use mongodb::change_stream::{event::ResumeToken as DriverToken, ChangeStream};
use mongodb::options::{ChangeStreamOptions, FullDocumentType};
use mongodb::Client;
use serde::Deserialize;
use tracing::{debug, info};

/// Change feed backed by a MongoDB deployment. Requires a replica set or
/// sharded cluster.
#[derive(Clone)]
pub struct MongoChangeFeed {
    client: Client,
}

impl MongoChangeFeed {
    /// Connect and verify the deployment answers a ping.
    pub async fn connect(url: &str) -> Result<Self, FeedError> {
        let client = Client::with_uri_str(url).await?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        info!("connected to source database");
        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChangeFeed for MongoChangeFeed {
    async fn subscribe(&self, options: SubscribeOptions) -> Result<Box<dyn Subscription>, FeedError> {
        let collection = self
            .client
            .database(&options.namespace.database)
            .collection::<Document>(&options.namespace.collection);

        let mut stream_options = ChangeStreamOptions::default();
        if options.full_document == FullDocument::UpdateLookup {
            stream_options.full_document = Some(FullDocumentType::UpdateLookup);
        }
        if let Some(token) = &options.resume_after {
            stream_options.resume_after = Some(driver_token(token)?);
        }

        debug!(ns = %options.namespace, resuming = options.resume_after.is_some(), "opening change stream");
        let stream = collection
            .watch(options.pipeline, stream_options)
            .await?
            .with_type::<Document>();

        Ok(Box::new(MongoSubscription { stream }))
    }
}

/// The driver's token only deserializes from raw BSON, so go through bytes.
fn driver_token(token: &ResumeToken) -> Result<DriverToken, FeedError> {
    #[derive(Deserialize)]
    struct Wrapped {
        token: DriverToken,
    }

    let bytes = bson::to_vec(&doc! { "token": token.to_bson() })
        .map_err(|e| FeedError::InvalidResumeToken(e.to_string()))?;
    let wrapped: Wrapped =
        bson::from_slice(&bytes).map_err(|e| FeedError::InvalidResumeToken(e.to_string()))?;
    Ok(wrapped.token)
}

struct MongoSubscription {
    stream: ChangeStream<Document>,
}

#[async_trait]
impl Subscription for MongoSubscription {
    async fn next_change(&mut self) -> Result<Option<Document>, FeedError> {
        Ok(self.stream.next().await.transpose()?)
    }

    async fn close(self: Box<Self>) {
        // Dropping the stream kills the server cursor.
        drop(self.stream);
        debug!("change stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_token_from_resume_token() {
        assert!(driver_token(&ResumeToken::new("8264B7F0C2000000012B")).is_ok());
    }
}
