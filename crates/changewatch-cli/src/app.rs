//! Startup wiring: connect, find the resume position, watch.

use std::sync::Arc;

use changewatch_config::WatchConfig;
use changewatch_store::{AuditDispatcher, AuditStore, ResumeTokenTracker};
use changewatch_types::SharedHandler;
use changewatch_watch::{ChangeFeed, ChangeStreamWatcher, MongoChangeFeed};
use tracing::info;

use crate::AppError;

/// Connect both stores and run the pipeline until the feed fails or ends.
pub async fn run(config: &WatchConfig) -> Result<(), AppError> {
    let store = changewatch_store::connect(&config.audit_db_url, &config.audit_namespace())
        .await
        .map_err(AppError::AuditConnection)?;
    info!(backend = store.backend(), ns = %config.audit_namespace(), "connected to audit store");

    let feed = MongoChangeFeed::connect(&config.app_db_url)
        .await
        .map_err(AppError::SourceConnection)?;

    run_pipeline(config, store, feed).await
}

/// Resume-token lookup, then watch with the audit dispatcher as the only
/// handler. A failed lookup never falls back to watching from now.
pub async fn run_pipeline<F: ChangeFeed>(
    config: &WatchConfig,
    store: Arc<dyn AuditStore>,
    feed: F,
) -> Result<(), AppError> {
    let token = ResumeTokenTracker::new(Arc::clone(&store))
        .resume_token()
        .await
        .map_err(AppError::ResumeToken)?;

    let dispatcher: SharedHandler = Arc::new(AuditDispatcher::new(store));
    let watcher = ChangeStreamWatcher::from_config(feed, config);
    watcher.watch(token, &[dispatcher]).await?;

    Ok(())
}
