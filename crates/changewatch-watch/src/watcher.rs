//! The change stream consumer loop.

use crate::dispatch::dispatch;
use crate::feed::{ChangeFeed, FullDocument, SubscribeOptions, Subscription};
use crate::{reshape, EventExtractor, WatchError};
use changewatch_config::WatchConfig;
use changewatch_log::spans::{event_span, record_error, watch_span};
use changewatch_types::{Namespace, ResumeToken, SharedHandler};
use tokio::sync::watch;
use tracing::{debug, error, info, Instrument};

/// Lifecycle of a watcher. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Subscribing,
    Streaming,
    /// The feed ended normally.
    Closed,
    Failed,
}

impl WatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WatchState::Closed | WatchState::Failed)
    }
}

/// Watches one namespace and fans each change out to a set of handlers.
///
/// A watcher runs at most once; a new session needs a new watcher.
pub struct ChangeStreamWatcher<F> {
    feed: F,
    namespace: Namespace,
    extractor: EventExtractor,
    state: watch::Sender<WatchState>,
}

impl<F: ChangeFeed> ChangeStreamWatcher<F> {
    pub fn new(feed: F, namespace: Namespace, extractor: EventExtractor) -> Self {
        let (state, _) = watch::channel(WatchState::Idle);
        Self {
            feed,
            namespace,
            extractor,
            state,
        }
    }

    pub fn from_config(feed: F, config: &WatchConfig) -> Self {
        Self::new(feed, config.app_namespace(), EventExtractor::from_config(config))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Receiver that observes state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Open the feed after `resume_token` (or from now when it is empty) and
    /// dispatch every notification until the feed ends or fails.
    ///
    /// Notifications are decoded strictly in feed order. Handlers run as
    /// detached tasks and may complete in any order. The first feed or
    /// decode error ends the session; the subscription is closed either way.
    pub async fn watch(
        &self,
        resume_token: ResumeToken,
        handlers: &[SharedHandler],
    ) -> Result<(), WatchError> {
        let started = self.state.send_if_modified(|state| {
            if *state == WatchState::Idle {
                *state = WatchState::Subscribing;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(WatchError::AlreadyStarted);
        }

        let span = watch_span(&self.namespace.to_string());
        let result = self.run(resume_token, handlers).instrument(span.clone()).await;

        match &result {
            Ok(processed) => {
                self.state.send_replace(WatchState::Closed);
                info!(parent: &span, processed, "change stream ended");
            }
            Err(err) => {
                self.state.send_replace(WatchState::Failed);
                let _entered = span.enter();
                record_error(err);
                error!(error = %err, "change stream watcher stopped");
            }
        }
        result.map(|_| ())
    }

    async fn run(&self, resume_token: ResumeToken, handlers: &[SharedHandler]) -> Result<u64, WatchError> {
        let resume_after = (!resume_token.is_empty()).then_some(resume_token);
        match &resume_after {
            Some(token) => info!(token = %token, "resuming change stream"),
            None => info!("no resume token, watching from now"),
        }

        let options = SubscribeOptions {
            namespace: self.namespace.clone(),
            pipeline: reshape::pipeline(),
            resume_after,
            full_document: FullDocument::UpdateLookup,
        };
        let mut subscription = self
            .feed
            .subscribe(options)
            .await
            .map_err(|source| WatchError::Subscribe {
                namespace: self.namespace.to_string(),
                source,
            })?;

        self.state.send_replace(WatchState::Streaming);
        info!(handlers = handlers.len(), "change stream watcher launched");

        let result = self.consume(subscription.as_mut(), handlers).await;
        subscription.close().await;
        result
    }

    async fn consume(
        &self,
        subscription: &mut dyn Subscription,
        handlers: &[SharedHandler],
    ) -> Result<u64, WatchError> {
        let mut processed = 0;
        while let Some(raw) = subscription.next_change().await.map_err(WatchError::Stream)? {
            let event = self.extractor.extract(raw)?;

            let span = event_span(&event.operation_type, &event.id.to_string());
            let _entered = span.enter();
            debug!(user = %event.user, "change event received");
            dispatch(&event, handlers);
            processed += 1;
        }
        Ok(processed)
    }
}
