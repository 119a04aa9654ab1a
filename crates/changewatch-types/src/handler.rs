//! Dispatch targets for normalized change events.

use crate::ChangeEvent;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Something that consumes change events, e.g. an audit writer.
///
/// Each invocation gets its own copy of the event and runs as an independent
/// task; implementations must not assume ordering relative to other events.
#[async_trait]
pub trait ChangeEventHandler: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Handle one event. Errors are logged by the dispatcher and not retried.
    async fn handle(&self, event: ChangeEvent) -> anyhow::Result<()>;
}

/// Handler shared across dispatch tasks.
pub type SharedHandler = Arc<dyn ChangeEventHandler>;

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap an async closure as a [`ChangeEventHandler`].
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> ChangeEventHandler for FnHandler<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: ChangeEvent) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}
