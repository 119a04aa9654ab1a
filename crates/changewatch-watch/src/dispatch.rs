//! Fire-and-forget fan-out of change events.

use changewatch_log::spans::{handler_span, record_error};
use changewatch_types::{ChangeEvent, SharedHandler};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

/// Spawn one task per handler, each with its own copy of `event`.
///
/// Must be called from within a tokio runtime. Failures are logged in the
/// task and never reach the caller. The handles are returned for callers
/// that want to wait; the watcher drops them.
pub fn dispatch(event: &ChangeEvent, handlers: &[SharedHandler]) -> Vec<JoinHandle<()>> {
    handlers
        .iter()
        .map(|handler| {
            let handler = Arc::clone(handler);
            let event = event.clone();
            let span = handler_span(handler.name());

            tokio::spawn(
                async move {
                    debug!(id = %event.id, "handling change event");
                    if let Err(err) = handler.handle(event).await {
                        record_error(err.as_ref());
                        warn!(error = %format!("{err:#}"), "change event handler failed");
                    }
                }
                .instrument(span),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use changewatch_types::{handler_fn, ResumeToken, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(token: &str) -> ChangeEvent {
        ChangeEvent {
            id: ResumeToken::new(token),
            user: "alice".to_string(),
            timestamp: Timestamp { time: 1, increment: 1 },
            operation_type: "insert".to_string(),
            database: "shop".to_string(),
            collection: "orders".to_string(),
            document_key: None,
            full_document: None,
            update_description: None,
        }
    }

    #[tokio::test]
    async fn test_every_handler_gets_the_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers: Vec<SharedHandler> = (0..3)
            .map(|n| {
                let calls = Arc::clone(&calls);
                Arc::new(handler_fn(format!("h{n}"), move |ev: ChangeEvent| {
                    let calls = Arc::clone(&calls);
                    async move {
                        assert_eq!(ev.id, ResumeToken::new("T1"));
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })) as SharedHandler
            })
            .collect();

        for task in dispatch(&event("T1"), &handlers) {
            task.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failing_handler_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let handlers: Vec<SharedHandler> = vec![
            Arc::new(handler_fn("broken", |_ev: ChangeEvent| async {
                Err::<(), _>(anyhow::anyhow!("audit store unavailable"))
            })),
            Arc::new(handler_fn("counting", move |_ev: ChangeEvent| {
                let calls = Arc::clone(&counted);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })),
        ];

        for task in dispatch(&event("T1"), &handlers) {
            assert!(task.await.is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_handlers() {
        assert!(dispatch(&event("T1"), &[]).is_empty());
    }
}
