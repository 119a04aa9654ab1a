//! Tracing spans for the watch pipeline.

use tracing::{info_span, Span};

/// Span covering one watch session on a namespace.
pub fn watch_span(namespace: &str) -> Span {
    info_span!("watch", ns = %namespace, error = tracing::field::Empty)
}

/// Span covering the handling of a single change event.
pub fn event_span(operation_type: &str, event_id: &str) -> Span {
    info_span!("event", op = %operation_type, id = %event_id)
}

/// Span covering one handler invocation.
pub fn handler_span(handler: &str) -> Span {
    info_span!("handler", name = %handler, error = tracing::field::Empty)
}

/// Record an error on the current span. Only spans declaring an `error`
/// field keep it.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}
