//! Normalization of reshaped notifications into change events.

use crate::WatchError;
use changewatch_config::WatchConfig;
use changewatch_types::{ChangeEvent, Document, FieldPath};
use std::collections::HashMap;

/// Per-operation switch for keeping the full document in audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturePolicy {
    operations: HashMap<String, bool>,
}

impl CapturePolicy {
    pub fn new(operations: HashMap<String, bool>) -> Self {
        Self { operations }
    }

    /// Keep full documents for exactly these operation types.
    pub fn only<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(operations.into_iter().map(|op| (op.into(), true)).collect())
    }

    /// Operation types without an entry are not captured.
    pub fn captures(&self, operation_type: &str) -> bool {
        self.operations.get(operation_type).copied().unwrap_or(false)
    }
}

impl From<HashMap<String, bool>> for CapturePolicy {
    fn from(operations: HashMap<String, bool>) -> Self {
        Self::new(operations)
    }
}

/// Turns reshaped notifications into [`ChangeEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventExtractor {
    user_path: FieldPath,
    capture: CapturePolicy,
}

impl EventExtractor {
    pub fn new(user_path: FieldPath, capture: CapturePolicy) -> Self {
        Self { user_path, capture }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            config.user_field_path(),
            CapturePolicy::new(config.capture_full_document.clone()),
        )
    }

    pub fn user_path(&self) -> &FieldPath {
        &self.user_path
    }

    pub fn capture_policy(&self) -> &CapturePolicy {
        &self.capture
    }

    /// Decode one notification, attribute it, then apply the capture policy.
    ///
    /// Attribution reads the full document before the policy may drop it.
    pub fn extract(&self, raw: Document) -> Result<ChangeEvent, WatchError> {
        let mut event = ChangeEvent::from_document(raw)?;

        event.user = event
            .full_document
            .as_ref()
            .map(|document| self.user_path.resolve_str(document))
            .unwrap_or_default();

        if !self.capture.captures(&event.operation_type) {
            event.full_document = None;
        }
        if !event.is_update() {
            event.update_description = None;
        }

        Ok(event)
    }
}
