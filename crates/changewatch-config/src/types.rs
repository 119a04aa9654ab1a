//! Configuration types.

use changewatch_types::{FieldPath, Namespace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration. Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Connection string of the watched (source) store.
    #[serde(rename = "appDbUrl")]
    pub app_db_url: String,
    /// Watched database.
    #[serde(rename = "appDatabaseName")]
    pub app_database: String,
    /// Watched collection.
    #[serde(rename = "appDatabaseCollection")]
    pub app_collection: String,
    /// Dotted path to the acting user inside the full document.
    #[serde(rename = "userFieldPath")]
    pub user_field_path: String,

    /// Connection string of the audit store.
    #[serde(rename = "auditDbUrl")]
    pub audit_db_url: String,
    /// Audit database.
    #[serde(rename = "auditDatabaseName")]
    pub audit_database: String,
    /// Audit collection (table for SQL backends).
    #[serde(rename = "auditDatabaseCollection")]
    pub audit_collection: String,

    /// Operation type -> keep the full document in the audit record.
    #[serde(rename = "fullDocRecordOperations")]
    pub capture_full_document: HashMap<String, bool>,
    /// Deployment version tag.
    pub version: String,
}

impl WatchConfig {
    /// The watched namespace.
    pub fn app_namespace(&self) -> Namespace {
        Namespace::new(&self.app_database, &self.app_collection)
    }

    /// The namespace audit records are written to.
    pub fn audit_namespace(&self) -> Namespace {
        Namespace::new(&self.audit_database, &self.audit_collection)
    }

    /// Parsed user attribution path.
    pub fn user_field_path(&self) -> FieldPath {
        FieldPath::parse(&self.user_field_path)
    }

    /// Whether the full document is kept for `operation_type`. Unset means no.
    pub fn captures_full_document(&self, operation_type: &str) -> bool {
        self.capture_full_document
            .get(operation_type)
            .copied()
            .unwrap_or(false)
    }
}
