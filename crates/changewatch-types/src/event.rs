//! Normalized change events.

use crate::ResumeToken;
use bson::{Bson, Document, Timestamp};
use serde::{Deserialize, Serialize};

/// One observed mutation on a watched collection.
///
/// The serialized shape is also the audit record shape: `_id` holds the
/// resume token, which makes the token the record's primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Resume token of the notification. Doubles as the event identity.
    #[serde(rename = "_id")]
    pub id: ResumeToken,
    /// Attributed actor, empty when it could not be resolved.
    #[serde(default)]
    pub user: String,
    /// Cluster time of the source mutation.
    pub timestamp: Timestamp,
    /// `insert`, `update`, `replace`, `delete`, ...
    pub operation_type: String,
    /// Source database.
    #[serde(default)]
    pub database: String,
    /// Source collection.
    #[serde(default)]
    pub collection: String,
    /// Identity of the mutated document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<Bson>,
    /// Post-mutation snapshot, kept only when the capture policy allows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_document: Option<Document>,
    /// Field-level diff, present for `update` operations only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_description: Option<UpdateDescription>,
}

/// Field-level diff of an `update` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescription {
    /// Fields set by the update, keyed by dotted path.
    #[serde(default)]
    pub updated_fields: Document,
    /// Dotted paths removed by the update.
    #[serde(default)]
    pub removed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated_arrays: Option<Vec<Document>>,
}

impl ChangeEvent {
    /// Operation type of an update.
    pub const UPDATE: &'static str = "update";

    /// Decode a reshaped feed notification.
    pub fn from_document(document: Document) -> Result<Self, bson::de::Error> {
        bson::from_document(document)
    }

    /// Encode as an audit record.
    pub fn to_document(&self) -> Result<Document, bson::ser::Error> {
        bson::to_document(self)
    }

    /// Sort key matching the audit store's `timestamp` descending order.
    pub fn ordering_key(&self) -> (u32, u32) {
        (self.timestamp.time, self.timestamp.increment)
    }

    /// Whether this event describes an `update`.
    pub fn is_update(&self) -> bool {
        self.operation_type == Self::UPDATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    fn reshaped_update() -> Document {
        let oid = ObjectId::parse_str("64b7f0c2a1e3b2d4c5f60718").unwrap();
        doc! {
            "_id": { "_data": "8264B7F0C2000000012B" },
            "timestamp": Timestamp { time: 1_689_776_322, increment: 1 },
            "operationType": "update",
            "database": "app",
            "collection": "orders",
            "documentKey": oid,
            "fullDocument": { "_id": oid, "owner": "alice", "total": 12 },
            "updateDescription": {
                "updatedFields": { "total": 12 },
                "removedFields": ["note"],
            },
        }
    }

    #[test]
    fn test_decode_reshaped_notification() {
        let event = ChangeEvent::from_document(reshaped_update()).unwrap();

        assert_eq!(event.id, ResumeToken::new("8264B7F0C2000000012B"));
        assert_eq!(event.user, "");
        assert_eq!(event.operation_type, "update");
        assert_eq!(event.database, "app");
        assert_eq!(event.collection, "orders");
        assert!(event.document_key.is_some());
        assert_eq!(event.ordering_key(), (1_689_776_322, 1));
        assert!(event.is_update());

        let update = event.update_description.unwrap();
        assert_eq!(update.updated_fields.get_i32("total").unwrap(), 12);
        assert_eq!(update.removed_fields, vec!["note".to_string()]);
        assert!(update.truncated_arrays.is_none());
    }

    #[test]
    fn test_null_full_document_decodes_as_none() {
        let mut raw = reshaped_update();
        raw.insert("fullDocument", Bson::Null);
        let event = ChangeEvent::from_document(raw).unwrap();
        assert!(event.full_document.is_none());
    }

    #[test]
    fn test_missing_operation_type_is_an_error() {
        let mut raw = reshaped_update();
        raw.remove("operationType");
        assert!(ChangeEvent::from_document(raw).is_err());
    }

    #[test]
    fn test_audit_record_omits_absent_fields() {
        let mut event = ChangeEvent::from_document(reshaped_update()).unwrap();
        event.full_document = None;
        event.update_description = None;
        event.user = "alice".to_string();

        let record = event.to_document().unwrap();
        assert_eq!(record.get_document("_id").unwrap(), &doc! { "_data": "8264B7F0C2000000012B" });
        assert_eq!(record.get_str("user").unwrap(), "alice");
        assert!(record.get_timestamp("timestamp").is_ok());
        assert!(!record.contains_key("fullDocument"));
        assert!(!record.contains_key("updateDescription"));
    }
}
