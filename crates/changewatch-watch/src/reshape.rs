//! The fixed reshape step applied to raw change notifications.
//!
//! Raw notifications nest the namespace under `ns` and the document id
//! under `documentKey._id`, and carry the cluster time as `clusterTime`.
//! The reshape flattens them into the [`ChangeEvent`] wire shape and drops
//! everything else, so the event shape does not follow the feed's.
//!
//! [`ChangeEvent`]: changewatch_types::ChangeEvent

use changewatch_types::{doc, Document};

/// Fields kept after reshaping, besides `_id`.
pub const PROJECTED_FIELDS: [&str; 7] = [
    "timestamp",
    "operationType",
    "database",
    "collection",
    "documentKey",
    "fullDocument",
    "updateDescription",
];

/// Aggregation stages for feeds that reshape server-side.
///
/// `_id` is left untouched because it carries the resume token.
pub fn pipeline() -> Vec<Document> {
    let mut projection = Document::new();
    for field in PROJECTED_FIELDS {
        projection.insert(field, 1);
    }

    vec![
        doc! {
            "$addFields": {
                "timestamp": "$clusterTime",
                "database": "$ns.db",
                "collection": "$ns.coll",
                "documentKey": "$documentKey._id",
            }
        },
        doc! { "$project": projection },
    ]
}

/// Client-side equivalent of [`pipeline`] for feeds that cannot aggregate.
pub fn apply(raw: &Document) -> Document {
    let mut shaped = Document::new();

    if let Some(id) = raw.get("_id") {
        shaped.insert("_id", id.clone());
    }
    if let Some(time) = raw.get("clusterTime") {
        shaped.insert("timestamp", time.clone());
    }
    if let Some(op) = raw.get("operationType") {
        shaped.insert("operationType", op.clone());
    }
    if let Ok(ns) = raw.get_document("ns") {
        if let Some(db) = ns.get("db") {
            shaped.insert("database", db.clone());
        }
        if let Some(coll) = ns.get("coll") {
            shaped.insert("collection", coll.clone());
        }
    }
    if let Some(key) = raw.get_document("documentKey").ok().and_then(|key| key.get("_id")) {
        shaped.insert("documentKey", key.clone());
    }
    for field in ["fullDocument", "updateDescription"] {
        if let Some(value) = raw.get(field) {
            shaped.insert(field, value.clone());
        }
    }

    shaped
}
