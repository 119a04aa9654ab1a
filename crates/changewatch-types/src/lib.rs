//! Change event types for changewatch.
//!
//! This crate holds the values shared by every stage of the pipeline: the
//! normalized [`ChangeEvent`], the opaque [`ResumeToken`], the dotted
//! [`FieldPath`] used for user attribution, and the [`ChangeEventHandler`]
//! capability that dispatch targets implement.

mod event;
mod field_path;
mod handler;
mod namespace;
mod token;

pub use event::{ChangeEvent, UpdateDescription};
pub use field_path::FieldPath;
pub use handler::{handler_fn, ChangeEventHandler, FnHandler, SharedHandler};
pub use namespace::Namespace;
pub use token::ResumeToken;

// Re-export the document model so downstream crates agree on one bson version.
pub use bson::{self, doc, Bson, Document, Timestamp};
