//! Audit store access for changewatch.
//!
//! The audit store doubles as the resume checkpoint: the most recent record's
//! `_id` is the position the change feed resumes after. This crate provides
//! the [`AuditStore`] capability, the [`ResumeTokenTracker`] that reads the
//! checkpoint, the [`AuditDispatcher`] that writes events idempotently, and
//! three backends selected by URL scheme.

mod connect;
mod dispatcher;
mod error;
mod memory;
mod mongo;
mod pool;
mod sqlite;
mod traits;
mod tracker;

pub use connect::{connect, StoreBackend};
pub use dispatcher::AuditDispatcher;
pub use error::StoreError;
pub use memory::MemoryAuditStore;
pub use mongo::{connect_client, MongoAuditStore};
pub use pool::{AuditPool, PoolConfig, PoolError};
pub use sqlite::SqliteAuditStore;
pub use traits::AuditStore;
pub use tracker::ResumeTokenTracker;

#[cfg(test)]
pub use traits::MockAuditStore;
