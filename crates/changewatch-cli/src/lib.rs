//! changewatch
//!
//! Watches a collection's change stream, attributes every change to a user
//! and records it in an audit store. The newest audit record doubles as the
//! resume checkpoint, so a restarted process continues where the previous
//! one stopped.

pub mod app;
pub mod cli;
pub mod error;
pub mod redact;

pub use app::{run, run_pipeline};
pub use cli::Cli;
pub use error::{AppError, Exit};
