//! Configuration for changewatch.
//!
//! Settings come from a JSON or YAML file (`CONFIG_FILE`, default
//! `./config.json`), with `${VAR}` expansion inside the file and a fixed set
//! of environment variables overriding individual keys afterwards.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
