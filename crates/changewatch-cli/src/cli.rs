//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use changewatch_config::{ConfigLoader, DEFAULT_CONFIG_FILE};
use changewatch_log::{LogConfig, LogLevel};
use clap::{ArgAction, Parser, ValueHint};

/// changewatch - audit a collection's change stream
///
/// Records every change to the watched collection in an audit store and
/// resumes from the newest audit record after a restart.
#[derive(Debug, Parser)]
#[command(name = "changewatch", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (JSON or YAML)
    #[arg(
        short,
        long,
        env = "CONFIG_FILE",
        value_hint = ValueHint::FilePath,
        help = "Path to configuration file"
    )]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, help = "Increase verbosity level")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose", help = "Suppress non-error output")]
    pub quiet: bool,

    /// Validate the configuration, print it with credentials removed, and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    pub fn config_loader(&self) -> ConfigLoader {
        match &self.config {
            Some(path) => ConfigLoader::new(path),
            None => ConfigLoader::new(DEFAULT_CONFIG_FILE),
        }
    }

    /// Apply verbosity flags on top of the environment-derived settings.
    pub fn log_config(&self, base: LogConfig) -> LogConfig {
        match self.verbose {
            _ if self.quiet => base.with_level(LogLevel::Error),
            0 => base,
            1 => base.with_level(LogLevel::Debug),
            _ => base.with_level(LogLevel::Trace),
        }
    }
}
