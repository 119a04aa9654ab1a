//! Logging setup for changewatch.
//!
//! Everything goes to stderr, optionally mirrored to an append-only file.
//! Settings come from `CHANGEWATCH_LOG_*` variables; `RUST_LOG` is honoured
//! as a full filter directive unless a CLI flag picks a level.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Span helpers for the watch pipeline.
pub mod spans;

pub use tracing::{debug, error, info, trace, warn};

/// Environment variables read by [`LogConfig::from_env`].
pub mod vars {
    pub const LEVEL: &str = "CHANGEWATCH_LOG_LEVEL";
    pub const FORMAT: &str = "CHANGEWATCH_LOG_FORMAT";
    pub const FILE: &str = "CHANGEWATCH_LOG_FILE";
    pub const SOURCE: &str = "CHANGEWATCH_LOG_SOURCE";
    pub const SPANS: &str = "CHANGEWATCH_LOG_SPANS";
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Store drivers log every statement at info; keep them down unless asked.
const QUIET_DEPENDENCIES: &str = "sqlx=warn,mongodb=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LogError::InvalidSetting(format!("unknown log level {other:?}"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_filter(), f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, for terminals.
    #[default]
    Pretty,
    Compact,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LogError::InvalidSetting(format!("unknown log format {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Raw `RUST_LOG` directives. Win over `level` when present and valid.
    pub directives: Option<String>,
    pub format: LogFormat,
    /// Append-mode mirror of the stderr output.
    pub file: Option<PathBuf>,
    /// Print file and line of each event.
    pub source_location: bool,
    /// Log span open/close, useful to time handler invocations.
    pub span_events: bool,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values are
    /// ignored and the default kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |var| {
            lookup(var).is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        };

        Self {
            level: lookup(vars::LEVEL).and_then(|v| v.parse().ok()).unwrap_or_default(),
            directives: lookup(vars::RUST_LOG).filter(|v| !v.trim().is_empty()),
            format: lookup(vars::FORMAT).and_then(|v| v.parse().ok()).unwrap_or_default(),
            file: lookup(vars::FILE).filter(|v| !v.is_empty()).map(PathBuf::from),
            source_location: flag(vars::SOURCE),
            span_events: flag(vars::SPANS),
        }
    }

    /// Force a level, dropping any `RUST_LOG` directives.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.directives = None;
        self
    }

    fn filter(&self) -> EnvFilter {
        self.directives
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(format!("{},{QUIET_DEPENDENCIES}", self.level)))
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_span_events(spans)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            LogFormat::Pretty => base.with_ansi(ansi).boxed(),
            LogFormat::Compact => base.compact().with_ansi(ansi).boxed(),
            LogFormat::Json => base.json().with_ansi(false).with_current_span(true).boxed(),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let mut layers = vec![config.layer(io::stderr, true)];

    if let Some(path) = &config.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::File {
                path: path.clone(),
                source,
            })?;
        layers.push(config.layer(Mutex::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(config.filter())
        .try_init()
        .map_err(|e| LogError::Init(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    Init(String),

    #[error("failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid logging setting: {0}")]
    InvalidSetting(String),
}
