//! Fatal errors and process exit codes.

use std::process::ExitCode;

use changewatch_config::{ConfigError, EnvError};
use changewatch_log::LogError;
use changewatch_store::StoreError;
use changewatch_watch::{FeedError, WatchError};
use thiserror::Error;

/// Application exit codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    LoggingError = 3,
    AuditConnectionError = 4,
    SourceConnectionError = 5,
    ResumeTokenError = 6,
    WatchError = 7,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

/// Everything that stops the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Logging(#[from] LogError),

    #[error("failed to connect to audit store: {0}")]
    AuditConnection(#[source] StoreError),

    #[error("failed to connect to source database: {0}")]
    SourceConnection(#[source] FeedError),

    #[error("failed to read resume token: {0}")]
    ResumeToken(#[source] StoreError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl AppError {
    pub fn exit(&self) -> Exit {
        match self {
            Self::Config(_) | Self::Env(_) => Exit::ConfigError,
            Self::Logging(_) => Exit::LoggingError,
            Self::AuditConnection(_) => Exit::AuditConnectionError,
            Self::SourceConnection(_) => Exit::SourceConnectionError,
            Self::ResumeToken(_) => Exit::ResumeTokenError,
            Self::Watch(_) => Exit::WatchError,
            Self::Render(_) => Exit::GeneralError,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        self.exit().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            AppError::Config(ConfigError::ValidationError {
                message: "auditDbUrl is required".into(),
            }),
            AppError::Logging(LogError::Init("already set".into())),
            AppError::AuditConnection(StoreError::UnsupportedUrl {
                scheme: "postgres".into(),
            }),
            AppError::SourceConnection(FeedError::Unavailable("refused".into())),
            AppError::ResumeToken(StoreError::Unavailable("timeout".into())),
            AppError::Watch(WatchError::AlreadyStarted),
        ];

        let codes: Vec<u8> = errors.iter().map(|e| e.exit() as u8).collect();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_messages_name_the_failing_side() {
        let err = AppError::AuditConnection(StoreError::UnsupportedUrl {
            scheme: "postgres".into(),
        });
        assert!(err.to_string().starts_with("failed to connect to audit store"));

        let err = AppError::SourceConnection(FeedError::Unavailable("refused".into()));
        assert!(err.to_string().starts_with("failed to connect to source database"));
    }
}
