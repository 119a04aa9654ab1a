//! SQLite connection pool for the audit table.
//!
//! Tuning comes from the audit URL's query string:
//! `sqlite:/var/lib/changewatch/audit.db?max_connections=4&synchronous=normal`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

const MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to open audit database: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("audit database did not answer: {0}")]
    Unreachable(String),

    #[error("invalid sqlite url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database file, or `:memory:`.
    pub path: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    /// WAL lets the resume lookup read while upserts are in flight.
    pub wal: bool,
    pub synchronous: SqliteSynchronous,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            path: "changewatch-audit.db".to_string(),
            max_connections: 8,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            wal: true,
            synchronous: SqliteSynchronous::Full,
        }
    }
}

impl PoolConfig {
    /// Parse `sqlite:<path>[?key=value&...]`. A `sqlite://` prefix is also
    /// accepted. Known keys: `max_connections`, `busy_timeout_ms`, `wal`,
    /// `synchronous`.
    pub fn from_url(url: &str) -> Result<Self, PoolError> {
        let invalid = |reason: String| PoolError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .ok_or_else(|| invalid("expected a sqlite: url".to_string()))?;
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        if path.is_empty() {
            return Err(invalid("missing database path".to_string()));
        }

        let mut config = if path == MEMORY {
            Self::in_memory()
        } else {
            Self {
                path: path.to_string(),
                ..Self::default()
            }
        };

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "max_connections" => {
                    config.max_connections = value.parse().map_err(|_| invalid(format!("bad max_connections {value:?}")))?;
                }
                "busy_timeout_ms" => {
                    let ms: u64 = value.parse().map_err(|_| invalid(format!("bad busy_timeout_ms {value:?}")))?;
                    config.busy_timeout = Duration::from_millis(ms);
                }
                "wal" => {
                    config.wal = value.parse().map_err(|_| invalid(format!("bad wal {value:?}")))?;
                }
                "synchronous" => {
                    config.synchronous = SqliteSynchronous::from_str(value).map_err(|e| invalid(e.to_string()))?;
                }
                other => return Err(invalid(format!("unknown option {other:?}"))),
            }
        }

        config.validate().map_err(|e| match e {
            PoolError::InvalidUrl { reason, .. } => invalid(reason),
            other => other,
        })?;
        Ok(config)
    }

    /// One connection that is never recycled, since the database lives and
    /// dies with it.
    pub fn in_memory() -> Self {
        Self {
            path: MEMORY.to_string(),
            max_connections: 1,
            wal: false,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == MEMORY
    }

    fn validate(&self) -> Result<(), PoolError> {
        let reason = if self.max_connections == 0 {
            "max_connections must be at least 1"
        } else if self.is_in_memory() && self.max_connections > 1 {
            "an in-memory database is private to one connection, max_connections must be 1"
        } else {
            return Ok(());
        };

        Err(PoolError::InvalidUrl {
            url: format!("sqlite:{}", self.path),
            reason: reason.to_string(),
        })
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, PoolError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", self.path))?
            .create_if_missing(true)
            .busy_timeout(self.busy_timeout)
            .synchronous(self.synchronous);

        Ok(if self.wal {
            options.journal_mode(SqliteJournalMode::Wal)
        } else {
            options
        })
    }
}

/// Connection pool shared by the audit store's reads and writes.
pub struct AuditPool {
    pool: SqlitePool,
    config: PoolConfig,
}

impl AuditPool {
    /// Open the pool and make sure the database answers.
    #[instrument(skip(config), fields(path = %config.path))]
    pub async fn open(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            options = options.min_connections(1).idle_timeout(None).max_lifetime(None);
        }

        let pool = options.connect_with(config.connect_options()?).await?;
        let pool = Self { pool, config };
        pool.ping().await?;

        info!(max_connections = pool.config.max_connections, "audit database opened");
        Ok(pool)
    }

    pub fn sqlite(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| PoolError::Unreachable(e.to_string()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_url_with_options() {
        let config =
            PoolConfig::from_url("sqlite:/var/lib/changewatch/audit.db?max_connections=4&wal=false&synchronous=normal&busy_timeout_ms=250")
                .unwrap();

        assert_eq!(config.path, "/var/lib/changewatch/audit.db");
        assert_eq!(config.max_connections, 4);
        assert!(!config.wal);
        assert!(matches!(config.synchronous, SqliteSynchronous::Normal));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_memory_url() {
        for url in ["sqlite::memory:", "sqlite://:memory:"] {
            let config = PoolConfig::from_url(url).unwrap();
            assert!(config.is_in_memory());
            assert_eq!(config.max_connections, 1);
        }
    }

    #[test]
    fn test_rejects_bad_urls() {
        for url in [
            "postgres://localhost/audit",
            "sqlite:",
            "sqlite:audit.db?max_connections=zero",
            "sqlite:audit.db?max_connections=0",
            "sqlite::memory:?max_connections=2",
            "sqlite:audit.db?journal=wal",
        ] {
            assert!(
                matches!(PoolConfig::from_url(url), Err(PoolError::InvalidUrl { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_open_in_memory_pool() {
        let pool = AuditPool::open(PoolConfig::in_memory()).await.unwrap();

        assert!(pool.config().is_in_memory());
        pool.ping().await.unwrap();
        pool.close().await;
        assert!(pool.is_closed());
    }
}
