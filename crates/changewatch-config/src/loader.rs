//! Configuration file loading and parsing.

use crate::env::{apply_overrides, vars, Environment};
use crate::types::WatchConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for an explicit file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loader for `$CONFIG_FILE`, falling back to `./config.json`.
    pub fn from_env() -> Self {
        let path = Environment::get(vars::CONFIG_FILE).unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        Self::new(path)
    }

    /// File this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load from the file and the process environment, then validate.
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        self.load_with(Environment::get)
    }

    /// Load with a custom variable lookup, used for `${VAR}` expansion and
    /// for overrides.
    pub fn load_with<F>(&self, lookup: F) -> Result<WatchConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.read_file(&lookup)?;
        apply_overrides(&mut config, &lookup);
        validate(&config)?;
        Ok(config)
    }

    fn read_file<F>(&self, lookup: &F) -> Result<WatchConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.path.exists() {
            warn!(
                path = %self.path.display(),
                "config file does not exist, using defaults and environment variables"
            );
            return Ok(WatchConfig::default());
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::ReadError {
            path: self.path.clone(),
            source,
        })?;
        let expanded = expand_env_vars(&contents, lookup)?;

        let config: WatchConfig = serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        debug!(path = %self.path.display(), "loaded config file");
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("valid pattern"))
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars<F>(content: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = content.to_string();

    for cap in env_var_pattern().captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match (lookup(var_name), default) {
            (Some(v), _) => v,
            (None, Some(d)) => d.to_string(),
            (None, None) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                })
            }
        };

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Check that both stores and both namespaces are configured.
pub fn validate(config: &WatchConfig) -> Result<(), ConfigError> {
    let required = [
        ("appDbUrl", &config.app_db_url),
        ("appDatabaseName", &config.app_database),
        ("appDatabaseCollection", &config.app_collection),
        ("auditDbUrl", &config.audit_db_url),
        ("auditDatabaseName", &config.audit_database),
        ("auditDatabaseCollection", &config.audit_collection),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| *key)
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::ValidationError {
            message: format!("missing required settings: {}", missing.join(", ")),
        });
    }

    if config.user_field_path.split('.').any(str::is_empty) && !config.user_field_path.is_empty() {
        return Err(ConfigError::ValidationError {
            message: format!("userFieldPath has an empty segment: {:?}", config.user_field_path),
        });
    }

    Ok(())
}
