//! Environment variable handling.

use crate::types::WatchConfig;
use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Config file location
    pub const CONFIG_FILE: &str = "CONFIG_FILE";

    // Source store
    pub const APP_DB_URL: &str = "APP_DB_URL";
    pub const APP_DB_NAME: &str = "APP_DB_NAME";
    pub const APP_COLLECTION: &str = "APP_COLLECTION";
    pub const USER_FIELD_PATH: &str = "USER_FIELD_PATH";

    // Audit store
    pub const AUDIT_DB_URL: &str = "AUDIT_DB_URL";
    pub const AUDIT_DB_NAME: &str = "AUDIT_DB_NAME";
    pub const AUDIT_COLLECTION: &str = "AUDIT_COLLECTION";

    pub const API_VERSION: &str = "API_VERSION";
}

/// Environment access.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Load `.env` then `.env.local` from the working directory.
    ///
    /// Missing files are fine; a file that exists but does not parse is not.
    pub fn init() -> Result<Self, EnvError> {
        for file in [".env", ".env.local"] {
            match dotenvy::from_filename(file) {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }
}

/// Apply environment overrides to a loaded configuration.
///
/// `lookup` resolves a variable name to its value; pass [`Environment::get`]
/// for the process environment.
pub fn apply_overrides<F>(config: &mut WatchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let targets: [(&str, &mut String); 8] = [
        (vars::APP_DB_URL, &mut config.app_db_url),
        (vars::APP_DB_NAME, &mut config.app_database),
        (vars::APP_COLLECTION, &mut config.app_collection),
        (vars::USER_FIELD_PATH, &mut config.user_field_path),
        (vars::AUDIT_DB_URL, &mut config.audit_db_url),
        (vars::AUDIT_DB_NAME, &mut config.audit_database),
        (vars::AUDIT_COLLECTION, &mut config.audit_collection),
        (vars::API_VERSION, &mut config.version),
    ];

    for (var, field) in targets {
        if let Some(value) = lookup(var) {
            *field = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_replace_only_set_vars() {
        let mut config = WatchConfig {
            app_db_url: "mongodb://file-app".to_string(),
            audit_db_url: "mongodb://file-audit".to_string(),
            version: "1.0".to_string(),
            ..Default::default()
        };

        let env: HashMap<&str, &str> = HashMap::from([
            (vars::AUDIT_DB_URL, "mongodb://env-audit"),
            (vars::APP_COLLECTION, "orders"),
            (vars::API_VERSION, "2.0"),
        ]);
        apply_overrides(&mut config, |var| env.get(var).map(|v| v.to_string()));

        assert_eq!(config.app_db_url, "mongodb://file-app");
        assert_eq!(config.audit_db_url, "mongodb://env-audit");
        assert_eq!(config.app_collection, "orders");
        assert_eq!(config.version, "2.0");
    }

    #[test]
    fn test_every_override_var_is_applied() {
        let mut config = WatchConfig::default();
        apply_overrides(&mut config, |var| Some(format!("from-{}", var)));

        assert_eq!(config.app_db_url, "from-APP_DB_URL");
        assert_eq!(config.app_database, "from-APP_DB_NAME");
        assert_eq!(config.app_collection, "from-APP_COLLECTION");
        assert_eq!(config.user_field_path, "from-USER_FIELD_PATH");
        assert_eq!(config.audit_db_url, "from-AUDIT_DB_URL");
        assert_eq!(config.audit_database, "from-AUDIT_DB_NAME");
        assert_eq!(config.audit_collection, "from-AUDIT_COLLECTION");
        assert_eq!(config.version, "from-API_VERSION");
    }

    #[test]
    fn test_environment_init_without_files() {
        assert!(Environment::init().is_ok());
    }
}
