//! Credential-free rendering of the effective configuration.

use changewatch_config::WatchConfig;
use url::Url;

/// Reduce a connection string to scheme, host and port.
///
/// Host-less URLs (`sqlite:audit.db`, `memory:`) carry no credentials and
/// are returned unchanged.
pub fn redact_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    match Url::parse(raw) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}://{host}:{port}", url.scheme()),
            (Some(host), None) => format!("{}://{host}", url.scheme()),
            (None, _) if url.username().is_empty() && url.password().is_none() => raw.to_string(),
            (None, _) => format!("{}://", url.scheme()),
        },
        // Seed lists such as `mongodb://a:1,b:2/db` are not valid URLs.
        Err(_) => redact_authority(raw),
    }
}

fn redact_authority(raw: &str) -> String {
    let Some((scheme, rest)) = raw.split_once("://") else {
        return "<redacted>".to_string();
    };
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);
    format!("{scheme}://{hosts}")
}

/// The configuration with both store URLs redacted.
pub fn redacted(config: &WatchConfig) -> WatchConfig {
    WatchConfig {
        app_db_url: redact_url(&config.app_db_url),
        audit_db_url: redact_url(&config.audit_db_url),
        ..config.clone()
    }
}

/// YAML rendering of [`redacted`].
pub fn render(config: &WatchConfig) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&redacted(config))
}
