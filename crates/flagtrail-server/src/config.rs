//! Environment-driven server configuration.

use flagtrail_db::DbConfig;
use flagtrail_events::EventsConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub events: EventsConfig,
}

impl ServerConfig {
    /// Reads `FLAGTRAIL_*` variables, loading `.env` first when present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let db = &mut config.db;
        let events = &mut config.events;

        if let Some(url) = lookup("FLAGTRAIL_DB_URL") {
            db.url = url;
        }
        if let Some(namespace) = lookup("FLAGTRAIL_DB_NAMESPACE") {
            db.namespace = namespace;
        }
        if let Some(database) = lookup("FLAGTRAIL_DB_DATABASE") {
            db.database = database;
        }
        if let Some(username) = lookup("FLAGTRAIL_DB_USER") {
            db.username = username;
        }
        if let Some(password) = lookup("FLAGTRAIL_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(api_version) = lookup("FLAGTRAIL_API_VERSION") {
            events.api_version = api_version;
        }
        if let Some(max) = lookup("FLAGTRAIL_MAX_PER_PAGE") {
            let max: u64 = max.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "FLAGTRAIL_MAX_PER_PAGE",
                reason: format!("{e}"),
            })?;
            if max == 0 {
                return Err(ConfigError::Invalid {
                    name: "FLAGTRAIL_MAX_PER_PAGE",
                    reason: "must be at least 1".into(),
                });
            }
            events.max_per_page = max;
            events.default_per_page = events.default_per_page.min(max);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.namespace, "flagtrail");
        assert_eq!(config.db.database, "events");
        assert_eq!(config.events.max_per_page, 100);
        assert_eq!(config.events.default_per_page, 30);
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("FLAGTRAIL_DB_URL", "db.internal:8000"),
            ("FLAGTRAIL_DB_USER", "events"),
            ("FLAGTRAIL_API_VERSION", "2025-01-01"),
            ("FLAGTRAIL_MAX_PER_PAGE", "20"),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.db.username, "events");
        assert_eq!(config.events.api_version, "2025-01-01");
        assert_eq!(config.events.max_per_page, 20);
        assert_eq!(config.events.default_per_page, 20);
    }

    #[test]
    fn invalid_page_size_is_rejected() {
        for value in ["many", "0"] {
            let err = ServerConfig::from_lookup(lookup(&[("FLAGTRAIL_MAX_PER_PAGE", value)]))
                .unwrap_err();
            assert!(err.to_string().contains("FLAGTRAIL_MAX_PER_PAGE"));
        }
    }
}
