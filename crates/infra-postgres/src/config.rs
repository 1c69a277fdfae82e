// Database configuration (built once at startup, passed explicitly)

use erp_intake_core::error::{AppError, Result};
use std::time::Duration;

pub const ENV_HOST: &str = "POSTGRES_HOST";
pub const ENV_PORT: &str = "POSTGRES_PORT";
pub const ENV_USER: &str = "POSTGRES_USER";
pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DATABASE: &str = "POSTGRES_DB";
pub const ENV_SCHEMA: &str = "POSTGRES_SCHEMA";
pub const ENV_MAX_CONNECTIONS: &str = "POSTGRES_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "POSTGRES_ACQUIRE_TIMEOUT_SECS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the registration store
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Used as `search_path`; created on first connect
    pub schema: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            schema: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        validate_schema_name(&schema)?;
        self.schema = Some(schema);
        Ok(self)
    }

    /// Read settings from the process environment.
    ///
    /// Host, port, user, password and database are required; a missing
    /// or unparsable value is a startup-fatal `Config` error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let port = parse(ENV_PORT, &required(ENV_PORT)?)?;
        let mut config = Self::new(
            required(ENV_HOST)?,
            port,
            required(ENV_USER)?,
            required(ENV_PASSWORD)?,
            required(ENV_DATABASE)?,
        );

        if let Some(schema) = lookup(ENV_SCHEMA).filter(|v| !v.is_empty()) {
            config = config.with_schema(schema)?;
        }
        if let Some(max) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = parse(ENV_MAX_CONNECTIONS, &max)?;
        }
        if let Some(secs) = lookup(ENV_ACQUIRE_TIMEOUT_SECS) {
            config.acquire_timeout = Duration::from_secs(parse(ENV_ACQUIRE_TIMEOUT_SECS, &secs)?);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} has invalid value {:?}", key, value)))
}

/// Schema names end up in DDL, so only plain identifiers are accepted
pub(crate) fn validate_schema_name(schema: &str) -> Result<()> {
    let valid = !schema.is_empty()
        && schema.len() <= 63
        && schema
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !schema.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        return Err(AppError::Config(format!("invalid schema name {:?}", schema)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 5] = [
        (ENV_HOST, "db.internal"),
        (ENV_PORT, "5433"),
        (ENV_USER, "erp_user"),
        (ENV_PASSWORD, "secret"),
        (ENV_DATABASE, "erp_db"),
    ];

    #[test]
    fn test_from_lookup_reads_required_settings() {
        let config = DatabaseConfig::from_lookup(env(&BASE)).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5433);
        assert_eq!(config.database, "erp_db");
        assert_eq!(config.schema, None);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_missing_setting_is_config_error() {
        let err = DatabaseConfig::from_lookup(env(&BASE[..4])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains(ENV_DATABASE)));
    }

    #[test]
    fn test_bad_port_is_config_error() {
        let mut pairs = BASE.to_vec();
        pairs[1] = (ENV_PORT, "not-a-port");
        let err = DatabaseConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_optional_settings() {
        let mut pairs = BASE.to_vec();
        pairs.push((ENV_SCHEMA, "intake_test"));
        pairs.push((ENV_MAX_CONNECTIONS, "4"));
        pairs.push((ENV_ACQUIRE_TIMEOUT_SECS, "2"));
        let config = DatabaseConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.schema.as_deref(), Some("intake_test"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_schema_name_must_be_identifier() {
        assert!(validate_schema_name("intake_01").is_ok());
        assert!(validate_schema_name("public; DROP TABLE x").is_err());
        assert!(validate_schema_name("1abc").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DatabaseConfig::from_lookup(env(&BASE)).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
