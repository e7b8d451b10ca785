use std::env;
use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_USER: &str = "postgres";
const DEFAULT_DATABASE: &str = "asistencia_qr";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 2_000;

/// Connection pool configuration loaded from environment variables.
#[derive(Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
    pub max_connections: u32,
    pub idle_timeout_ms: u64,
    pub connection_timeout_ms: u64,
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Empty values are treated as absent and unparsable numbers fall back
    /// to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            host: get("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            user: get("DB_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: get("DB_PASSWORD").unwrap_or_default(),
            database: get("DB_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            port: get("DB_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            idle_timeout_ms: get("DB_IDLE_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_IDLE_TIMEOUT_MS),
            connection_timeout_ms: get("DB_CONNECTION_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_MS),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Connection options for a single physical connection.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PoolConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PoolConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_vars_use_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "");
        assert_eq!(config.database, "asistencia_qr");
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.idle_timeout_ms, 30_000);
        assert_eq!(config.connection_timeout_ms, 2_000);
    }

    #[test]
    fn default_matches_empty_environment() {
        assert_eq!(PoolConfig::default(), config_from(&[]));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = config_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_USER", "asistencia"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_NAME", "registro"),
            ("DB_PORT", "6543"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_IDLE_TIMEOUT_MS", "1000"),
            ("DB_CONNECTION_TIMEOUT_MS", "250"),
        ]);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.user, "asistencia");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database, "registro");
        assert_eq!(config.port, 6543);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.idle_timeout(), Duration::from_secs(1));
        assert_eq!(config.connection_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = config_from(&[("DB_HOST", ""), ("DB_PORT", "")]);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = config_from(&[
            ("DB_PORT", "not-a-port"),
            ("DB_MAX_CONNECTIONS", "0"),
            ("DB_CONNECTION_TIMEOUT_MS", "-5"),
        ]);
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connection_timeout_ms, 2_000);
    }

    #[test]
    fn debug_redacts_password() {
        let config = config_from(&[("DB_PASSWORD", "hunter2")]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn connect_options_carry_target() {
        let config = config_from(&[("DB_HOST", "db.internal"), ("DB_PORT", "6543")]);
        let options = config.connect_options();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("asistencia_qr"));
    }
}
