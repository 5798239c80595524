use std::time::Duration;

/// Errors raised while reading database configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    /// Pool size (default: `20`).
    pub max_connections: u32,
    /// How long to wait for a free connection (default: `5`).
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `DATABASE_URL`            | (required) |
    /// | `DB_MAX_CONNECTIONS`      | `20`       |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `5`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let max_connections = parse_var("DB_MAX_CONNECTIONS", 20, "u32")?;
        let acquire_timeout_secs = parse_var("DB_ACQUIRE_TIMEOUT_SECS", 5, "u64")?;

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout_secs,
        })
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u32 = parse_var("HANDBOOK_TEST_UNSET_VARIABLE", 20, "u32").unwrap();
        assert_eq!(value, 20);
    }

    #[test]
    fn config_error_messages() {
        assert_eq!(
            ConfigError::Missing("DATABASE_URL").to_string(),
            "DATABASE_URL must be set"
        );
        let err = ConfigError::Invalid {
            name: "DB_MAX_CONNECTIONS",
            expected: "u32",
            value: "many".into(),
        };
        assert_eq!(
            err.to_string(),
            "DB_MAX_CONNECTIONS must be a valid u32, got 'many'"
        );
    }

    #[test]
    fn acquire_timeout_is_in_seconds() {
        let config = DbConfig {
            database_url: "postgres://localhost/handbook".into(),
            max_connections: 5,
            acquire_timeout_secs: 3,
        };
        assert_eq!(config.acquire_timeout(), Duration::from_secs(3));
    }
}
