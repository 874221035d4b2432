//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use word_bracket::{EngineConfig, db::DatabaseConfig};

const DEFAULT_BIND: &str = "127.0.0.1:6970";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    /// Database configuration, `None` when running on the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Engine tuning shared by the scheduler and the API
    pub engine: EngineConfig,
    /// Prometheus scrape listener
    pub metrics_bind: Option<SocketAddr>,
}

/// Command line values that take precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub metrics_bind: Option<SocketAddr>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// `DATABASE_URL` is required unless `overrides.memory` is set.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.map_or_else(parse_default_bind, Ok)?,
        };

        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => parse_addr("METRICS_BIND")?,
        };

        let database = if overrides.memory {
            None
        } else {
            let database_url = overrides
                .database_url
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set a Postgres URL or pass --memory".to_string(),
                })?;
            let defaults = DatabaseConfig::development();
            Some(DatabaseConfig {
                database_url,
                max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                connection_timeout_secs: parse_env_or(
                    "DB_CONNECTION_TIMEOUT",
                    defaults.connection_timeout_secs,
                ),
                idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
                max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
            })
        };

        Ok(Self {
            bind,
            database,
            engine: EngineConfig::from_env(),
            metrics_bind,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TICK_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.engine.max_cas_retries == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_CAS_RETRIES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.engine.challenge_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "CHALLENGE_TTL_HOURS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(database) = &self.database {
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Must not exceed DB_MAX_CONNECTIONS ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("default {DEFAULT_BIND} is not an address"),
    })
}

/// Read an optional socket address, rejecting values that do not parse
fn parse_addr(var: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("'{value}' is not a socket address"),
        }),
        Err(_) => Ok(None),
    }
}

/// Parse environment variable or return default
fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:7000".parse().unwrap(),
            database: None,
            engine: EngineConfig::default(),
            metrics_bind: None,
        }
    }

    #[test]
    fn test_parse_env_or_default() {
        assert_eq!(parse_env_or("WB_NONEXISTENT_VAR_12345", 42), 42);
    }

    #[test]
    fn test_default_bind_parses() {
        assert_eq!(parse_default_bind().unwrap().port(), 6970);
    }

    #[test]
    fn test_overrides_skip_the_database() {
        let config = ServerConfig::from_env(Overrides {
            bind: Some("127.0.0.1:7001".parse().unwrap()),
            memory: true,
            ..Overrides::default()
        })
        .unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.bind.port(), 7001);
    }

    #[test]
    fn test_database_url_override_is_used() {
        let config = ServerConfig::from_env(Overrides {
            bind: Some("127.0.0.1:7002".parse().unwrap()),
            database_url: Some("postgres://localhost/wb_test".to_string()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(
            config.database.unwrap().database_url,
            "postgres://localhost/wb_test"
        );
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(memory_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_tick_interval() {
        let mut config = memory_config();
        config.engine.tick_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TICK_INTERVAL_SECS"));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = memory_config();
        config.engine.max_cas_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shared_metrics_port() {
        let mut config = memory_config();
        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pool_bounds() {
        let mut config = memory_config();
        config.database = Some(DatabaseConfig {
            min_connections: 50,
            max_connections: 10,
            ..DatabaseConfig::development()
        });
        assert!(config.validate().is_err());
    }
}
