//! Application configuration.
//! Handles environment variable loading, validation and defaults.

use sqlx::types::BigDecimal;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub payout: PayoutConfig,
    pub reconciler: ReconcilerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64, // seconds
    pub idle_timeout: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// External transfer gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_secs: u64,
}

/// Payout rules applied when a provider requests a withdrawal.
#[derive(Debug, Clone)]
pub struct PayoutConfig {
    pub minimum_amount: BigDecimal,
    pub currency: String,
}

/// Reconciliation worker configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub poll_interval_secs: u64,
    /// Leave freshly claimed requests alone for this long so the worker does
    /// not race an in-flight approval.
    pub min_age_secs: i64,
    pub batch_size: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            payout: PayoutConfig::from_env()?,
            reconciler: ReconcilerConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.gateway.validate()?;
        self.payout.validate()?;
        self.reconciler.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }
        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            base_url: env::var("TRANSFER_GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            secret_key: env::var("TRANSFER_GATEWAY_SECRET_KEY")
                .map_err(|_| ConfigError::MissingVariable("TRANSFER_GATEWAY_SECRET_KEY".to_string()))?,
            timeout_secs: env::var("TRANSFER_GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("TRANSFER_GATEWAY_TIMEOUT_SECS".to_string())
                })?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "TRANSFER_GATEWAY_BASE_URL must be a valid URL".to_string(),
            ));
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "TRANSFER_GATEWAY_SECRET_KEY cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "TRANSFER_GATEWAY_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl PayoutConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_minimum = env::var("MINIMUM_PAYOUT_AMOUNT").unwrap_or_else(|_| "10.00".to_string());
        Ok(PayoutConfig {
            minimum_amount: BigDecimal::from_str(&raw_minimum)
                .map_err(|_| ConfigError::InvalidValue("MINIMUM_PAYOUT_AMOUNT".to_string()))?,
            currency: env::var("PAYOUT_CURRENCY").unwrap_or_else(|_| "GHS".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_amount <= BigDecimal::from(0) {
            return Err(ConfigError::InvalidValue(
                "MINIMUM_PAYOUT_AMOUNT must be positive".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PAYOUT_CURRENCY".to_string()));
        }
        Ok(())
    }
}

impl ReconcilerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ReconcilerConfig {
            poll_interval_secs: env::var("RECONCILER_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("RECONCILER_POLL_INTERVAL_SECS".to_string())
                })?,
            min_age_secs: env::var("RECONCILER_MIN_AGE_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RECONCILER_MIN_AGE_SECS".to_string()))?,
            batch_size: env::var("RECONCILER_BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RECONCILER_BATCH_SIZE".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RECONCILER_POLL_INTERVAL_SECS cannot be 0".to_string(),
            ));
        }
        if self.min_age_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "RECONCILER_MIN_AGE_SECS must not be negative".to_string(),
            ));
        }
        if self.batch_size <= 0 {
            return Err(ConfigError::InvalidValue(
                "RECONCILER_BATCH_SIZE must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_payout_minimum_must_be_positive() {
        let config = PayoutConfig {
            minimum_amount: BigDecimal::from(0),
            currency: "GHS".to_string(),
        };
        assert!(config.validate().is_err());

        let config = PayoutConfig {
            minimum_amount: BigDecimal::from_str("10.00").unwrap(),
            currency: "GHS".to_string(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconciler_rejects_busy_spin_and_negative_age() {
        let config = ReconcilerConfig {
            poll_interval_secs: 0,
            min_age_secs: 120,
            batch_size: 100,
        };
        assert!(config.validate().is_err());

        let config = ReconcilerConfig {
            poll_interval_secs: 60,
            min_age_secs: -1,
            batch_size: 100,
        };
        assert!(config.validate().is_err());

        let config = ReconcilerConfig {
            poll_interval_secs: 60,
            min_age_secs: 120,
            batch_size: 100,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gateway_url_must_be_http() {
        let config = GatewayConfig {
            base_url: "ftp://example.com".to_string(),
            secret_key: "sk_test".to_string(),
            timeout_secs: 30,
        };
        assert!(config.validate().is_err());
    }
}
