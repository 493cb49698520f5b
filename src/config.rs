// Configuration management

use crate::core::errors::RegistrarError;
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Token configuration
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_minutes: i64,

    // Credential configuration
    pub bcrypt_cost: u32,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, RegistrarError> {
        // Load .env file if present (development)
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // Ignore errors (file may not exist)
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0")?,
            port: Self::parse_port()?,
            jwt_secret: Self::get_required_env("JWT_SECRET")?,
            jwt_issuer: Self::get_env_or_default("JWT_ISSUER", "registrar")?,
            jwt_audience: Self::get_env_or_default("JWT_AUDIENCE", "registrar-clients")?,
            token_ttl_minutes: Self::parse_i64_or_default("TOKEN_TTL_MINUTES", 60)?,
            bcrypt_cost: Self::parse_u32_or_default("BCRYPT_COST", 12)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default(
                "BODY_SIZE_LIMIT_BYTES",
                2 * 1024 * 1024,
            )?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info")?,
            log_format: Self::get_env_or_default("LOG_FORMAT", "json")?,
        };

        // Post-load validation
        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> Result<String, RegistrarError> {
        Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
    }

    /// Get required environment variable
    fn get_required_env(key: &str) -> Result<String, RegistrarError> {
        let value = env::var(key)
            .map_err(|_| RegistrarError::Infrastructure(format!("{} not set", key)))?;

        if value.is_empty() {
            return Err(RegistrarError::Infrastructure(format!("{} is empty", key)));
        }

        Ok(value)
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, RegistrarError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            RegistrarError::Infrastructure(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(RegistrarError::Infrastructure(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Parse i64 from environment variable or return default
    fn parse_i64_or_default(key: &str, default: i64) -> Result<i64, RegistrarError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<i64>().map_err(|e| {
                    RegistrarError::Infrastructure(format!(
                        "Invalid {} value '{}': {}",
                        key, value, e
                    ))
                })?;

                if parsed <= 0 {
                    return Err(RegistrarError::Infrastructure(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, RegistrarError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    RegistrarError::Infrastructure(format!(
                        "Invalid {} value '{}': {}",
                        key, value, e
                    ))
                })?;

                if parsed == 0 {
                    return Err(RegistrarError::Infrastructure(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Parse u32 from environment variable or return default
    fn parse_u32_or_default(key: &str, default: u32) -> Result<u32, RegistrarError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u32>().map_err(|e| {
                    RegistrarError::Infrastructure(format!(
                        "Invalid {} value '{}': {}",
                        key, value, e
                    ))
                })?;

                if parsed == 0 {
                    return Err(RegistrarError::Infrastructure(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Parse usize from environment variable or return default
    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, RegistrarError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    RegistrarError::Infrastructure(format!(
                        "Invalid {} value '{}': {}",
                        key, value, e
                    ))
                })?;

                if parsed == 0 {
                    return Err(RegistrarError::Infrastructure(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), RegistrarError> {
        if self.jwt_secret.len() < 32 {
            return Err(RegistrarError::Infrastructure(
                "JWT_SECRET must be at least 32 bytes".to_string(),
            ));
        }

        // bcrypt rejects cost factors outside this range at hash time;
        // fail at startup instead
        if !(4..=15).contains(&self.bcrypt_cost) {
            return Err(RegistrarError::Infrastructure(format!(
                "Invalid BCRYPT_COST '{}': must be between 4 and 15",
                self.bcrypt_cost
            )));
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), RegistrarError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(RegistrarError::Infrastructure(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), RegistrarError> {
        if format != "json" && format != "text" {
            return Err(RegistrarError::Infrastructure(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// This bypasses environment variable loading for use in tests that
    /// don't need real configuration. The low bcrypt cost keeps tests fast.
    pub fn test_config() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            jwt_secret: "test-secret-key-0123456789-abcdefghijklmnop".to_string(),
            jwt_issuer: "registrar".to_string(),
            jwt_audience: "registrar-clients".to_string(),
            token_ttl_minutes: 60,
            bcrypt_cost: 4,
            request_timeout_secs: 30,
            body_size_limit_bytes: 2 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_or_default() {
        env::set_var("REGISTRAR_TEST_VAR", "test_value");
        let result = Config::get_env_or_default("REGISTRAR_TEST_VAR", "default").unwrap();
        assert_eq!(result, "test_value");
        env::remove_var("REGISTRAR_TEST_VAR");
    }

    #[test]
    fn test_get_env_or_default_missing() {
        env::remove_var("REGISTRAR_TEST_VAR_MISSING");
        let result = Config::get_env_or_default("REGISTRAR_TEST_VAR_MISSING", "default").unwrap();
        assert_eq!(result, "default");
    }

    #[test]
    fn test_get_required_env_missing() {
        env::remove_var("REGISTRAR_TEST_REQUIRED");
        assert!(Config::get_required_env("REGISTRAR_TEST_REQUIRED").is_err());
    }

    #[test]
    fn test_validate_log_level() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(Config::validate_log_level(level).is_ok());
        }
        assert!(Config::validate_log_level("invalid").is_err());
    }

    #[test]
    fn test_validate_log_format() {
        assert!(Config::validate_log_format("json").is_ok());
        assert!(Config::validate_log_format("text").is_ok());
        assert!(Config::validate_log_format("invalid").is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = Config::test_config();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_bcrypt_cost() {
        let mut config = Config::test_config();
        config.bcrypt_cost = 3;
        assert!(config.validate().is_err());
        config.bcrypt_cost = 16;
        assert!(config.validate().is_err());
        config.bcrypt_cost = 12;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_test_config_is_valid() {
        assert!(Config::test_config().validate().is_ok());
    }
}
