//! Configuration validator for memedit
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::defaults::MAX_READ_LIMIT;
use super::loader::{Config, ConfigError, LoggingConfig, MemoryConfig};
use crate::core::types::ScalarType;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_memory(&config.memory)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates memory configuration
    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.max_read_size == 0 {
            return Err(ConfigError::Invalid(
                "Maximum read size must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size > MAX_READ_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "Maximum read size cannot exceed {} bytes",
                MAX_READ_LIMIT
            )));
        }

        memory
            .default_type
            .parse::<ScalarType>()
            .map_err(|e| ConfigError::Invalid(format!("memory.default_type: {}", e)))?;

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_read_size_bounds() {
        let mut config = Config::default();
        config.memory.max_read_size = 0;
        assert!(validate_config(&config).is_err());

        config.memory.max_read_size = MAX_READ_LIMIT;
        assert!(validate_config(&config).is_ok());

        config.memory.max_read_size = MAX_READ_LIMIT + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_default_type_must_parse() {
        let mut config = Config::default();
        config.memory.default_type = "qword".to_string();
        assert!(validate_config(&config).is_ok());

        config.memory.default_type = "u128".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_type"));
    }

    #[test]
    fn test_log_levels() {
        let mut config = Config::default();
        for level in ["trace", "DEBUG", "info", "warn", "error", "off"] {
            config.logging.level = level.to_string();
            assert!(validate_config(&config).is_ok(), "{}", level);
        }

        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
