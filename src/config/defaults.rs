//! Default configuration values for memedit

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub memory: MemoryDefaults,
    pub logging: LoggingDefaults,
}

/// Default memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub max_read_size: usize,
    pub default_type: String,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Largest `max_read_size` the validator accepts
pub const MAX_READ_LIMIT: usize = 256 * 1024 * 1024;

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        memory: MemoryDefaults {
            max_read_size: 1048576, // 1MB
            default_type: "i32".to_string(),
        },
        logging: LoggingDefaults {
            level: "warn".to_string(),
        },
    }
}
