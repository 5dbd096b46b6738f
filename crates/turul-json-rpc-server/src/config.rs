//! Dispatcher configuration

use thiserror::Error;
use tracing::debug;

use crate::serializer::ResultSerializer;

pub const ENV_EXPOSE_INTERNAL_ERRORS: &str = "JSONRPC_EXPOSE_INTERNAL_ERRORS";
pub const ENV_MAX_RESULT_DEPTH: &str = "JSONRPC_MAX_RESULT_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a boolean, got '{value}'")]
    InvalidBool { name: &'static str, value: String },
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidDepth { name: &'static str, value: String },
}

/// Server-wide processing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Put the cause and source chain of internal errors on the wire.
    /// Development only.
    pub expose_internal_errors: bool,

    /// Result graph depth ceiling
    pub max_result_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            max_result_depth: ResultSerializer::DEFAULT_MAX_DEPTH,
        }
    }
}

impl ServerConfig {
    /// Development settings: internal error details are exposed
    pub fn development() -> Self {
        Self {
            expose_internal_errors: true,
            ..Default::default()
        }
    }

    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub fn with_max_result_depth(mut self, depth: usize) -> Self {
        self.max_result_depth = depth;
        self
    }

    /// Create a config from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_EXPOSE_INTERNAL_ERRORS) {
            config.expose_internal_errors = parse_bool(&value).ok_or(ConfigError::InvalidBool {
                name: ENV_EXPOSE_INTERNAL_ERRORS,
                value,
            })?;
        }

        if let Ok(value) = std::env::var(ENV_MAX_RESULT_DEPTH) {
            config.max_result_depth = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or(ConfigError::InvalidDepth {
                    name: ENV_MAX_RESULT_DEPTH,
                    value,
                })?;
        }

        debug!("Loaded server config from environment: {:?}", config);
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::remove_var(ENV_EXPOSE_INTERNAL_ERRORS);
            std::env::remove_var(ENV_MAX_RESULT_DEPTH);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(!config.expose_internal_errors);
        assert_eq!(config.max_result_depth, 32);
        assert!(ServerConfig::development().expose_internal_errors);
    }

    #[test]
    #[serial]
    fn test_from_env_unset_uses_defaults() {
        clear_env();
        assert_eq!(ServerConfig::from_env().unwrap(), ServerConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_values() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_EXPOSE_INTERNAL_ERRORS, "true");
            std::env::set_var(ENV_MAX_RESULT_DEPTH, "8");
        }
        let config = ServerConfig::from_env().unwrap();
        assert!(config.expose_internal_errors);
        assert_eq!(config.max_result_depth, 8);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_MAX_RESULT_DEPTH, "0");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidDepth { .. })
        ));

        unsafe {
            std::env::remove_var(ENV_MAX_RESULT_DEPTH);
            std::env::set_var(ENV_EXPOSE_INTERNAL_ERRORS, "maybe");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidBool { .. })
        ));
        clear_env();
    }
}
