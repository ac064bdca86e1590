//! API-specific configuration loaded from environment variables

use anyhow::{Context, Result};
use std::env;

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origin: String,
}

impl Config {
    pub fn new(host: String, port: u16, cors_allowed_origin: String) -> Self {
        Self {
            host,
            port,
            cors_allowed_origin,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Failed to parse API_PORT as u16")?,
            env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_with_defaults() {
        let config = Config::new("0.0.0.0".to_string(), 3000, "*".to_string());

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_allowed_origin, "*");
    }

    #[test]
    fn test_config_clone() {
        let config = Config::new("localhost".to_string(), 9000, "*".to_string());
        let cloned = config.clone();
        assert_eq!(config.host, cloned.host);
        assert_eq!(config.port, cloned.port);
    }
}
