//! Configuration management for fetchchain
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. `.env` file (via dotenvy)
//! 4. Environment variables (highest priority)
//!
//! The configuration describes a routing table (an ordered list of routes)
//! used by [`crate::routing::build_dispatcher`], plus registry and telemetry
//! settings. The dispatch types in [`crate::handlers`] do not read it.
//!
//! # Usage
//!
//! ```no_run
//! use fetchchain::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("{} routes configured", config.routes.len());
//! ```
//!
//! # Environment Variables
//!
//! Scalar settings can be overridden with `FETCHCHAIN__<section>__<key>`:
//! - `FETCHCHAIN__REGISTRY__DUPLICATE_POLICY=move_to_end`
//! - `FETCHCHAIN__TELEMETRY__LOG_FILTER=fetchchain=debug`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/fetchchain.toml`.
//! This can be overridden using the `FETCHCHAIN_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, RegistryConfig, RouteConfig, TelemetryConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path (file + `.env` + environment)
    ///
    /// # Errors
    ///
    /// Unlike [`Config::load`], a missing file is an error.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_required(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Path `load()` reads from
    pub fn default_path() -> PathBuf {
        sources::default_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_routing_table() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[[routes]]
name = "memory"
extensions = ["jpg", "png"]

[[routes]]
name = "network"
catch_all = true
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.routes.len(), 2);
        assert!(config.routes[1].catch_all);
    }

    #[test]
    fn test_validation_runs_after_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[[routes]]
name = "network"
catch_all = true

[[routes]]
name = "memory"
extensions = ["jpg"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::UnreachableRoute { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("does_not_exist.toml");

        assert!(matches!(
            Config::load_from_path(config_path),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[[routes]]\nname = ").unwrap();

        assert!(matches!(
            Config::load_from_path(config_path),
            Err(ConfigError::LoadError(_))
        ));
    }
}
