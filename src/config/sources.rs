use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "FETCHCHAIN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/fetchchain.toml";
const ENV_PREFIX: &str = "FETCHCHAIN";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    load_dotenv();
    load_from_sources(default_path(), false)
}

/// Load from a path the caller named explicitly; the file must exist
pub fn load_required(config_path: PathBuf) -> Result<Config, ConfigError> {
    load_dotenv();
    load_from_sources(config_path, true)
}

fn load_dotenv() {
    // Missing .env is fine
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from: {}", path.display());
    }
}

/// Path named by `FETCHCHAIN_CONFIG`, or the default location
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf, required: bool) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if required || config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(required));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // FETCHCHAIN__REGISTRY__DUPLICATE_POLICY -> registry.duplicate_policy
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
