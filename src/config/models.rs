use crate::handlers::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Routes in priority order
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Registry behavior for the configured dispatcher
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Name used in dispatch log fields
    #[serde(default = "default_registry_name")]
    pub name: String,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: default_registry_name(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

fn default_registry_name() -> String {
    "routes".to_string()
}

/// One route of the routing table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    pub name: String,
    /// URL schemes accepted by this route (e.g. "https", "file")
    #[serde(default)]
    pub schemes: Vec<String>,
    /// Path extensions accepted by this route, without the dot
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Accept every request; routes after this one are unreachable
    #[serde(default)]
    pub catch_all: bool,
}

impl RouteConfig {
    pub fn has_matcher(&self) -> bool {
        self.catch_all || !self.schemes.is_empty() || !self.extensions.is_empty()
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.registry.name, "routes");
        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::KeepPosition);
        assert!(config.routes.is_empty());
        assert_eq!(config.telemetry.log_filter, "info");
    }

    #[test]
    fn test_parse_routes_in_order() {
        let config: Config = toml::from_str(
            r#"
[registry]
duplicate_policy = "move_to_end"

[[routes]]
name = "images"
extensions = ["jpg", "png"]

[[routes]]
name = "local"
schemes = ["file"]

[[routes]]
name = "network"
catch_all = true
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::MoveToEnd);
        let names: Vec<&str> = config.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["images", "local", "network"]);
        assert_eq!(config.routes[0].extensions, ["jpg", "png"]);
        assert!(config.routes[2].catch_all);
    }

    #[test]
    fn test_route_without_matcher() {
        let route = RouteConfig {
            name: "idle".to_string(),
            schemes: vec![],
            extensions: vec![],
            catch_all: false,
        };
        assert!(!route.has_matcher());
    }
}
