use super::models::Config;
use std::collections::HashSet;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Route at position {position} has an empty name")]
    EmptyRouteName { position: usize },

    #[error("Route '{route}' is defined more than once")]
    DuplicateRoute { route: String },

    #[error("Route '{route}' has no schemes, no extensions and is not a catch-all")]
    RouteWithoutMatcher { route: String },

    #[error("Route '{route}' is unreachable: catch-all route '{catch_all}' precedes it")]
    UnreachableRoute { route: String, catch_all: String },

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidLogFilter { filter: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_routes(config)?;
    validate_telemetry(config)?;
    Ok(())
}

/// Route names are unique, every route can match something, and nothing
/// follows a catch-all
fn validate_routes(config: &Config) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut catch_all: Option<&str> = None;

    for (position, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            return Err(ValidationError::EmptyRouteName { position });
        }

        if !seen.insert(route.name.as_str()) {
            return Err(ValidationError::DuplicateRoute {
                route: route.name.clone(),
            });
        }

        if !route.has_matcher() {
            return Err(ValidationError::RouteWithoutMatcher {
                route: route.name.clone(),
            });
        }

        if let Some(earlier) = catch_all {
            return Err(ValidationError::UnreachableRoute {
                route: route.name.clone(),
                catch_all: earlier.to_string(),
            });
        }

        if route.catch_all {
            catch_all = Some(&route.name);
        }
    }

    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    let filter = &config.telemetry.log_filter;
    EnvFilter::try_new(filter).map_err(|e| ValidationError::InvalidLogFilter {
        filter: filter.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::*;

    fn route(name: &str, extensions: &[&str], catch_all: bool) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            schemes: vec![],
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            catch_all,
        }
    }

    fn config_with(routes: Vec<RouteConfig>) -> Config {
        Config {
            routes,
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config_with(vec![
            route("images", &["jpg"], false),
            route("network", &[], true),
        ]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_routes_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_duplicate_route_name() {
        let config = config_with(vec![route("a", &["jpg"], false), route("a", &["png"], false)]);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::DuplicateRoute { route }) if route == "a"
        ));
    }

    #[test]
    fn test_empty_route_name() {
        let config = config_with(vec![route("images", &["jpg"], false), route(" ", &["png"], false)]);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyRouteName { position: 1 })
        ));
    }

    #[test]
    fn test_route_without_matcher() {
        let config = config_with(vec![route("idle", &[], false)]);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::RouteWithoutMatcher { .. })
        ));
    }

    #[test]
    fn test_route_after_catch_all_is_unreachable() {
        let config = config_with(vec![
            route("network", &[], true),
            route("images", &["jpg"], false),
        ]);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::UnreachableRoute { route, catch_all })
                if route == "images" && catch_all == "network"
        ));
    }

    #[test]
    fn test_invalid_log_filter() {
        let mut config = Config::default();
        config.telemetry.log_filter = "fetchchain=loud".to_string();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidLogFilter { .. })
        ));
    }
}
