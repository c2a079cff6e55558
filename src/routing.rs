//! Config-driven leaf handlers
//!
//! A routing table from [`Config`] becomes a [`CompositeHandler`] of
//! [`RouteHandler`]s (plus [`CatchAllRoute`]s registered through the
//! unconditional adapter). Executing a route completes immediately with the
//! [`RouteDecision`]; this is what the CLI uses to explain how a URL would be
//! dispatched.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, RouteConfig};
use crate::handlers::{CompositeHandler, FetchHandler, FetchTask, UnconditionalHandler};

pub type RouteDispatcher = CompositeHandler<ResourceRequest, FetchTask<RouteDecision>>;

/// Request routed by URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
}

impl ResourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Lowercased scheme, if the URL has one
    pub fn scheme(&self) -> Option<String> {
        self.url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .filter(|scheme| !scheme.is_empty())
    }

    /// Lowercased extension of the last path segment, query and fragment
    /// stripped
    pub fn extension(&self) -> Option<String> {
        let path = match self.url.split_once("://") {
            // Skip the authority
            Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
            None => self.url.as_str(),
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segment = path.rsplit('/').next().unwrap_or_default();

        segment
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext)
    }
}

/// Which route accepted a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub route: String,
    pub url: String,
}

fn decide(route: &str, request: ResourceRequest) -> FetchTask<RouteDecision> {
    let (task, completer) = FetchTask::channel();
    debug!(route, url = %request.url, task_id = %task.id(), "Route accepted request");
    completer.complete(Ok(RouteDecision {
        route: route.to_string(),
        url: request.url,
    }));
    task
}

/// Leaf handler matching on scheme and/or extension
#[derive(Debug, Clone)]
pub struct RouteHandler {
    name: String,
    schemes: HashSet<String>,
    extensions: HashSet<String>,
}

impl RouteHandler {
    pub fn new(route: &RouteConfig) -> Self {
        let normalize = |values: &[String]| -> HashSet<String> {
            values
                .iter()
                .map(|v| v.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };

        Self {
            name: route.name.clone(),
            schemes: normalize(&route.schemes),
            extensions: normalize(&route.extensions),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FetchHandler<ResourceRequest> for RouteHandler {
    type Handle = FetchTask<RouteDecision>;

    fn can_handle(&self, request: &ResourceRequest) -> bool {
        if self.schemes.is_empty() && self.extensions.is_empty() {
            return false;
        }

        let scheme_ok = self.schemes.is_empty()
            || request.scheme().is_some_and(|s| self.schemes.contains(&s));
        let extension_ok = self.extensions.is_empty()
            || request.extension().is_some_and(|e| self.extensions.contains(&e));

        scheme_ok && extension_ok
    }

    fn execute(&self, request: ResourceRequest) -> Self::Handle {
        decide(&self.name, request)
    }
}

/// Route that takes every request reaching it
#[derive(Debug, Clone)]
pub struct CatchAllRoute {
    name: String,
}

impl CatchAllRoute {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl UnconditionalHandler<ResourceRequest> for CatchAllRoute {
    type Handle = FetchTask<RouteDecision>;

    fn execute(&self, request: ResourceRequest) -> Self::Handle {
        decide(&self.name, request)
    }
}

/// Build a dispatcher over the configured routes, in order
pub fn build_dispatcher(config: &Config) -> RouteDispatcher {
    let dispatcher = RouteDispatcher::with_policy(
        std::iter::empty(),
        config.registry.duplicate_policy,
    )
    .named(&config.registry.name);

    for route in &config.routes {
        if route.catch_all {
            dispatcher.add_unconditional(Arc::new(CatchAllRoute::new(&route.name)));
        } else {
            let handler = RouteHandler::new(route);
            debug!(route = handler.name(), "Registering route");
            dispatcher.add(Arc::new(handler));
        }
    }

    debug!(
        dispatcher = %config.registry.name,
        routes = dispatcher.len(),
        "Dispatcher built from configuration"
    );

    dispatcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{DispatchError, FetchError};

    fn route(name: &str, schemes: &[&str], extensions: &[&str]) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            schemes: schemes.iter().map(|s| s.to_string()).collect(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            catch_all: false,
        }
    }

    #[test]
    fn test_request_scheme_and_extension() {
        let request = ResourceRequest::new("HTTPS://cdn.example.com/img/photo.JPG?w=200#top");
        assert_eq!(request.scheme().as_deref(), Some("https"));
        assert_eq!(request.extension().as_deref(), Some("jpg"));

        let bare_host = ResourceRequest::new("https://example.com");
        assert_eq!(bare_host.extension(), None);

        let trailing_slash = ResourceRequest::new("https://example.com/");
        assert_eq!(trailing_slash.extension(), None);

        let path = ResourceRequest::new("/var/cache/thumb.webp");
        assert_eq!(path.scheme(), None);
        assert_eq!(path.extension().as_deref(), Some("webp"));

        let hidden = ResourceRequest::new("file:///home/user/.profile");
        assert_eq!(hidden.extension(), None);
    }

    #[test]
    fn test_route_requires_every_configured_list() {
        let handler = RouteHandler::new(&route("secure-images", &["https"], &[".PNG"]));
        assert_eq!(handler.name(), "secure-images");

        assert!(handler.can_handle(&ResourceRequest::new("https://a.com/x.png")));
        assert!(!handler.can_handle(&ResourceRequest::new("http://a.com/x.png")));
        assert!(!handler.can_handle(&ResourceRequest::new("https://a.com/x.gif")));
    }

    #[test]
    fn test_route_without_lists_never_matches() {
        let handler = RouteHandler::new(&route("idle", &[], &[]));
        assert!(!handler.can_handle(&ResourceRequest::new("https://a.com/x.png")));
    }

    #[tokio::test]
    async fn test_dispatcher_follows_configured_order() {
        let config = Config {
            routes: vec![
                route("images", &[], &["jpg", "png"]),
                route("local", &["file"], &[]),
                RouteConfig {
                    catch_all: true,
                    ..route("network", &[], &[])
                },
            ],
            ..Config::default()
        };

        let dispatcher = build_dispatcher(&config);
        assert_eq!(dispatcher.len(), 3);

        let decision = dispatcher
            .execute(ResourceRequest::new("file:///tmp/a.jpg"))
            .wait()
            .await
            .unwrap();
        assert_eq!(decision.route, "images");

        let decision = dispatcher
            .execute(ResourceRequest::new("file:///tmp/a.txt"))
            .wait()
            .await
            .unwrap();
        assert_eq!(decision.route, "local");

        let decision = dispatcher
            .execute(ResourceRequest::new("https://example.com/feed"))
            .wait()
            .await
            .unwrap();
        assert_eq!(decision.route, "network");
        assert_eq!(decision.url, "https://example.com/feed");
    }

    #[tokio::test]
    async fn test_dispatcher_without_catch_all_rejects() {
        let config = Config {
            routes: vec![route("images", &[], &["jpg"])],
            ..Config::default()
        };

        let dispatcher = build_dispatcher(&config);
        let outcome = dispatcher
            .execute(ResourceRequest::new("https://example.com/a.gif"))
            .wait()
            .await;

        assert_eq!(
            outcome,
            Err(FetchError::Dispatch(DispatchError::NoCapableHandler))
        );
    }
}
