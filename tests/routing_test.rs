use std::path::PathBuf;

use fetchchain::config::Config;
use fetchchain::handlers::{DuplicatePolicy, FetchHandler};
use fetchchain::routing::{ResourceRequest, build_dispatcher};

fn sample_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/fetchchain.toml")
}

#[test]
fn test_sample_config_is_valid() {
    let config = Config::load_from_path(sample_config_path()).unwrap();

    assert_eq!(config.registry.name, "media");
    assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::KeepPosition);
    assert_eq!(config.routes.len(), 3);
    assert!(config.routes.last().unwrap().catch_all);
}

#[tokio::test]
async fn test_sample_routing_table() {
    let config = Config::load_from_path(sample_config_path()).unwrap();
    let dispatcher = build_dispatcher(&config);
    assert_eq!(dispatcher.name(), "media");

    let cases = [
        ("mem://thumbs/42.png", "memory-cache"),
        ("file:///var/cache/42.png", "disk-cache"),
        ("https://cdn.example.com/42.png", "network"),
        ("mem://thumbs/42.txt", "network"),
    ];

    for (url, expected) in cases {
        let decision = dispatcher
            .execute(ResourceRequest::new(url))
            .wait()
            .await
            .unwrap();
        assert_eq!(decision.route, expected, "routing {url}");
    }

    let metrics = dispatcher.metrics().snapshot();
    assert_eq!(metrics.dispatched, 4);
    assert_eq!(metrics.unmatched, 0);
}
