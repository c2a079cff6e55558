mod cli;

use clap::Parser;
use cli::{Cli, Commands, RouteArgs};
use fetchchain::config::{Config, TelemetryConfig};
use fetchchain::handlers::{FetchError, FetchHandler};
use fetchchain::observability::init_tracing;
use fetchchain::routing::{ResourceRequest, RouteDispatcher, build_dispatcher};
use serde_json::json;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    let logging = init_tracing(&TelemetryConfig::default().log_filter);

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    logging.apply_filter(&config.telemetry.log_filter);

    let dispatcher = build_dispatcher(&config);
    match cli.command {
        Commands::Route(args) => route(&dispatcher, args).await?,
        Commands::Check => check(&config, &dispatcher),
    }

    Ok(())
}

async fn route(dispatcher: &RouteDispatcher, args: RouteArgs) -> Result<(), AnyError> {
    for url in args.urls {
        let outcome = dispatcher.execute(ResourceRequest::new(url.clone())).wait().await;

        match (outcome, args.json) {
            (Ok(decision), true) => println!("{}", serde_json::to_string(&decision)?),
            (Ok(decision), false) => println!("{} -> {}", decision.url, decision.route),
            (Err(e), true) => println!("{}", json!({ "url": url, "error": e.to_string() })),
            (Err(FetchError::Dispatch(e)), false) => println!("{url} -> ({e})"),
            (Err(e), false) => return Err(e.into()),
        }
    }

    let metrics = dispatcher.metrics().snapshot();
    tracing::info!(
        dispatched = metrics.dispatched,
        unmatched = metrics.unmatched,
        probes = metrics.probes,
        "Routing finished"
    );

    Ok(())
}

fn check(config: &Config, dispatcher: &RouteDispatcher) {
    println!(
        "{}: {} route(s), duplicate policy {:?}",
        dispatcher.name(),
        dispatcher.len(),
        dispatcher.registry().policy()
    );

    for (position, route) in config.routes.iter().enumerate() {
        if route.catch_all {
            println!("  {position}. {} (catch-all)", route.name);
        } else {
            println!(
                "  {position}. {} schemes={:?} extensions={:?}",
                route.name, route.schemes, route.extensions
            );
        }
    }
}
