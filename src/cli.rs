use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchchain")]
#[command(about = "Inspect fetchchain routing tables", long_about = None)]
pub struct Cli {
    /// Routing table to load (defaults to FETCHCHAIN_CONFIG or config/fetchchain.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report which route each URL is dispatched to
    Route(RouteArgs),
    /// Validate the routing table and print it in priority order
    Check,
}

#[derive(clap::Args, Debug)]
pub struct RouteArgs {
    /// URLs or paths to route
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Print one JSON object per URL
    #[arg(long)]
    pub json: bool,
}
