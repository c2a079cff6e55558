pub mod config;
pub mod handlers;
pub mod observability;
pub mod routing;
