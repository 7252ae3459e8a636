#![cfg(not(tarpaulin_include))]

use analyzer::app;
use analyzer::config::Config;
use clap::Parser;

/// Main entry point for the web application
///
/// Reads the configuration from the command line and environment, sets up
/// logging (`RUST_LOG` overrides the default `info` level) and serves the
/// upload page and API until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
