//! # Tag CLI Application
//!
//! Main entry point for `tag`. Sets up logging, loads the configuration once,
//! and hands the parsed command to [`tag::cli::run`]. Process termination
//! happens here and nowhere else.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tag::cli::{self, Cli};
use tag::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging; stdout is reserved for user-facing output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.command.nosync()).await;

    if let Err(e) = cli::run(cli.command, &config).await {
        std::process::exit(cli::report_failure(&e));
    }
}
