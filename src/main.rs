// flashcards - Russian flashcards with browser sign-in

mod api;
mod auth;
mod cli;
mod config;
mod error;
mod models;

use clap::Parser;
use error::Result;

// One page load per process; the session needs no worker threads
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first to get verbose flag
    let args = cli::Cli::parse();

    if args.headless {
        auth::set_headless_override(true);
    }

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so command output stays scriptable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::execute(args).await
}
