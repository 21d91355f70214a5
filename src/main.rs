mod cli;
mod client;
mod commands;
mod error;
mod generate;
mod history;
mod metadata;
mod present;
mod store;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();

    match &cli.command {
        cli::Command::History(args) => commands::history(&cli.backend, args).await,
        cli::Command::Progress(args) => commands::progress(&cli.backend, args).await,
        cli::Command::Enhance(args) => commands::enhance(&cli.backend, args).await,
        cli::Command::Delete(args) => commands::delete(&cli.backend, args).await,
        cli::Command::Version => {
            println!("{} {}", metadata::PKG_NAME, metadata::PKG_VERSION);
            Ok(())
        }
    }
}
