use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    let mut settings = gerot_api::Settings::load()?;
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }

    // The server keeps its own log format; admin commands log warnings only
    if matches!(cli.command, Commands::Serve { .. }) {
        gerot_api::init_tracing(settings.log_format);
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "gerot=info,gerot_db=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    commands::execute(cli.command, settings).await
}
