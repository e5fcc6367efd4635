use anyhow::Result;
use clap::Parser;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gerot_agent::{Agent, AgentConfig, GerotClient, MySqlRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenv::dotenv().ok();

    let config = AgentConfig::parse();
    let _guard = init_tracing(config.log_file.as_deref());

    let poll_every = config.poll_every()?;
    let client = GerotClient::new(config.api_url.clone(), config.api_key.clone())?;
    let runner = Arc::new(MySqlRunner::connect_lazy(config.mysql_options()));

    tracing::info!("GeRot agent starting");
    tracing::info!("  GeRot URL: {}", client.base_url());
    tracing::info!("  MySQL: {}", config.mysql_target());
    tracing::info!("  Polling: {}s", poll_every.as_secs());
    if config.api_key().is_none() {
        tracing::warn!("AGENT_API_KEY is not set; requests are sent without a key");
    }

    let agent = Agent::new(client, runner.clone(), poll_every);
    let outcome = if config.once {
        match agent.verify().await {
            Ok(()) => {
                let stats = agent.run_once().await;
                tracing::info!(
                    "Cycle finished: {} executed, {} failed",
                    stats.executed,
                    stats.failed
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    } else {
        agent.run().await
    };

    runner.close().await;
    outcome?;
    Ok(())
}

/// Console logging, plus a plain-text copy when a log file is configured.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "gerot_agent=info".into());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("gerot_agent.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
