pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{LogFormat, Settings};
pub use error::ApiError;
pub use routes::create_router;
pub use state::ApiState;

use anyhow::Result;
use gerot_db::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "gerot_api=debug,gerot_db=info,tower_http=debug,axum::rejection=trace";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Opens the database, prepares schema and seed data, then serves until Ctrl-C.
pub async fn serve(settings: Settings) -> Result<()> {
    if settings.uses_dev_secret() {
        tracing::warn!("SECRET_KEY not set, signing tokens with the development key");
    }
    if settings.agent_key().is_none() {
        tracing::warn!("AGENT_API_KEY not set, agent endpoints accept any caller");
    }

    let db = Database::new(&settings.database_url).await?;
    db.init_schema().await?;
    db.seed_defaults(&settings.default_admin_password).await?;

    let addr = format!("0.0.0.0:{}", settings.api_port);
    let app = create_router(ApiState::new(db, settings));

    tracing::info!("🚀 GeRot API Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}
