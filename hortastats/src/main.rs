// HortaStats - garden journal function host
// Entry point and application setup

use hortastats::app::AppState;
use hortastats::config::Config;
use hortastats::server;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hortastats=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HortaStats");

    let config = Config::from_env();
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL is not set; posts and images will not be persisted");
    }

    let listener = server::bind(&config.bind_addr).await?;
    let state = Arc::new(AppState::new(config));

    tokio::select! {
        result = server::serve(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
