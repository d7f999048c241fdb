mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bloodlink_core::config::{AppConfig, LoadOptions};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use bloodlink_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let router = app.router()?;
    let address = app.config.listen_address();
    let listener = TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        frontend_url = %app.config.cors.frontend_url,
        "bloodlink-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move { signal.notified().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        signal = wait_for_shutdown() => {
            signal?;
            info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "bloodlink-server draining connections"
            );
            shutdown.notify_one();

            let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    event_name = "system.server.drain_timeout",
                    correlation_id = "shutdown",
                    grace_secs = app.config.server.graceful_shutdown_secs,
                    "connections still open after grace period"
                ),
            }
        }
    }

    info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "bloodlink-server stopped"
    );
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
