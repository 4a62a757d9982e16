//! # grievance-api: Binary Entry Point
//!
//! Starts the Axum HTTP server and the reconciliation sweeper. Binds to
//! configurable port (default 3000).

use std::sync::Arc;

use grievance_api::config::{AppConfig, LogFormat};
use grievance_api::db::grievances::PgStore;
use grievance_api::notarizer::{HttpNotarizer, LoggingNotarizer, Notarizer};
use grievance_api::state::AppState;
use grievance_api::store::{GrievanceStore, MemoryStore};
use grievance_core::SystemClock;
use grievance_notary::{NotaryClient, NotaryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "configuration loaded");

    let store: Arc<dyn GrievanceStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = grievance_api::db::init_pool(url).await.map_err(|e| {
                tracing::error!("Database initialization failed: {e}");
                e
            })?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; grievances are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notarizer: Arc<dyn Notarizer> = match NotaryConfig::from_env()? {
        Some(notary_config) => {
            tracing::info!(base_url = %notary_config.base_url, "notary ledger configured");
            Arc::new(HttpNotarizer::new(NotaryClient::new(notary_config)?))
        }
        None => {
            tracing::warn!("NOTARY_URL not set; verified grievances are logged, not notarized");
            Arc::new(LoggingNotarizer)
        }
    };

    let port = config.port;
    let state = AppState::with_parts(config, store, Arc::new(SystemClock), notarizer);
    let sweeper = state.sweeper.clone().start();

    let app = grievance_api::app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Grievance API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
}
